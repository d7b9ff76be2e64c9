//! # market — OHLCV bars from KuCoin
//!
//! ## Endpoint
//! `GET {MARKET_URL}/api/v1/market/candles?type=1min&symbol=BTC-USDT`
//!
//! ```json
//! { "code": "200000",
//!   "data": [["1700000060", "open", "close", "high", "low", "volume", "turnover"], ...] }
//! ```
//! Every field is a string and rows arrive newest first. Note the column
//! order: close comes before high/low.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use crate::error::BotError;
use crate::models::Bar;

const SUCCESS_CODE: &str = "200000";

// ─── Port ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Up to `limit` most recent bars, oldest first.
    async fn fetch(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Bar>, BotError>;
}

// ─── KuCoin ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    code: String,
    #[serde(default)]
    data: Vec<Vec<String>>,
    #[serde(default)]
    msg:  Option<String>,
}

#[derive(Debug, Clone)]
pub struct KucoinClient {
    client:   reqwest::Client,
    base_url: String,
    timeout:  Duration,
}

impl KucoinClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout:  Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl MarketData for KucoinClient {
    async fn fetch(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Bar>, BotError> {
        let interval = kucoin_interval(timeframe)?;
        let url = format!(
            "{}/api/v1/market/candles?type={interval}&symbol={symbol}",
            self.base_url
        );

        debug!(%url, limit, "Fetching candles");

        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| BotError::market_data(format!("KuCoin unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::market_data(format!("KuCoin HTTP {status}: {body}")));
        }

        let body: CandlesResponse = resp
            .json()
            .await
            .map_err(|e| BotError::market_data(format!("Failed to parse KuCoin response: {e}")))?;

        parse_candles(body, limit)
    }
}

/// Accepts KuCoin interval names as-is and maps the short aliases
/// (`1m`, `1h`, `1d`, ...) onto them.
pub fn kucoin_interval(timeframe: &str) -> Result<&'static str, BotError> {
    let interval = match timeframe {
        "1m" | "1min"    => "1min",
        "3m" | "3min"    => "3min",
        "5m" | "5min"    => "5min",
        "15m" | "15min"  => "15min",
        "30m" | "30min"  => "30min",
        "1h" | "1hour"   => "1hour",
        "2h" | "2hour"   => "2hour",
        "4h" | "4hour"   => "4hour",
        "6h" | "6hour"   => "6hour",
        "8h" | "8hour"   => "8hour",
        "12h" | "12hour" => "12hour",
        "1d" | "1day"    => "1day",
        "1w" | "1week"   => "1week",
        other => return Err(BotError::market_data(format!("unsupported timeframe '{other}'"))),
    };
    Ok(interval)
}

fn parse_candles(body: CandlesResponse, limit: usize) -> Result<Vec<Bar>, BotError> {
    if body.code != SUCCESS_CODE {
        return Err(BotError::market_data(format!(
            "KuCoin error {}: {}",
            body.code,
            body.msg.unwrap_or_default()
        )));
    }

    let mut bars = body
        .data
        .iter()
        .map(|row| parse_row(row))
        .collect::<Result<Vec<_>, _>>()?;

    bars.sort_by_key(|bar| bar.timestamp);
    let skip = bars.len().saturating_sub(limit);
    Ok(bars.split_off(skip))
}

fn parse_row(row: &[String]) -> Result<Bar, BotError> {
    let [time, open, close, high, low, volume, ..] = row else {
        return Err(BotError::market_data(format!(
            "candle row has {} fields, expected 7",
            row.len()
        )));
    };

    let secs = time
        .parse::<i64>()
        .map_err(|e| BotError::market_data(format!("candle time '{time}': {e}")))?;
    let timestamp = DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| BotError::market_data(format!("candle time {secs} out of range")))?;

    Ok(Bar {
        timestamp,
        open:   num("open", open)?,
        high:   num("high", high)?,
        low:    num("low", low)?,
        close:  num("close", close)?,
        volume: num("volume", volume)?,
    })
}

/// `f64::from_str` accepts "NaN" and "inf", which are never valid prices.
fn num(field: &str, raw: &str) -> Result<f64, BotError> {
    let value = raw
        .parse::<f64>()
        .map_err(|e| BotError::market_data(format!("candle {field} '{raw}': {e}")))?;
    if !value.is_finite() {
        return Err(BotError::market_data(format!("candle {field} '{raw}' is not finite")));
    }
    Ok(value)
}
