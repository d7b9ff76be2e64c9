//! # config — read Config from Environment Variables
//!
//! Built exactly once in `main` and passed by reference into every run.
//! No other module reads the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::retry::RetryPolicy;

// ─── Strategy ─────────────────────────────────────────────────────────────────

/// The only configuration the engine sees.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Number of true-range values averaged by the volatility estimator
    pub atr_length:       usize,
    /// Scale applied to the averaged true range
    pub risk_multiplier:  f64,
    /// Distance between take-profit rungs, in percent of entry
    pub tp_percent:       f64,
    /// Stop-loss distance, in percent of entry
    pub sl_percent:       f64,
    /// Allow the trend tracker to leave `Neutral` on a band breakout
    pub neutral_breakout: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            atr_length:       14,
            risk_multiplier:  1.5,
            tp_percent:       0.5,
            sl_percent:       1.0,
            neutral_breakout: false,
        }
    }
}

// ─── Telegram ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TelegramConfig {
    pub api_url:   String,
    pub bot_token: String,
    pub chat_id:   String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_url", &self.api_url)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────

/// Everything one process needs
#[derive(Debug, Clone)]
pub struct Config {
    /// KuCoin symbol, e.g. "BTC-USDT"
    pub symbol:       String,
    /// Bar interval, e.g. "1min" or "1m"
    pub timeframe:    String,
    /// How many bars to fetch per run
    pub bar_limit:    usize,
    pub strategy:     StrategyConfig,
    /// Where the position record lives
    pub state_path:   PathBuf,
    /// Market-data base URL (KuCoin REST)
    pub market_url:   String,
    /// `None` → notifications are only logged
    pub telegram:     Option<TelegramConfig>,
    pub retry:        RetryPolicy,
    /// `Some` → run forever with this pause between runs
    pub run_interval: Option<Duration>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let strategy = StrategyConfig {
            atr_length:       parse_or(&get, "ATR_LENGTH", 14)?,
            risk_multiplier:  parse_or(&get, "RISK_MULTIPLIER", 1.5)?,
            tp_percent:       parse_or(&get, "TP_PERCENT", 0.5)?,
            sl_percent:       parse_or(&get, "SL_PERCENT", 1.0)?,
            neutral_breakout: get("TREND_NEUTRAL_BREAKOUT")
                .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
                .unwrap_or(false),
        };

        if strategy.atr_length == 0 {
            bail!("ATR_LENGTH must be at least 1");
        }

        let telegram = match (get("BOT_TOKEN"), get("CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                api_url: get("TELEGRAM_API_URL")
                    .unwrap_or_else(|| "https://api.telegram.org".to_string()),
                bot_token,
                chat_id,
            }),
            _ => None,
        };

        let max_attempts: u32 = parse_or(&get, "RETRY_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            bail!("RETRY_MAX_ATTEMPTS must be at least 1");
        }
        let base_delay_ms: u64 = parse_or(&get, "RETRY_BASE_DELAY_MS", 500)?;

        let run_interval = get("RUN_INTERVAL_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .context("RUN_INTERVAL_SECS must be a number")
            })
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            symbol:     get("SYMBOL").unwrap_or_else(|| "BTC-USDT".to_string()),
            timeframe:  get("TIMEFRAME").unwrap_or_else(|| "1min".to_string()),
            bar_limit:  parse_or(&get, "BAR_LIMIT", 100)?,
            strategy,
            state_path: get("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("state.json")),
            market_url: get("MARKET_URL")
                .unwrap_or_else(|| "https://api.kucoin.com".to_string()),
            telegram,
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
                ..RetryPolicy::default()
            },
            run_interval,
        })
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        None => Ok(default),
    }
}
