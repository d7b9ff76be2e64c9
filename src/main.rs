//! # Trendflip — stop-and-reverse signal bot
//!
//! ```text
//!  ┌──────────────┐  GET /api/v1/market/candles  ┌──────────────────────────┐
//!  │  KuCoin      │ ───────────────────────────▶ │ Coordinator              │
//!  └──────────────┘                              │ ├─ volatility (ATR)      │
//!                                                │ ├─ trend (stop & reverse)│
//!  ┌──────────────┐  POST /bot…/sendMessage      │ └─ position manager      │
//!  │  Telegram    │ ◀─────────────────────────── │        │                 │
//!  └──────────────┘                              └────────┼─────────────────┘
//!                                                         ▼
//!                                                    state.json
//! ```
//!
//! ## Modes
//! * `RUN_INTERVAL_SECS` unset → one run, exit non-zero on failure (cron)
//! * `RUN_INTERVAL_SECS=60`    → run, sleep, repeat; failures are logged
//!
//! Either way only one run is in flight at a time.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod coordinator;
mod engine;
mod error;
mod market;
mod models;
mod notify;
mod retry;
mod store;

use config::Config;
use coordinator::{Coordinator, RunReport};
use market::KucoinClient;
use store::JsonFileStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("trendflip=debug".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════╗
  ║   TRENDFLIP — Stop & Reverse Signal Bot   ║
  ║   ATR · Trend · TP Ladder · SL            ║
  ╚═══════════════════════════════════════════╝"#);

    // ── 3. Config ─────────────────────────────────────────────────────────────
    let config = Config::from_env().context("Failed to load config")?;
    let client = reqwest::Client::new();

    info!(
        symbol     = %config.symbol,
        timeframe  = %config.timeframe,
        bars       = config.bar_limit,
        atr_length = config.strategy.atr_length,
        risk_mult  = config.strategy.risk_multiplier,
        tp_percent = config.strategy.tp_percent,
        sl_percent = config.strategy.sl_percent,
        interval   = ?config.run_interval,
        "Trendflip started"
    );

    // ── 4. Collaborators ──────────────────────────────────────────────────────
    let store = JsonFileStore::new(&config.state_path);
    info!(path = %store.path().display(), "State file");

    let coordinator = Coordinator::new(
        config.clone(),
        Arc::new(KucoinClient::new(client.clone(), &config.market_url)),
        notify::from_config(&client, &config),
        Arc::new(store),
    );

    // ── 5. Run ────────────────────────────────────────────────────────────────
    let Some(interval) = config.run_interval else {
        let report = coordinator.run_once().await.context("Signal run failed")?;
        log_report(&report, "✅ Done");
        return Ok(());
    };

    loop {
        match coordinator.run_once().await {
            Ok(report) => log_report(&report, "✅ Run succeeded"),
            Err(e) => {
                error!(error = %e, "❌ Run failed — state left untouched, will retry next interval");
            }
        }

        info!(interval = ?interval, "💤 Sleeping until next run...");
        tokio::time::sleep(interval).await;
    }
}

fn log_report(report: &RunReport, message: &str) {
    info!(
        run_id     = %report.run_id,
        bars       = report.bars,
        volatility = report.volatility,
        dir_prev   = ?report.dir_prev,
        dir_now    = ?report.dir_now,
        signals    = report.signals.len(),
        position   = %report.state,
        "{message}"
    );
}
