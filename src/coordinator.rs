//! # coordinator — one signal run
//!
//! ```text
//! load state ─▶ fetch bars* ─▶ volatility ─▶ trend ─▶ position step
//!                                                         │
//!             save state ◀── send each signal* ◀──────────┘
//!
//! * wrapped in the retry policy
//! ```
//!
//! State is saved last and only if everything before it succeeded. Signals
//! already sent by a failed run are not tracked, so the next run may send
//! them again. Runs must not overlap: the state store has no locking.

use std::sync::Arc;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::trend::is_flip;
use crate::engine::{self, volatility, Direction, Signal};
use crate::error::BotError;
use crate::market::MarketData;
use crate::models::PositionState;
use crate::notify::Notifier;
use crate::retry::with_retry;
use crate::store::StateStore;

/// What a successful run saw and did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id:     Uuid,
    pub bars:       usize,
    pub volatility: f64,
    pub dir_prev:   Direction,
    pub dir_now:    Direction,
    pub signals:    Vec<Signal>,
    pub state:      PositionState,
}

pub struct Coordinator {
    config:   Config,
    market:   Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    store:    Arc<dyn StateStore>,
}

impl Coordinator {
    pub fn new(
        config:   Config,
        market:   Arc<dyn MarketData>,
        notifier: Arc<dyn Notifier>,
        store:    Arc<dyn StateStore>,
    ) -> Self {
        Self { config, market, notifier, store }
    }

    pub async fn run_once(&self) -> Result<RunReport, BotError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, symbol = %self.config.symbol);
        self.run(run_id).instrument(span).await
    }

    async fn run(&self, run_id: Uuid) -> Result<RunReport, BotError> {
        let strategy = &self.config.strategy;
        let retry = &self.config.retry;

        // 1. Previous position
        let prev_state = self.store.load().await?;

        // 2. Fresh bars
        let bars = with_retry(retry, "fetch bars", || {
            self.market
                .fetch(&self.config.symbol, &self.config.timeframe, self.config.bar_limit)
        })
        .await?;

        let Some(latest) = bars.last() else {
            return Err(BotError::InsufficientData {
                needed: volatility::MIN_BARS,
                got:    0,
            });
        };

        // 3. Pure computation
        let vol = volatility::estimate(&bars, strategy.atr_length, strategy.risk_multiplier)?;
        let points = engine::compute_directions(&bars, vol, strategy.neutral_breakout);
        let directions: Vec<Direction> = points.iter().map(|point| point.direction).collect();

        let outcome = engine::step(&prev_state, &directions, latest, strategy)?;
        let (dir_prev, dir_now) = (outcome.dir_prev, outcome.dir_now);

        info!(
            bars       = bars.len(),
            volatility = vol,
            dir_prev   = ?dir_prev,
            dir_now    = ?dir_now,
            flip       = is_flip(dir_prev, dir_now),
            stop       = points.last().map(|point| point.stop),
            close      = latest.close,
            position   = %prev_state,
            "📈 Trend evaluated"
        );

        // 4. Notifications, in emission order
        for signal in &outcome.signals {
            let text = signal.to_string();
            info!(signal = %text, "🔔 Signal");
            with_retry(retry, "send signal", || self.notifier.send(&text)).await?;
        }

        // 5. Persist last
        self.store.save(&outcome.state).await?;

        info!(
            signals = outcome.signals.len(),
            closed  = outcome.signals.iter().any(Signal::is_exit),
            side    = ?outcome.state.side(),
            entry   = ?outcome.state.entry_price(),
            tps_hit = ?outcome.state.take_profits_hit(),
            "💾 Run complete"
        );

        Ok(RunReport {
            run_id,
            bars: bars.len(),
            volatility: vol,
            dir_prev,
            dir_now,
            signals: outcome.signals,
            state: outcome.state,
        })
    }
}
