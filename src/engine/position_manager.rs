//! # engine::position_manager
//!
//! **Position Manager** — one step of the position lifecycle per run.
//!
//! ```text
//! flat ──[ entry: Short→Long / Long→Short ]──▶ open
//!                                              │
//!          ┌───────────────────────────────────┘
//!          ├─ [1] TP ladder    → mark rungs, position stays open
//!          ├─ [2] Stop-loss    → close
//!          └─ [3] Opposite dir → close (only if [2] did not)
//! ```
//!
//! A position opened in this step is managed in the same step, against the
//! same bar. Entry is evaluated before management, so a position closed here
//! is never re-opened until the next run.

use tracing::debug;

use crate::config::StrategyConfig;
use crate::engine::signal::Signal;
use crate::engine::trend::Direction;
use crate::error::BotError;
use crate::models::{Bar, OpenPosition, PositionState, Side, NUM_TP};

/// Next state plus the signals emitted on the way, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub state:    PositionState,
    pub signals:  Vec<Signal>,
    /// The direction pair the step was decided on.
    pub dir_prev: Direction,
    pub dir_now:  Direction,
}

/// Side to open when the last two directions form an entry flip.
pub fn entry_side(dir_prev: Direction, dir_now: Direction) -> Option<Side> {
    match (dir_prev, dir_now) {
        (Direction::Short, Direction::Long) => Some(Side::Long),
        (Direction::Long, Direction::Short) => Some(Side::Short),
        _ => None,
    }
}

/// Advance `prev` by one bar. Only the last two entries of `directions` and
/// the high/low/close of `bar` are read.
pub fn step(
    prev:       &PositionState,
    directions: &[Direction],
    bar:        &Bar,
    config:     &StrategyConfig,
) -> Result<StepOutcome, BotError> {
    let &[.., dir_prev, dir_now] = directions else {
        return Err(BotError::InsufficientData {
            needed: 2,
            got:    directions.len(),
        });
    };

    let mut state = prev.clone();
    let mut signals = Vec::new();

    if !state.is_open() {
        if let Some(side) = entry_side(dir_prev, dir_now) {
            state = PositionState::Open(OpenPosition::new(side, bar.close));
            signals.push(Signal::Entry { side, price: bar.close });
        }
    }

    let closed = match &mut state {
        PositionState::Open(pos) => manage(pos, dir_now, bar, config, &mut signals),
        PositionState::Flat => false,
    };
    if closed {
        state = PositionState::Flat;
    }

    Ok(StepOutcome {
        state,
        signals,
        dir_prev,
        dir_now,
    })
}

/// Ladder, then stop-loss, then opposite signal. Returns `true` when the
/// position was closed.
fn manage(
    pos:      &mut OpenPosition,
    dir_now:  Direction,
    bar:      &Bar,
    config:   &StrategyConfig,
    signals:  &mut Vec<Signal>,
) -> bool {
    let stop_loss = pos.stop_loss_price(config.sl_percent);

    for level in 1..=NUM_TP {
        if pos.take_profits_hit.contains(&level) {
            continue;
        }
        let tp = pos.take_profit_price(level, config.tp_percent);
        let hit = match pos.side {
            Side::Long  => bar.high >= tp,
            Side::Short => bar.low <= tp,
        };
        if hit {
            debug!(level, tp, side = %pos.side, "TP rung reached");
            pos.take_profits_hit.insert(level);
            signals.push(Signal::TakeProfit { level, price: tp });
        }
    }

    let stop_hit = match pos.side {
        Side::Long  => bar.low <= stop_loss,
        Side::Short => bar.high >= stop_loss,
    };
    if stop_hit {
        debug!(stop_loss, side = %pos.side, "Stop-loss breached");
        signals.push(Signal::StopLoss { price: stop_loss });
        return true;
    }

    if dir_now.opposes(pos.side) {
        debug!(side = %pos.side, direction = ?dir_now, "Trend turned against position");
        signals.push(Signal::OppositeExit { side: pos.side, price: bar.close });
        return true;
    }

    false
}
