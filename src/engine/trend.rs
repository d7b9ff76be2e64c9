//! # engine::trend
//!
//! **Stop-and-reverse trend tracker** — one [`Direction`] per bar.
//!
//! ```text
//!   midpoint   = (high + low) / 2
//!   long_stop  = midpoint - volatility
//!   short_stop = midpoint + volatility
//!
//!   Short ── close > short_stop ──▶ Long
//!   Long  ── close < long_stop  ──▶ Short
//!   anything else                   carry previous direction
//! ```
//!
//! Direction only reverses when price crosses the stop on the far side of the
//! band, so closes inside `[long_stop, short_stop]` never flip it.
//!
//! Bar 0 is always `Neutral`. No rule above fires from `Neutral`, so a series
//! that starts there stays there. `neutral_breakout` adds the band breakout
//! as an exit from `Neutral` only.

use crate::models::{Bar, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Neutral,
    Long,
    Short,
}

impl Direction {
    /// `true` when this direction points against a position held on `side`.
    pub fn opposes(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Direction::Short, Side::Long) | (Direction::Long, Side::Short)
        )
    }
}

/// Direction plus the stop that direction is trailing on this bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub direction: Direction,
    pub stop:      f64,
}

/// `true` when `now` is a fresh direction: a reversal, or leaving `Neutral`.
pub fn is_flip(prev: Direction, now: Direction) -> bool {
    prev != now && now != Direction::Neutral
}

/// Advance one bar from `prev`.
pub fn advance(prev: Direction, bar: &Bar, volatility: f64, neutral_breakout: bool) -> TrendPoint {
    let mid        = bar.midpoint();
    let long_stop  = mid - volatility;
    let short_stop = mid + volatility;

    let direction = match prev {
        Direction::Short if bar.close > short_stop => Direction::Long,
        Direction::Long if bar.close < long_stop   => Direction::Short,
        Direction::Neutral if neutral_breakout => {
            if bar.close > short_stop {
                Direction::Long
            } else if bar.close < long_stop {
                Direction::Short
            } else {
                Direction::Neutral
            }
        }
        carried => carried,
    };

    let stop = if direction == Direction::Long { long_stop } else { short_stop };
    TrendPoint { direction, stop }
}

/// One [`TrendPoint`] per bar, same length as `bars`.
pub fn compute_directions(bars: &[Bar], volatility: f64, neutral_breakout: bool) -> Vec<TrendPoint> {
    let mut rest = bars.iter();
    let Some(first) = rest.next() else {
        return Vec::new();
    };

    let seed = TrendPoint {
        direction: Direction::Neutral,
        stop:      first.midpoint(),
    };

    std::iter::once(seed)
        .chain(rest.scan(seed, |prev, bar| {
            *prev = advance(prev.direction, bar, volatility, neutral_breakout);
            Some(*prev)
        }))
        .collect()
}
