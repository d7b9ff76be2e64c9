//! # models::position
//!
//! The synthetic position the bot tracks between runs.
//!
//! ## Enum vs. persisted record
//! The persisted record carries `inPosition`, `direction`, `entryPrice` and
//! `tpsHit` side by side, which lets a file say "flat, but short at 100".
//! In memory a position is either [`PositionState::Flat`] or
//! [`PositionState::Open`]; closing drops the whole [`OpenPosition`], so side,
//! entry price and the take-profit hit set disappear together.
//! The flat record lives in [`crate::store`].

use std::collections::BTreeSet;
use std::fmt;

/// Length of the take-profit ladder. Fixed, not configurable.
pub const NUM_TP: u8 = 5;

// ─── Side ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Wire encoding used by the state file: `1` long, `-1` short.
    pub fn signum(self) -> i8 {
        match self {
            Side::Long  => 1,
            Side::Short => -1,
        }
    }

    pub fn from_signum(value: i8) -> Option<Self> {
        match value {
            1  => Some(Side::Long),
            -1 => Some(Side::Short),
            _  => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long  => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

// ─── OpenPosition ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side:             Side,
    pub entry_price:      f64,
    /// Ladder levels (1..=NUM_TP) already reached by this position.
    pub take_profits_hit: BTreeSet<u8>,
}

impl OpenPosition {
    /// A fresh position always starts with an empty hit set.
    pub fn new(side: Side, entry_price: f64) -> Self {
        Self {
            side,
            entry_price,
            take_profits_hit: BTreeSet::new(),
        }
    }

    pub fn stop_loss_price(&self, sl_percent: f64) -> f64 {
        match self.side {
            Side::Long  => self.entry_price * (1.0 - sl_percent / 100.0),
            Side::Short => self.entry_price * (1.0 + sl_percent / 100.0),
        }
    }

    pub fn take_profit_price(&self, level: u8, tp_percent: f64) -> f64 {
        let step = tp_percent / 100.0 * f64::from(level);
        match self.side {
            Side::Long  => self.entry_price * (1.0 + step),
            Side::Short => self.entry_price * (1.0 - step),
        }
    }
}

// ─── PositionState ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    /// No open position. Default when the store has no prior record.
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open(_))
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            PositionState::Open(pos) => Some(pos.side),
            PositionState::Flat      => None,
        }
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self {
            PositionState::Open(pos) => Some(pos.entry_price),
            PositionState::Flat      => None,
        }
    }

    pub fn take_profits_hit(&self) -> Option<&BTreeSet<u8>> {
        match self {
            PositionState::Open(pos) => Some(&pos.take_profits_hit),
            PositionState::Flat      => None,
        }
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::Open(pos) => write!(
                f,
                "{} @ {:.4} (TPs hit: {:?})",
                pos.side, pos.entry_price, pos.take_profits_hit
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signum_round_trip() {
        assert_eq!(Side::from_signum(Side::Long.signum()), Some(Side::Long));
        assert_eq!(Side::from_signum(Side::Short.signum()), Some(Side::Short));
        assert_eq!(Side::from_signum(0), None);
    }

    #[test]
    fn test_long_levels() {
        let pos = OpenPosition::new(Side::Long, 100.0);
        assert!((pos.stop_loss_price(1.0) - 99.0).abs() < 1e-9);
        assert!((pos.take_profit_price(1, 0.5) - 100.5).abs() < 1e-9);
        assert!((pos.take_profit_price(2, 0.5) - 101.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_levels() {
        let pos = OpenPosition::new(Side::Short, 200.0);
        assert!((pos.stop_loss_price(1.0) - 202.0).abs() < 1e-9);
        assert!((pos.take_profit_price(5, 0.5) - 195.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_is_flat() {
        let state = PositionState::default();
        assert!(!state.is_open());
        assert_eq!(state.side(), None);
        assert_eq!(state.entry_price(), None);
        assert!(state.take_profits_hit().is_none());
    }
}
