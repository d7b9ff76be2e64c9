//! # engine::signal
//!
//! Every event the position manager can report. `Display` renders the text
//! the notifier delivers.

use std::fmt;

use crate::models::Side;

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// New position opened at the bar close.
    Entry { side: Side, price: f64 },
    /// Ladder rung reached. The position stays open.
    TakeProfit { level: u8, price: f64 },
    /// Stop-loss breached. The position is closed.
    StopLoss { price: f64 },
    /// Trend turned against the position. The position is closed.
    OppositeExit { side: Side, price: f64 },
}

impl Signal {
    /// `true` for signals that close the position.
    pub fn is_exit(&self) -> bool {
        matches!(self, Signal::StopLoss { .. } | Signal::OppositeExit { .. })
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Entry { side: Side::Long, price } => write!(f, "🚀 LONG ENTRY @ {price:.4}"),
            Signal::Entry { side: Side::Short, price } => write!(f, "🐻 SHORT ENTRY @ {price:.4}"),
            Signal::TakeProfit { level, price } => write!(f, "✅ TP{level} HIT @ {price:.4}"),
            Signal::StopLoss { price } => write!(f, "💀 SL HIT @ {price:.4} — EXIT"),
            Signal::OppositeExit { side, price } => {
                write!(f, "↔️ {side} EXIT @ {price:.4} (Opposite Signal)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_texts() {
        assert_eq!(
            Signal::Entry { side: Side::Long, price: 100.0 }.to_string(),
            "🚀 LONG ENTRY @ 100.0000"
        );
        assert_eq!(
            Signal::Entry { side: Side::Short, price: 42.123456 }.to_string(),
            "🐻 SHORT ENTRY @ 42.1235"
        );
        assert_eq!(
            Signal::TakeProfit { level: 3, price: 101.5 }.to_string(),
            "✅ TP3 HIT @ 101.5000"
        );
        assert_eq!(
            Signal::StopLoss { price: 99.0 }.to_string(),
            "💀 SL HIT @ 99.0000 — EXIT"
        );
        assert_eq!(
            Signal::OppositeExit { side: Side::Short, price: 100.25 }.to_string(),
            "↔️ SHORT EXIT @ 100.2500 (Opposite Signal)"
        );
    }

    #[test]
    fn test_is_exit() {
        assert!(Signal::StopLoss { price: 1.0 }.is_exit());
        assert!(Signal::OppositeExit { side: Side::Long, price: 1.0 }.is_exit());
        assert!(!Signal::TakeProfit { level: 1, price: 1.0 }.is_exit());
        assert!(!Signal::Entry { side: Side::Long, price: 1.0 }.is_exit());
    }
}
