//! # models::bar
//!
//! One OHLCV sample for a fixed interval, as returned by the market-data
//! collaborator.  Bars are immutable once fetched and always handed to the
//! engine oldest-first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open time of the interval.
    pub timestamp: DateTime<Utc>,
    pub open:      f64,
    pub high:      f64,
    pub low:       f64,
    pub close:     f64,
    pub volume:    f64,
}

impl Bar {
    /// `(high + low) / 2` — the anchor the trend stops are measured from.
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// True range against the previous bar's close:
    /// `max(high - low, |high - prev_close|, |low - prev_close|)`.
    #[inline]
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc::now(),
            open: close,
            high,
            low,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(make_bar(110.0, 90.0, 100.0).midpoint(), 100.0);
    }

    #[test]
    fn test_true_range_plain_range() {
        let bar = make_bar(105.0, 95.0, 102.0);
        assert!((bar.true_range(100.0) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_true_range_gap_up() {
        let bar = make_bar(115.0, 108.0, 112.0);
        assert!((bar.true_range(100.0) - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_true_range_gap_down() {
        let bar = make_bar(92.0, 85.0, 88.0);
        assert!((bar.true_range(100.0) - 15.0).abs() < 1e-10);
    }
}
