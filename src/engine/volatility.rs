//! # engine::volatility
//!
//! Turns a bar window into one volatility magnitude: a simple average of the
//! most recent true ranges, scaled by the risk multiplier.
//!
//! ## Short windows
//! The sum of the last `window_length` true ranges is always divided by
//! `window_length`, even when the window holds fewer true ranges than that.
//! A 5-bar window with `window_length = 14` therefore averages 4 values and
//! divides by 14, under-weighting volatility at startup. Stops computed from
//! a short history are tighter than a true average would give.

use tracing::debug;

use crate::error::BotError;
use crate::models::Bar;

/// Minimum bars for one true range.
pub const MIN_BARS: usize = 2;

/// Average of the last `window_length` true ranges × `risk_multiplier`.
///
/// `window_length` must be at least 1 (enforced by config loading); 0 yields
/// a magnitude of 0.
pub fn estimate(bars: &[Bar], window_length: usize, risk_multiplier: f64) -> Result<f64, BotError> {
    if bars.len() < MIN_BARS {
        return Err(BotError::InsufficientData {
            needed: MIN_BARS,
            got:    bars.len(),
        });
    }
    if window_length == 0 {
        return Ok(0.0);
    }

    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();

    let recent = &true_ranges[true_ranges.len().saturating_sub(window_length)..];
    let average = recent.iter().sum::<f64>() / window_length as f64;

    debug!(
        true_ranges = true_ranges.len(),
        used        = recent.len(),
        window_length,
        average,
        "Volatility estimated"
    );

    Ok(average * risk_multiplier)
}
