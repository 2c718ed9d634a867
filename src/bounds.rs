//! Per-channel spend corridors derived from the standard split.
//!
//! Channels holding at least [`LARGE_SHARE_THRESHOLD_PCT`] of a unit's baseline
//! spend may move by [`LARGE_SHARE_DEVIATION`] around their baseline; smaller
//! channels by [`SMALL_SHARE_DEVIATION`]. Bounds are in currency, not slots.

use serde::Serialize;

use crate::catalog::ChannelEntry;
use crate::error::DataError;

/// Share of unit baseline spend (percent) at which the tighter corridor applies.
pub const LARGE_SHARE_THRESHOLD_PCT: f64 = 10.0;

/// Relative corridor for channels at or above the threshold.
pub const LARGE_SHARE_DEVIATION: f64 = 0.20;

/// Relative corridor for channels below the threshold.
pub const SMALL_SHARE_DEVIATION: f64 = 0.30;

/// Allowed spend range of one entry within its optimization unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundRecord {
    /// Entry baseline spend as a percentage of the unit baseline total.
    pub share_pct: f64,
    pub deviation: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Relative deviation allowed for an entry holding `share_pct` of its unit.
pub fn classify_deviation(share_pct: f64) -> f64 {
    if share_pct >= LARGE_SHARE_THRESHOLD_PCT {
        LARGE_SHARE_DEVIATION
    } else {
        SMALL_SHARE_DEVIATION
    }
}

/// Compute one [`BoundRecord`] per entry of the unit named `unit`.
///
/// # Errors
///
/// [`DataError::EmptyUnit`] for no entries and [`DataError::ZeroBaselineTotal`]
/// when the unit's baseline spend does not sum to a positive number.
pub fn compute_bounds(unit: &str, entries: &[ChannelEntry]) -> Result<Vec<BoundRecord>, DataError> {
    if entries.is_empty() {
        return Err(DataError::EmptyUnit {
            unit: unit.to_string(),
        });
    }

    let total: f64 = entries.iter().map(|e| e.baseline_spend).sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(DataError::ZeroBaselineTotal {
            unit: unit.to_string(),
        });
    }

    Ok(entries
        .iter()
        .map(|e| {
            let share_pct = e.baseline_spend / total * 100.0;
            let deviation = classify_deviation(share_pct);
            BoundRecord {
                share_pct,
                deviation,
                lower_bound: e.baseline_spend * (1.0 - deviation),
                upper_bound: e.baseline_spend * (1.0 + deviation),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(price: f64, rating: f64) -> ChannelEntry {
        ChannelEntry {
            channel_id: format!("ch-{}-{}", price, rating),
            sales_house_id: "SH".to_string(),
            segment: "All".to_string(),
            price,
            rating,
            affinity: 1.0,
            baseline_spend: price * rating,
        }
    }

    #[test]
    fn test_classify_deviation_threshold() {
        assert_eq!(classify_deviation(10.0), 0.20);
        assert_eq!(classify_deviation(55.0), 0.20);
        assert_eq!(classify_deviation(9.999), 0.30);
        assert_eq!(classify_deviation(0.0), 0.30);
    }

    #[test]
    fn test_equal_shares_get_tight_band() {
        let bounds = compute_bounds("SH", &[entry(1000.0, 10.0), entry(2000.0, 5.0)]).unwrap();
        for b in &bounds {
            assert!((b.share_pct - 50.0).abs() < 1e-12);
            assert_eq!(b.deviation, 0.20);
            assert!((b.lower_bound - 8000.0).abs() < 1e-9);
            assert!((b.upper_bound - 12000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_small_share_gets_wide_band() {
        // 95000 vs 5000: the small channel holds 5 %
        let bounds = compute_bounds("SH", &[entry(1000.0, 95.0), entry(1000.0, 5.0)]).unwrap();
        assert_eq!(bounds[0].deviation, 0.20);
        assert_eq!(bounds[1].deviation, 0.30);
        assert!((bounds[1].lower_bound - 3500.0).abs() < 1e-9);
        assert!((bounds[1].upper_bound - 6500.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_bracket_baseline() {
        // Sweep a range of share mixes; the corridor must always contain the baseline.
        for k in 1..60 {
            let entries: Vec<_> = (1..=8)
                .map(|i| entry(500.0 + 137.0 * i as f64, (k * i % 23 + 1) as f64))
                .collect();
            let bounds = compute_bounds("SH", &entries).unwrap();
            let total_share: f64 = bounds.iter().map(|b| b.share_pct).sum();
            assert!((total_share - 100.0).abs() < 1e-9);
            for (e, b) in entries.iter().zip(&bounds) {
                assert!(0.0 <= b.lower_bound);
                assert!(b.lower_bound <= e.baseline_spend);
                assert!(e.baseline_spend <= b.upper_bound);
                let expected = if b.share_pct >= 10.0 { 0.20 } else { 0.30 };
                assert_eq!(b.deviation, expected);
            }
        }
    }

    #[test]
    fn test_zero_baseline_total_is_data_error() {
        let err = compute_bounds("Space", &[entry(1000.0, 0.0), entry(0.0, 4.0)]).unwrap_err();
        assert_eq!(
            err,
            DataError::ZeroBaselineTotal {
                unit: "Space".to_string()
            }
        );
    }

    #[test]
    fn test_empty_unit_is_data_error() {
        assert!(matches!(
            compute_bounds("Space", &[]),
            Err(DataError::EmptyUnit { .. })
        ));
    }
}
