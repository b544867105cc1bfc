//! Bucket size estimation for server-side aggregation.
//!
//! The backend resamples each log into fixed buckets before returning it.
//! Asking for more points than the plot has pixels wastes bandwidth, so the
//! bucket size is chosen from the plot width and the time span on screen.
//!
//! The point-count model `floor(span_ms * 0.00125871022496 * i^-1.073596)`
//! was fitted against the backend's real output for 1s..10s buckets.

use crate::error::{Result, ViewerError};

/// Largest bucket size searched (exclusive), in seconds.
pub const MAX_BUCKET_SECONDS: u32 = 3600;

const POINTS_PER_MS: f64 = 0.00125871022496;
const DECAY_EXPONENT: f64 = 1.073596;

/// Projected number of X points for `span_ms` at `bucket_seconds`.
pub fn projected_points(span_ms: f64, bucket_seconds: u32) -> f64 {
    let decay = (1.0 / bucket_seconds as f64).powf(DECAY_EXPONENT);
    (span_ms * POINTS_PER_MS * decay).trunc()
}

/// Smallest bucket size in seconds whose projected point count is below
/// `pixel_width`.
///
/// A non-finite span yields 1. Returns `GranularityUnresolvable` when no
/// bucket in `[1, 3600)` fits.
pub fn estimate(pixel_width: u32, span_ms: f64) -> Result<u32> {
    if !span_ms.is_finite() {
        return Ok(1);
    }

    let width = pixel_width as f64;
    (1..MAX_BUCKET_SECONDS)
        .find(|&i| projected_points(span_ms, i) < width)
        .ok_or(ViewerError::GranularityUnresolvable {
            pixel_width,
            span_ms,
        })
}

/// Query parameter form of a bucket size, e.g. `14S`.
pub fn granularity_param(bucket_seconds: u32) -> String {
    format!("{}S", bucket_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nan_span_yields_one() {
        assert_eq!(estimate(800, f64::NAN), Ok(1));
        assert_eq!(estimate(800, f64::INFINITY), Ok(1));
    }

    #[test]
    fn test_golden_values() {
        // 10s on 800px: 12 projected points, one-second buckets suffice.
        assert_eq!(estimate(800, 10_000.0), Ok(1));
        assert_eq!(estimate(800, 60_000.0), Ok(1));
        // 13s buckets still project 801 points.
        assert_eq!(projected_points(10_000_000.0, 13), 801.0);
        assert_eq!(estimate(800, 10_000_000.0), Ok(14));
        assert_eq!(estimate(1000, 3_600_000.0), Ok(5));
        assert_eq!(estimate(400, 3_600_000.0), Ok(10));
    }

    #[test]
    fn test_unresolvable_is_an_error() {
        let err = estimate(1, 1_000_000_000.0).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::GranularityUnresolvable { pixel_width: 1, .. }
        ));
        assert!(estimate(0, 10_000.0).is_err());
    }

    #[test]
    fn test_empty_span() {
        assert_eq!(estimate(800, 0.0), Ok(1));
    }

    #[test]
    fn test_granularity_param() {
        assert_eq!(granularity_param(1), "1S");
        assert_eq!(granularity_param(14), "14S");
    }

    proptest! {
        #[test]
        fn prop_non_decreasing_in_span(
            width in 200u32..4000,
            a in 0i64..50_000_000,
            b in 0i64..50_000_000,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let lo_bucket = estimate(width, lo as f64).unwrap();
            let hi_bucket = estimate(width, hi as f64).unwrap();
            prop_assert!(lo_bucket <= hi_bucket);
        }

        #[test]
        fn prop_non_increasing_in_width(
            a in 200u32..4000,
            b in 200u32..4000,
            span in 0i64..50_000_000,
        ) {
            let (narrow, wide) = if a <= b { (a, b) } else { (b, a) };
            let narrow_bucket = estimate(narrow, span as f64).unwrap();
            let wide_bucket = estimate(wide, span as f64).unwrap();
            prop_assert!(wide_bucket <= narrow_bucket);
        }
    }
}
