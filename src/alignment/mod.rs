//! Series Aligner - shift discovery between streams of very different rates
//!
//! Typical use: a 20 Hz inclinometer against a wind station reporting every
//! ten minutes. Both are brought onto one coarse grid before correlating:
//!
//! 1. Trim the low-rate stream to the high-rate span plus one span of buffer
//! 2. Outer-merge with nearest matching of the low-rate stream
//! 3. Per-bin maximum on a fixed grid (`downsample_secs`)
//! 4. Centred rolling maximum (`rolling_max_window_secs`) as an envelope
//! 5. Zero-shift reference correlation
//! 6. Search integer shifts in `±round(max_shift_secs / downsample_secs)`
//! 7. Convert the winning shift back to seconds
//!
//! [`synchronize`] applies a shift (discovered or supplied, e.g. a batch
//! median) to the low-rate stream and returns the merges before and after.

pub mod batch;
pub mod merge;
pub mod search;

pub use batch::{batch_median_shift, BatchItem};
pub use merge::{downsample_max, envelope, merge_nearest, merged_envelope, trim_to_span};
pub use search::{correlation_at, search_shift, ShiftCandidate};

use tracing::{debug, info, warn};

use crate::config::AlignmentConfig;
use crate::processing::{require_positive, ProcessingError};
use crate::types::{secs_to_millis, ShiftResult, SyncResult, Table, TimeSeries};

/// A series together with the channel name it carries in merged tables.
#[derive(Debug, Clone, Copy)]
pub struct NamedSeries<'a> {
    pub name: &'a str,
    pub series: &'a TimeSeries,
}

impl<'a> NamedSeries<'a> {
    pub fn new(name: &'a str, series: &'a TimeSeries) -> Self {
        Self { name, series }
    }
}

/// Reject configurations no alignment step can run with.
pub fn check_config(config: &AlignmentConfig) -> Result<(), ProcessingError> {
    require_positive("downsample_secs", config.downsample_secs)?;
    require_positive("rolling_max_window_secs", config.rolling_max_window_secs)?;
    if !(config.max_shift_secs.is_finite() && config.max_shift_secs >= 0.0) {
        return Err(ProcessingError::InvalidArgument(format!(
            "max_shift_secs must be >= 0, got {}",
            config.max_shift_secs
        )));
    }
    if !(config.merge_tolerance_secs.is_finite() && config.merge_tolerance_secs >= 0.0) {
        return Err(ProcessingError::InvalidArgument(format!(
            "merge_tolerance_secs must be >= 0, got {}",
            config.merge_tolerance_secs
        )));
    }
    Ok(())
}

fn zero_lag_correlation(table: &Table, a: &str, b: &str) -> Result<Option<f64>, ProcessingError> {
    Ok(correlation_at(table.require(a)?, table.require(b)?, 0).map(|(r, _)| r))
}

/// Discover the shift that best aligns `low` onto `high`.
///
/// A positive result means `low` has to be moved later in time. Returns
/// `Ok(None)` (logged) when either stream has no data or no candidate shift
/// has a computable correlation.
pub fn discover_shift(
    high: NamedSeries<'_>,
    low: NamedSeries<'_>,
    config: &AlignmentConfig,
) -> Result<Option<ShiftResult>, ProcessingError> {
    check_config(config)?;
    if !high.series.has_data() || !low.series.has_data() {
        warn!(high = high.name, low = low.name, "Shift discovery skipped: stream has no data");
        return Ok(None);
    }

    let env = merged_envelope(high, low, config)?;
    let a = env.require(high.name)?;
    let b = env.require(low.name)?;
    let max_shift = ((config.max_shift_secs / config.downsample_secs).round() as usize).min(env.len());

    let reference_correlation = correlation_at(a, b, 0).map(|(r, _)| r);
    debug!(
        reference_correlation,
        max_shift,
        bins = env.len(),
        "Searching shift"
    );

    let Some(best) = search_shift(a, b, max_shift) else {
        warn!(
            high = high.name,
            low = low.name,
            "Shift discovery found no computable correlation"
        );
        return Ok(None);
    };

    let result = ShiftResult {
        shift_samples: best.shift,
        shift_seconds: best.shift as f64 * config.downsample_secs,
        reference_correlation,
        correlation: best.correlation,
        paired_samples: best.pairs,
        interval_seconds: config.downsample_secs,
    };
    info!(
        high = high.name,
        low = low.name,
        shift_seconds = result.shift_seconds,
        correlation = result.correlation,
        "Shift discovered"
    );
    Ok(Some(result))
}

/// Apply `shift_seconds` to `low` and return the merged envelopes with and
/// without the shift, each with its zero-lag correlation.
pub fn synchronize(
    high: NamedSeries<'_>,
    low: NamedSeries<'_>,
    shift_seconds: f64,
    config: &AlignmentConfig,
) -> Result<SyncResult, ProcessingError> {
    check_config(config)?;
    if !shift_seconds.is_finite() {
        return Err(ProcessingError::InvalidArgument(format!(
            "shift must be finite, got {shift_seconds}"
        )));
    }

    let reference = merged_envelope(high, low, config)?;
    let moved = low.series.shift_time(secs_to_millis(shift_seconds));
    let shifted = merged_envelope(high, NamedSeries::new(low.name, &moved), config)?;

    let reference_correlation = zero_lag_correlation(&reference, high.name, low.name)?;
    let shifted_correlation = zero_lag_correlation(&shifted, high.name, low.name)?;
    info!(
        shift_seconds,
        reference_correlation,
        shifted_correlation,
        "Streams synchronized"
    );

    Ok(SyncResult {
        shift_seconds,
        reference,
        shifted,
        reference_correlation,
        shifted_correlation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(start: i64, step_ms: i64, values: Vec<f64>) -> TimeSeries {
        let ts = (0..values.len() as i64).map(|i| start + i * step_ms).collect();
        TimeSeries::new(ts, values).unwrap()
    }

    #[test]
    fn test_empty_stream_is_absent() {
        let high = regular(0, 1_000, vec![1.0, 2.0, 3.0]);
        let empty = TimeSeries::default();
        let out = discover_shift(
            NamedSeries::new("sway", &high),
            NamedSeries::new("wind", &empty),
            &AlignmentConfig::default(),
        )
        .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let high = regular(0, 1_000, vec![1.0, 2.0, 3.0]);
        let config = AlignmentConfig {
            downsample_secs: 0.0,
            ..AlignmentConfig::default()
        };
        assert!(discover_shift(
            NamedSeries::new("sway", &high),
            NamedSeries::new("wind", &high),
            &config
        )
        .is_err());
    }

    #[test]
    fn test_self_alignment_is_zero_shift() {
        let values: Vec<f64> = (0..720)
            .map(|i| {
                let t = i as f64 * 60.0;
                2.0 + (t / 5_000.0).sin() + 0.4 * (t / 1_700.0).cos()
            })
            .collect();
        let series = regular(0, 60_000, values);
        let config = AlignmentConfig {
            rolling_max_window_secs: 300.0,
            ..AlignmentConfig::default()
        };
        let result = discover_shift(
            NamedSeries::new("a", &series),
            NamedSeries::new("b", &series),
            &config,
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.shift_samples, 0);
        assert_eq!(result.shift_seconds, 0.0);
        assert!((result.correlation - 1.0).abs() < 1e-9);
        assert_eq!(result.reference_correlation, Some(result.correlation));
    }

    #[test]
    fn test_synchronize_zero_shift_matches_reference() {
        let high = regular(0, 60_000, (0..100).map(|i| (i as f64 / 9.0).sin()).collect());
        let low = regular(0, 600_000, (0..10).map(|i| (i as f64 * 10.0 / 9.0).sin()).collect());
        let sync = synchronize(
            NamedSeries::new("sway", &high),
            NamedSeries::new("wind", &low),
            0.0,
            &AlignmentConfig::default(),
        )
        .unwrap();
        assert_eq!(sync.reference, sync.shifted);
        assert_eq!(sync.reference_correlation, sync.shifted_correlation);
        assert!(synchronize(
            NamedSeries::new("sway", &high),
            NamedSeries::new("wind", &low),
            f64::NAN,
            &AlignmentConfig::default(),
        )
        .is_err());
    }
}
