//! Time series: a strictly increasing millisecond index with one value per stamp.

use serde::{Deserialize, Serialize};

use crate::processing::{require_positive, ProcessingError};

/// Milliseconds since the Unix epoch (UTC).
pub type Timestamp = i64;

/// Milliseconds per second, used for every seconds <-> index conversion.
pub const MILLIS_PER_SEC: f64 = 1_000.0;

/// Convert a duration in seconds to whole milliseconds.
pub fn secs_to_millis(secs: f64) -> i64 {
    (secs * MILLIS_PER_SEC).round() as i64
}

/// Verify that an index is strictly increasing.
pub fn check_index(timestamps: &[Timestamp]) -> Result<(), ProcessingError> {
    if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
        return Err(ProcessingError::InvalidIndex(format!(
            "timestamps must be strictly increasing (position {}: {} -> {})",
            pos + 1,
            timestamps[pos],
            timestamps[pos + 1]
        )));
    }
    Ok(())
}

/// One channel sampled on its own time axis. Missing samples are `NaN`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    timestamps: Vec<Timestamp>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series, rejecting mismatched lengths and unordered or duplicate stamps.
    pub fn new(timestamps: Vec<Timestamp>, values: Vec<f64>) -> Result<Self, ProcessingError> {
        if timestamps.len() != values.len() {
            return Err(ProcessingError::LengthMismatch {
                left: timestamps.len(),
                right: values.len(),
            });
        }
        check_index(&timestamps)?;
        Ok(Self { timestamps, values })
    }

    /// Build a regularly sampled series starting at `start` with `sample_rate` Hz.
    pub fn regular(start: Timestamp, sample_rate: f64, values: Vec<f64>) -> Result<Self, ProcessingError> {
        require_positive("sample_rate", sample_rate)?;
        let period_ms = MILLIS_PER_SEC / sample_rate;
        let timestamps = (0..values.len())
            .map(|i| start + (i as f64 * period_ms).round() as i64)
            .collect();
        Self::new(timestamps, values)
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First and last timestamp, if any.
    pub fn span(&self) -> Option<(Timestamp, Timestamp)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }

    /// True if at least one value is not NaN.
    pub fn has_data(&self) -> bool {
        self.values.iter().any(|v| !v.is_nan())
    }

    /// Samples with `start <= t <= end`.
    pub fn slice_time(&self, start: Timestamp, end: Timestamp) -> Self {
        let lo = self.timestamps.partition_point(|&t| t < start);
        let hi = self.timestamps.partition_point(|&t| t <= end);
        let hi = hi.max(lo);
        Self {
            timestamps: self.timestamps[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
        }
    }

    /// Move every timestamp by `offset_ms`. Ordering is preserved.
    pub fn shift_time(&self, offset_ms: i64) -> Self {
        Self {
            timestamps: self.timestamps.iter().map(|t| t + offset_ms).collect(),
            values: self.values.clone(),
        }
    }

    /// Median spacing between samples in seconds.
    pub fn median_interval_secs(&self) -> Option<f64> {
        if self.timestamps.len() < 2 {
            return None;
        }
        let mut gaps: Vec<i64> = self.timestamps.windows(2).map(|w| w[1] - w[0]).collect();
        gaps.sort_unstable();
        Some(gaps[gaps.len() / 2] as f64 / MILLIS_PER_SEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unordered_index() {
        let err = TimeSeries::new(vec![0, 10, 10], vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidIndex(_)));

        let err = TimeSeries::new(vec![0, 20, 10], vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidIndex(_)));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = TimeSeries::new(vec![0, 10], vec![1.0]).unwrap_err();
        assert_eq!(err, ProcessingError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_regular_series_spacing() {
        let s = TimeSeries::regular(1_000, 20.0, vec![0.0; 5]).unwrap();
        assert_eq!(s.timestamps(), &[1_000, 1_050, 1_100, 1_150, 1_200]);
        assert_eq!(s.median_interval_secs(), Some(0.05));
    }

    #[test]
    fn test_slice_and_shift() {
        let s = TimeSeries::new(vec![0, 10, 20, 30], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let sliced = s.slice_time(5, 20);
        assert_eq!(sliced.timestamps(), &[10, 20]);
        assert_eq!(sliced.values(), &[2.0, 3.0]);

        let shifted = s.shift_time(-5);
        assert_eq!(shifted.timestamps(), &[-5, 5, 15, 25]);
        assert_eq!(shifted.values(), s.values());
    }

    #[test]
    fn test_empty_slice_outside_span() {
        let s = TimeSeries::new(vec![0, 10], vec![1.0, 2.0]).unwrap();
        assert!(s.slice_time(100, 200).is_empty());
        assert!(s.slice_time(10, 0).is_empty());
    }
}
