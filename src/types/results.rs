//! Result records produced by the core and handed to persistence/rendering.

use serde::{Deserialize, Serialize};

use super::series::Timestamp;
use super::table::Table;

/// A salient extremum of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Rotation applied by an axis rotator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Angle the channels were rotated by (radians, counter-clockwise positive)
    pub angle_rad: f64,
    /// Same angle in degrees
    pub angle_deg: f64,
}

impl Rotation {
    pub fn from_radians(angle_rad: f64) -> Self {
        Self {
            angle_rad,
            angle_deg: angle_rad.to_degrees(),
        }
    }
}

/// Outcome of a cross-correlation shift search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftResult {
    /// Winning lag in samples of the compared grid. Positive means the
    /// second series has to be moved later in time.
    pub shift_samples: i64,
    /// Winning lag converted to seconds
    pub shift_seconds: f64,
    /// Correlation with no shift applied (diagnostic), if computable
    pub reference_correlation: Option<f64>,
    /// Correlation at the winning lag
    pub correlation: f64,
    /// Number of paired samples behind `correlation`
    pub paired_samples: usize,
    /// Spacing of the compared grid in seconds
    pub interval_seconds: f64,
}

/// Merged tables before and after applying a shift to the low-rate series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Shift applied to the low-rate series in seconds
    pub shift_seconds: f64,
    /// Merge, downsample and envelope without any shift
    pub reference: Table,
    /// Same steps after shifting the low-rate series
    pub shifted: Table,
    /// Zero-lag correlation of the reference merge
    pub reference_correlation: Option<f64>,
    /// Zero-lag correlation of the shifted merge
    pub shifted_correlation: Option<f64>,
}

/// Shift outcome for one member of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemShift {
    pub id: String,
    pub result: Option<ShiftResult>,
    /// Whether the item passed the correlation threshold
    pub accepted: bool,
}

/// Representative shift for a batch of related measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchShift {
    pub items: Vec<BatchItemShift>,
    /// Median of the accepted items' shift in seconds
    pub median_shift_seconds: Option<f64>,
    pub accepted_count: usize,
}

/// Agreement between two synchronized streams over their event samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub label_a: String,
    pub label_b: String,
    /// Shift applied to the second stream (samples and seconds)
    pub shift_samples: i64,
    pub shift_seconds: f64,
    /// Pearson correlation over the event samples
    pub correlation: f64,
    /// Two-tailed p-value of `correlation`
    pub p_value: f64,
    /// Root mean square difference over the event samples
    pub rmse: f64,
    /// Mean absolute difference over the event samples
    pub mae: f64,
    /// Number of paired event samples
    pub event_samples: usize,
    /// Number of samples considered before masking
    pub total_samples: usize,
}
