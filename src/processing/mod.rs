//! Signal processing module - inclination math, peaks, rolling windows and FFT tools
//!
//! Everything in here is a pure function over borrowed slices or
//! [`TimeSeries`](crate::types::TimeSeries) values. Higher-level components
//! (drift compensation, rotation, alignment, similarity) are built on top.

pub mod fft;
pub mod filter;
pub mod inclination;
pub mod peaks;
pub mod rolling;
pub mod stats;

pub use fft::{analytic_signal, band_pass, instantaneous_frequency, FftProcessor};
pub use filter::SecondaryFilter;
pub use inclination::{direction, magnitude};
pub use peaks::{find_max_peak, find_n_peaks};

use thiserror::Error;

/// Errors in signal processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown {kind} method '{name}'")]
    UnknownMethod { kind: &'static str, name: String },

    #[error("Length mismatch: {left} vs {right} samples")]
    LengthMismatch { left: usize, right: usize },

    #[error("Missing channel '{0}'")]
    MissingChannel(String),

    #[error("Invalid time index: {0}")]
    InvalidIndex(String),

    #[error("Insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("FFT error: {0}")]
    Fft(String),
}

/// Ensure two channels line up sample for sample.
pub(crate) fn check_lengths(left: &[f64], right: &[f64]) -> Result<(), ProcessingError> {
    if left.len() == right.len() {
        Ok(())
    } else {
        Err(ProcessingError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        })
    }
}

/// Reject zero, negative and non-finite scalars.
pub(crate) fn require_positive(name: &str, value: f64) -> Result<(), ProcessingError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProcessingError::InvalidArgument(format!(
            "{name} must be > 0, got {value}"
        )))
    }
}
