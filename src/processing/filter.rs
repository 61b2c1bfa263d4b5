//! Secondary filters chained after drift compensation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{fft, rolling, ProcessingError};

/// Optional smoothing/band limiting applied to compensated inclination.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SecondaryFilter {
    /// Pass-through
    #[default]
    None,
    /// Centred moving mean over `window` samples
    LowPass { window: usize },
    /// Keep spectral content between `low_hz` and `high_hz`
    BandPass { low_hz: f64, high_hz: f64 },
}

impl SecondaryFilter {
    /// Apply the filter to one channel sampled at `sample_rate` Hz.
    pub fn apply(&self, values: &[f64], sample_rate: f64) -> Result<Vec<f64>, ProcessingError> {
        match *self {
            Self::None => Ok(values.to_vec()),
            Self::LowPass { window } => rolling::rolling_mean(values, window),
            Self::BandPass { low_hz, high_hz } => fft::band_pass(values, sample_rate, low_hz, high_hz),
        }
    }

    /// Short name used when labelling filtered channels.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::LowPass { .. } => "low-pass",
            Self::BandPass { .. } => "band-pass",
        }
    }

    /// Attach the parameters a filter kind needs.
    pub fn from_kind(kind: FilterKind, lowpass_window: usize, band_low_hz: f64, band_high_hz: f64) -> Self {
        match kind {
            FilterKind::None => Self::None,
            FilterKind::LowPass => Self::LowPass {
                window: lowpass_window,
            },
            FilterKind::BandPass => Self::BandPass {
                low_hz: band_low_hz,
                high_hz: band_high_hz,
            },
        }
    }
}

impl fmt::Display for SecondaryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Filter name without parameters, as written in config files and on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    #[default]
    None,
    LowPass,
    BandPass,
}

impl FromStr for FilterKind {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "low-pass" => Ok(Self::LowPass),
            "band-pass" => Ok(Self::BandPass),
            other => Err(ProcessingError::UnknownMethod {
                kind: "filter",
                name: other.to_string(),
            }),
        }
    }
}
