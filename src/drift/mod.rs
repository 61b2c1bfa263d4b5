//! Thermal drift compensation for inclination channels
//!
//! Each method removes the slow, temperature-correlated bias from one
//! inclination channel and returns a corrected channel on the same index.
//!
//! ## Methods
//!
//! 1. **original** - identity, kept as a comparison baseline
//! 2. **linear** - OLS against median-centred temperature, residual re-centred
//! 3. **linear-alt** - same fit through a degree-1 polynomial solve
//! 4. **moving-average** - subtract a centred rolling mean (no re-centring)
//! 5. **emd** - keep intrinsic-mode contributions inside a frequency band
//!
//! Method names are parsed into [`DriftMethod`] up front; an unknown name is an
//! error at parse time, never a silent fallback.

pub mod emd;
pub mod moving_average;
pub mod regression;

pub use emd::EmdCompensator;
pub use moving_average::MovingAverageCompensator;
pub use regression::{LinearAltCompensator, LinearCompensator, LinearModel};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::defaults;
use crate::processing::ProcessingError;

/// Parameters shared by all drift methods. Each method reads what it needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftParams {
    /// Sampling rate of the inclination channel (Hz)
    pub sample_rate_hz: f64,
    /// Rolling mean window for `moving-average` (samples)
    pub moving_average_window: usize,
    /// Lower edge of the retained EMD band (Hz, inclusive)
    pub emd_freq_low_hz: f64,
    /// Upper edge of the retained EMD band (Hz, inclusive)
    pub emd_freq_high_hz: f64,
    /// Maximum number of intrinsic mode functions extracted
    pub emd_max_imfs: usize,
    /// Maximum sifting passes per mode
    pub emd_max_sift_iterations: usize,
    /// Sifting stops once the normalized squared difference drops below this
    pub emd_sd_threshold: f64,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::SAMPLE_RATE_HZ,
            moving_average_window: defaults::MOVING_AVERAGE_WINDOW,
            emd_freq_low_hz: defaults::EMD_FREQ_LOW_HZ,
            emd_freq_high_hz: defaults::EMD_FREQ_HIGH_HZ,
            emd_max_imfs: defaults::EMD_MAX_IMFS,
            emd_max_sift_iterations: defaults::EMD_MAX_SIFT_ITERATIONS,
            emd_sd_threshold: defaults::EMD_SD_THRESHOLD,
        }
    }
}

/// Trait implemented once per drift method.
pub trait DriftCompensator: Send + Sync {
    /// Method name used for labelling output channels
    fn name(&self) -> &'static str;

    /// Whether the method needs the auxiliary temperature channel
    fn needs_temperature(&self) -> bool {
        false
    }

    /// Corrected channel on the same index as `inclination`
    fn compensate(
        &self,
        inclination: &[f64],
        temperature: Option<&[f64]>,
        params: &DriftParams,
    ) -> Result<Vec<f64>, ProcessingError>;
}

/// Identity method.
pub struct OriginalCompensator;

impl DriftCompensator for OriginalCompensator {
    fn name(&self) -> &'static str {
        "original"
    }

    fn compensate(
        &self,
        inclination: &[f64],
        _temperature: Option<&[f64]>,
        _params: &DriftParams,
    ) -> Result<Vec<f64>, ProcessingError> {
        Ok(inclination.to_vec())
    }
}

/// Closed set of drift methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftMethod {
    Original,
    #[default]
    Linear,
    LinearAlt,
    MovingAverage,
    Emd,
}

impl DriftMethod {
    pub const ALL: [Self; 5] = [
        Self::Original,
        Self::Linear,
        Self::LinearAlt,
        Self::MovingAverage,
        Self::Emd,
    ];

    /// Implementation behind this method.
    pub fn compensator(self) -> &'static dyn DriftCompensator {
        match self {
            Self::Original => &OriginalCompensator,
            Self::Linear => &LinearCompensator,
            Self::LinearAlt => &LinearAltCompensator,
            Self::MovingAverage => &MovingAverageCompensator,
            Self::Emd => &EmdCompensator,
        }
    }

    pub fn name(self) -> &'static str {
        self.compensator().name()
    }

    /// Run the method on one channel.
    pub fn compensate(
        self,
        inclination: &[f64],
        temperature: Option<&[f64]>,
        params: &DriftParams,
    ) -> Result<Vec<f64>, ProcessingError> {
        let compensator = self.compensator();
        if compensator.needs_temperature() && temperature.is_none() {
            return Err(ProcessingError::MissingChannel(
                crate::types::channels::TEMPERATURE.to_string(),
            ));
        }
        compensator.compensate(inclination, temperature, params)
    }
}

impl FromStr for DriftMethod {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| ProcessingError::UnknownMethod {
                kind: "drift",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for DriftMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_is_identity() {
        let v = vec![0.5, -1.25, f64::NAN, 3.0];
        let out = DriftMethod::Original
            .compensate(&v, None, &DriftParams::default())
            .unwrap();
        assert_eq!(out.len(), v.len());
        for (a, b) in v.iter().zip(&out) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn test_names_round_trip() {
        for m in DriftMethod::ALL {
            assert_eq!(m.name().parse::<DriftMethod>().unwrap(), m);
            assert_eq!(m.to_string(), m.name());
        }
        assert_eq!(DriftMethod::LinearAlt.name(), "linear-alt");
        assert_eq!(DriftMethod::MovingAverage.name(), "moving-average");
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = "polynomial".parse::<DriftMethod>().unwrap_err();
        assert_eq!(
            err,
            ProcessingError::UnknownMethod {
                kind: "drift",
                name: "polynomial".to_string()
            }
        );
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&DriftMethod::MovingAverage).unwrap();
        assert_eq!(json, "\"moving-average\"");
        assert!(serde_json::from_str::<DriftMethod>("\"kalman\"").is_err());
    }

    #[test]
    fn test_regression_requires_temperature() {
        let err = DriftMethod::Linear
            .compensate(&[1.0, 2.0, 3.0], None, &DriftParams::default())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::MissingChannel(_)));
    }
}
