//! Sway Configuration - every tunable of the pipeline as TOML values
//!
//! Each section implements `Default` with the constants in
//! [`defaults`](super::defaults), so a missing file or a partial file behaves
//! exactly like the built-in settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::compensation::CompensationPlan;
use crate::drift::{DriftMethod, DriftParams};
use crate::processing::filter::{FilterKind, SecondaryFilter};
use crate::rotation::RotationMethod;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "TREESWAY_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "treesway.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `SwayConfig::load()` which searches:
/// 1. `$TREESWAY_CONFIG` env var
/// 2. `./treesway.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwayConfig {
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Drift compensation, secondary filter and rotation
    #[serde(default)]
    pub drift: DriftConfig,

    #[serde(default)]
    pub peaks: PeakConfig,

    /// Shift discovery between high- and low-rate streams
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Pairwise comparison of two inclinometers
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

impl SwayConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that fails to load is logged and the search continues.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validate every section, collecting all problems before failing.
    ///
    /// Suspicious but usable values are logged as warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Drift parameters with the sensor sample rate filled in.
    pub fn drift_params(&self) -> DriftParams {
        let d = &self.drift;
        DriftParams {
            sample_rate_hz: self.sensor.sample_rate_hz,
            moving_average_window: d.moving_average_window,
            emd_freq_low_hz: d.emd_freq_low_hz,
            emd_freq_high_hz: d.emd_freq_high_hz,
            emd_max_imfs: d.emd_max_imfs,
            emd_max_sift_iterations: d.emd_max_sift_iterations,
            emd_sd_threshold: d.emd_sd_threshold,
        }
    }

    /// Secondary filter selected by `[drift] filter`.
    pub fn secondary_filter(&self) -> SecondaryFilter {
        let d = &self.drift;
        SecondaryFilter::from_kind(d.filter, d.lowpass_window, d.band_low_hz, d.band_high_hz)
    }

    /// Full compensation plan described by the `[drift]` section.
    pub fn compensation_plan(&self) -> CompensationPlan {
        CompensationPlan::new(self.drift.method, self.drift_params())
            .with_filter(self.secondary_filter())
            .with_rotation(self.drift.rotation)
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sensor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Inclinometer sampling rate (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: f64,
}

fn default_sample_rate() -> f64 {
    defaults::SAMPLE_RATE_HZ
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate(),
        }
    }
}

// ============================================================================
// Drift
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// original | linear | linear-alt | moving-average | emd
    #[serde(default)]
    pub method: DriftMethod,

    /// Rolling mean window for `moving-average` (samples)
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: usize,

    #[serde(default = "default_emd_freq_low")]
    pub emd_freq_low_hz: f64,

    #[serde(default = "default_emd_freq_high")]
    pub emd_freq_high_hz: f64,

    #[serde(default = "default_emd_max_imfs")]
    pub emd_max_imfs: usize,

    #[serde(default = "default_emd_max_sift")]
    pub emd_max_sift_iterations: usize,

    #[serde(default = "default_emd_sd_threshold")]
    pub emd_sd_threshold: f64,

    /// none | low-pass | band-pass
    #[serde(default)]
    pub filter: FilterKind,

    /// Window of the low-pass filter (samples)
    #[serde(default = "default_lowpass_window")]
    pub lowpass_window: usize,

    #[serde(default = "default_band_low")]
    pub band_low_hz: f64,

    #[serde(default = "default_band_high")]
    pub band_high_hz: f64,

    /// none | pca | regression
    #[serde(default)]
    pub rotation: RotationMethod,
}

fn default_moving_average_window() -> usize {
    defaults::MOVING_AVERAGE_WINDOW
}

fn default_emd_freq_low() -> f64 {
    defaults::EMD_FREQ_LOW_HZ
}

fn default_emd_freq_high() -> f64 {
    defaults::EMD_FREQ_HIGH_HZ
}

fn default_emd_max_imfs() -> usize {
    defaults::EMD_MAX_IMFS
}

fn default_emd_max_sift() -> usize {
    defaults::EMD_MAX_SIFT_ITERATIONS
}

fn default_emd_sd_threshold() -> f64 {
    defaults::EMD_SD_THRESHOLD
}

fn default_lowpass_window() -> usize {
    defaults::LOWPASS_WINDOW
}

fn default_band_low() -> f64 {
    defaults::BAND_LOW_HZ
}

fn default_band_high() -> f64 {
    defaults::BAND_HIGH_HZ
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            method: DriftMethod::default(),
            moving_average_window: default_moving_average_window(),
            emd_freq_low_hz: default_emd_freq_low(),
            emd_freq_high_hz: default_emd_freq_high(),
            emd_max_imfs: default_emd_max_imfs(),
            emd_max_sift_iterations: default_emd_max_sift(),
            emd_sd_threshold: default_emd_sd_threshold(),
            filter: FilterKind::default(),
            lowpass_window: default_lowpass_window(),
            band_low_hz: default_band_low(),
            band_high_hz: default_band_high(),
            rotation: RotationMethod::default(),
        }
    }
}

// ============================================================================
// Peaks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakConfig {
    #[serde(default = "default_peak_count")]
    pub count: usize,

    /// Minimum separation between reported peaks (seconds)
    #[serde(default = "default_peak_min_time_diff")]
    pub min_time_diff_secs: f64,

    /// Minimum prominence; absent disables the filter
    #[serde(default)]
    pub prominence: Option<f64>,
}

fn default_peak_count() -> usize {
    defaults::PEAK_COUNT
}

fn default_peak_min_time_diff() -> f64 {
    defaults::PEAK_MIN_TIME_DIFF_SECS
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            count: default_peak_count(),
            min_time_diff_secs: default_peak_min_time_diff(),
            prominence: None,
        }
    }
}

// ============================================================================
// Alignment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Largest shift searched in either direction (seconds)
    #[serde(default = "default_max_shift")]
    pub max_shift_secs: f64,

    /// Bin width of the comparison grid (seconds)
    #[serde(default = "default_downsample")]
    pub downsample_secs: f64,

    /// Width of the centred rolling-max envelope (seconds)
    #[serde(default = "default_rolling_max_window")]
    pub rolling_max_window_secs: f64,

    /// Nearest-match tolerance for the low-rate stream (seconds)
    #[serde(default = "default_merge_tolerance")]
    pub merge_tolerance_secs: f64,

    /// Minimum winning correlation for batch acceptance
    #[serde(default = "default_batch_min_correlation")]
    pub batch_min_correlation: f64,
}

fn default_max_shift() -> f64 {
    defaults::MAX_SHIFT_SECS
}

fn default_downsample() -> f64 {
    defaults::DOWNSAMPLE_SECS
}

fn default_rolling_max_window() -> f64 {
    defaults::ROLLING_MAX_WINDOW_SECS
}

fn default_merge_tolerance() -> f64 {
    defaults::MERGE_TOLERANCE_SECS
}

fn default_batch_min_correlation() -> f64 {
    defaults::BATCH_MIN_CORRELATION
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_shift_secs: default_max_shift(),
            downsample_secs: default_downsample(),
            rolling_max_window_secs: default_rolling_max_window(),
            merge_tolerance_secs: default_merge_tolerance(),
            batch_min_correlation: default_batch_min_correlation(),
        }
    }
}

// ============================================================================
// Similarity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Largest lag searched between the two streams (seconds)
    #[serde(default = "default_similarity_max_lag")]
    pub max_lag_secs: f64,

    /// Envelope quantile defining an event, in [0, 1]
    #[serde(default = "default_similarity_quantile")]
    pub quantile: f64,

    /// Rolling-max window of the event envelope (seconds)
    #[serde(default = "default_similarity_event_window")]
    pub event_window_secs: f64,
}

fn default_similarity_max_lag() -> f64 {
    defaults::SIMILARITY_MAX_LAG_SECS
}

fn default_similarity_quantile() -> f64 {
    defaults::SIMILARITY_QUANTILE
}

fn default_similarity_event_window() -> f64 {
    defaults::SIMILARITY_EVENT_WINDOW_SECS
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            max_lag_secs: default_similarity_max_lag(),
            quantile: default_similarity_quantile(),
            event_window_secs: default_similarity_event_window(),
        }
    }
}
