//! System-wide default constants.
//!
//! Every default value of [`SwayConfig`](super::SwayConfig) lives here,
//! grouped by config section.

// ============================================================================
// Sensor
// ============================================================================

/// Native inclinometer sampling rate (Hz).
pub const SAMPLE_RATE_HZ: f64 = 20.0;

// ============================================================================
// Drift
// ============================================================================

/// Rolling mean window for the moving-average method (samples).
///
/// 1 000 samples = 50 s at 20 Hz.
pub const MOVING_AVERAGE_WINDOW: usize = 1_000;

/// Retained EMD band, lower edge (Hz).
pub const EMD_FREQ_LOW_HZ: f64 = 0.05;

/// Retained EMD band, upper edge (Hz).
pub const EMD_FREQ_HIGH_HZ: f64 = 2.0;

/// Maximum number of intrinsic mode functions.
pub const EMD_MAX_IMFS: usize = 10;

/// Maximum sifting passes per mode.
pub const EMD_MAX_SIFT_ITERATIONS: usize = 50;

/// Sifting SD stop criterion (Huang et al. suggest 0.2-0.3).
pub const EMD_SD_THRESHOLD: f64 = 0.2;

/// Low-pass window for the secondary filter (samples).
pub const LOWPASS_WINDOW: usize = 20;

/// Band-pass secondary filter edges (Hz).
pub const BAND_LOW_HZ: f64 = 0.1;
pub const BAND_HIGH_HZ: f64 = 2.0;

// ============================================================================
// Peaks
// ============================================================================

/// Number of peaks reported per channel.
pub const PEAK_COUNT: usize = 10;

/// Minimum time between reported peaks (seconds).
pub const PEAK_MIN_TIME_DIFF_SECS: f64 = 60.0;

// ============================================================================
// Alignment
// ============================================================================

/// Search window for the wind/inclination shift (seconds).
pub const MAX_SHIFT_SECS: f64 = 3_600.0;

/// Bin width of the comparison grid (seconds).
pub const DOWNSAMPLE_SECS: f64 = 60.0;

/// Centred rolling-max envelope width (seconds).
pub const ROLLING_MAX_WINDOW_SECS: f64 = 1_800.0;

/// Nearest-match tolerance when merging the low-rate stream (seconds).
///
/// Wind stations report roughly every 10 minutes.
pub const MERGE_TOLERANCE_SECS: f64 = 600.0;

/// Minimum winning correlation for an item to join the batch median.
pub const BATCH_MIN_CORRELATION: f64 = 0.5;

// ============================================================================
// Similarity
// ============================================================================

/// Maximum lag searched between two inclinometers (seconds).
pub const SIMILARITY_MAX_LAG_SECS: f64 = 10.0;

/// Envelope quantile above which a sample counts as an event.
pub const SIMILARITY_QUANTILE: f64 = 0.95;

/// Rolling-max window used for the event envelope (seconds).
pub const SIMILARITY_EVENT_WINDOW_SECS: f64 = 30.0;
