//! treesway: tree-sway inclination and wind alignment
//!
//! Signal processing for inclinometers mounted on trees, plus the alignment
//! of those high-rate streams against low-rate wind observations.
//!
//! ## Architecture
//!
//! - **Processing**: inclination math, peaks, rolling windows, statistics, FFT tools
//! - **Drift**: thermal-drift compensation (regression, moving average, EMD)
//! - **Rotation**: PCA and regression axis rotation
//! - **Compensation**: drift → filter → rotation → derived channels
//! - **Alignment**: merge, downsample, envelope and shift search between streams
//! - **Similarity**: event-window agreement between two sensors

pub mod alignment;
pub mod compensation;
pub mod config;
pub mod drift;
pub mod processing;
pub mod rotation;
pub mod similarity;
pub mod table_io;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, SwayConfig};

// Re-export commonly used types
pub use types::{
    channels, BatchShift, Peak, Rotation, ShiftResult, SimilarityResult, SyncResult, Table,
    TimeSeries, Timestamp,
};

// Re-export pipeline entry points
pub use alignment::{batch_median_shift, discover_shift, synchronize, BatchItem, NamedSeries};
pub use compensation::{compensate_methods, compensate_table, CompensationPlan};
pub use drift::{DriftMethod, DriftParams};
pub use processing::filter::{FilterKind, SecondaryFilter};
pub use processing::ProcessingError;
pub use rotation::RotationMethod;
pub use similarity::{compare, compare_all};
