//! Pipeline Configuration Module
//!
//! Every tunable of the sway pipeline (sample rate, drift method, search
//! windows, similarity thresholds) loaded from a TOML file.
//!
//! ## Loading Order
//!
//! 1. `TREESWAY_CONFIG` environment variable (path to TOML file)
//! 2. `treesway.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Load once at startup and pass the sections the components need:
//!
//! ```ignore
//! let config = SwayConfig::load();
//! let plan = config.compensation_plan();
//! let corrected = compensation::compensate_table(&table, &plan)?;
//! let shift = alignment::discover_shift(high, low, &config.alignment)?;
//! ```

mod sway_config;
pub mod defaults;
pub mod validation;

pub use sway_config::*;
