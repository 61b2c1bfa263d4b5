//! Shared data structures for tree-sway processing
//!
//! - `TimeSeries`: one channel on its own time axis
//! - `Table`: several channels on one shared index
//! - Result records: peaks, rotations, shifts, synchronized merges, similarity

mod results;
mod series;
mod table;

pub use results::*;
pub use series::*;
pub use table::*;

/// Canonical channel names exchanged with loaders and writers.
pub mod channels {
    pub const EAST_WEST: &str = "East-West inclination";
    pub const NORTH_SOUTH: &str = "North-South inclination";
    pub const TEMPERATURE: &str = "Temperature";
    pub const MAGNITUDE: &str = "Inclination magnitude";
    pub const DIRECTION: &str = "Inclination direction";
    pub const WIND_SPEED: &str = "wind_speed";
    pub const WIND_DIRECTION: &str = "wind_direction";

    /// Label a derived channel with the method that produced it.
    pub fn labelled(channel: &str, method: &str) -> String {
        format!("{channel} - {method}")
    }
}
