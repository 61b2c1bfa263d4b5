//! Compensation pipeline for one sensor table
//!
//! ```text
//! raw table ─► drift (both axes) ─► secondary filter ─► rotation ─► magnitude/direction
//! ```
//!
//! Every stage is a pure function; the input table is never modified. Derived
//! channels are written next to the originals with a ` - <label>` suffix so a
//! table can carry the results of several methods side by side.

use rayon::prelude::*;

use crate::drift::{DriftMethod, DriftParams};
use crate::processing::filter::SecondaryFilter;
use crate::processing::inclination::with_derived_channels;
use crate::processing::ProcessingError;
use crate::rotation::RotationMethod;
use crate::types::{channels, Rotation, Table};

/// Stages to run over a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensationPlan {
    pub drift: DriftMethod,
    pub params: DriftParams,
    pub filter: SecondaryFilter,
    pub rotation: RotationMethod,
}

impl CompensationPlan {
    pub fn new(drift: DriftMethod, params: DriftParams) -> Self {
        Self {
            drift,
            params,
            filter: SecondaryFilter::None,
            rotation: RotationMethod::None,
        }
    }

    pub fn with_filter(mut self, filter: SecondaryFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_rotation(mut self, rotation: RotationMethod) -> Self {
        self.rotation = rotation;
        self
    }

    /// Channel suffix naming every stage that changed the data,
    /// e.g. `linear`, `emd+band-pass`, `linear+pca`.
    pub fn label(&self) -> String {
        let mut label = self.drift.name().to_string();
        if self.filter != SecondaryFilter::None {
            label.push('+');
            label.push_str(self.filter.label());
        }
        if self.rotation != RotationMethod::None {
            label.push('+');
            label.push_str(self.rotation.name());
        }
        label
    }
}

/// Table produced by [`compensate_table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Compensated {
    pub table: Table,
    pub label: String,
    /// Present when a rotation stage ran
    pub rotation: Option<Rotation>,
}

/// Run `plan` over the inclination pair of `table`.
///
/// The temperature channel is passed to the drift method when present;
/// regression methods fail with `MissingChannel` without it.
pub fn compensate_table(table: &Table, plan: &CompensationPlan) -> Result<Compensated, ProcessingError> {
    let east_west = table.require(channels::EAST_WEST)?;
    let north_south = table.require(channels::NORTH_SOUTH)?;
    let temperature = table.get(channels::TEMPERATURE);
    let sample_rate = plan.params.sample_rate_hz;

    let east_west = plan.drift.compensate(east_west, temperature, &plan.params)?;
    let north_south = plan.drift.compensate(north_south, temperature, &plan.params)?;

    let east_west = plan.filter.apply(&east_west, sample_rate)?;
    let north_south = plan.filter.apply(&north_south, sample_rate)?;

    let (east_west, north_south, rotation) = match plan.rotation {
        RotationMethod::None => (east_west, north_south, None),
        method => {
            let pair = method.apply(&east_west, &north_south)?;
            (pair.first, pair.second, Some(pair.rotation))
        }
    };

    let label = plan.label();
    let labelled = table
        .clone()
        .with_channel(channels::labelled(channels::EAST_WEST, &label), east_west)?
        .with_channel(channels::labelled(channels::NORTH_SOUTH, &label), north_south)?;
    let table = with_derived_channels(&labelled, Some(&label))?;

    tracing::info!(
        label = %label,
        samples = table.len(),
        rotation_deg = rotation.map(|r| r.angle_deg),
        "Compensation complete"
    );

    Ok(Compensated {
        table,
        label,
        rotation,
    })
}

/// Run several drift methods with otherwise identical stages and collect
/// all derived channels into one table. Methods run in parallel.
///
/// A method that lacks data (no usable temperature, too few samples) is
/// logged and left out; the other methods still contribute. Argument errors
/// abort the whole run.
pub fn compensate_methods(
    table: &Table,
    methods: &[DriftMethod],
    base: &CompensationPlan,
) -> Result<Table, ProcessingError> {
    table.require(channels::EAST_WEST)?;
    table.require(channels::NORTH_SOUTH)?;

    let results: Vec<Option<Compensated>> = methods
        .par_iter()
        .map(|&drift| {
            match compensate_table(table, &CompensationPlan { drift, ..*base }) {
                Ok(result) => Ok(Some(result)),
                Err(
                    err @ (ProcessingError::InsufficientData { .. } | ProcessingError::MissingChannel(_)),
                ) => {
                    tracing::warn!(method = %drift, error = %err, "Drift method skipped");
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        })
        .collect::<Result<_, _>>()?;

    let mut combined = table.clone();
    for result in results.into_iter().flatten() {
        let suffix = format!(" - {}", result.label);
        for (name, values) in result.table.channels() {
            if name.ends_with(&suffix) {
                combined.insert(name, values.to_vec())?;
            }
        }
    }
    Ok(combined)
}
