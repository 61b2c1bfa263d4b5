//! Representative shift over a batch of related measurements.
//!
//! Shifts are discovered per item in parallel; items whose winning
//! correlation reaches `batch_min_correlation` vote, and the median of their
//! seconds-equivalents is reported. Items with insufficient data simply do
//! not vote.

use rayon::prelude::*;
use tracing::{info, warn};

use super::{check_config, discover_shift, NamedSeries};
use crate::config::AlignmentConfig;
use crate::processing::stats::median;
use crate::processing::ProcessingError;
use crate::types::{BatchItemShift, BatchShift};

/// One measurement of a batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchItem<'a> {
    pub id: &'a str,
    pub high: NamedSeries<'a>,
    pub low: NamedSeries<'a>,
}

/// Discover every item's shift and the median over the accepted ones.
///
/// Configuration errors fail the whole batch; per-item data problems only
/// drop that item.
pub fn batch_median_shift(
    items: &[BatchItem<'_>],
    config: &AlignmentConfig,
) -> Result<BatchShift, ProcessingError> {
    check_config(config)?;

    let results = items
        .par_iter()
        .map(|item| discover_shift(item.high, item.low, config))
        .collect::<Result<Vec<_>, _>>()?;

    let items: Vec<BatchItemShift> = items
        .iter()
        .zip(results)
        .map(|(item, result)| {
            let accepted = result.is_some_and(|r| r.correlation >= config.batch_min_correlation);
            match &result {
                None => warn!(id = item.id, "Batch item has no shift"),
                Some(r) if !accepted => warn!(
                    id = item.id,
                    correlation = r.correlation,
                    threshold = config.batch_min_correlation,
                    "Batch item below correlation threshold"
                ),
                Some(_) => {}
            }
            BatchItemShift {
                id: item.id.to_string(),
                result,
                accepted,
            }
        })
        .collect();

    let accepted_seconds: Vec<f64> = items
        .iter()
        .filter(|i| i.accepted)
        .filter_map(|i| i.result.map(|r| r.shift_seconds))
        .collect();
    let median_shift_seconds = median(&accepted_seconds);

    info!(
        items = items.len(),
        accepted = accepted_seconds.len(),
        median_shift_seconds,
        "Batch shift computed"
    );

    Ok(BatchShift {
        accepted_count: accepted_seconds.len(),
        median_shift_seconds,
        items,
    })
}
