//! Similarity Comparator - agreement of two inclinometers during events
//!
//! Two sensors on the same or neighbouring trees should sway together when
//! the wind picks up. The comparison:
//!
//! 1. Aligns B onto A's timestamps (nearest sample within half a period)
//! 2. Finds the sample-accurate lag within `±max_lag_secs` and shifts B
//! 3. Builds an event mask per side: centred rolling max over
//!    `event_window_secs`, thresholded at that side's own `quantile`
//! 4. Scores the union of both masks (Pearson r, RMSE, MAE)
//!
//! Missing data yields no result rather than an error so that many pairs
//! can be compared in bulk.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::alignment::merge::reindex_nearest;
use crate::alignment::{search_shift, NamedSeries};
use crate::config::SimilarityConfig;
use crate::processing::rolling::{rolling_max, window_samples};
use crate::processing::stats::{correlation_p_value, error_metrics, pearson_finite, quantile};
use crate::processing::{require_positive, ProcessingError};
use crate::types::{secs_to_millis, SimilarityResult};

fn check_config(config: &SimilarityConfig) -> Result<(), ProcessingError> {
    if !(config.max_lag_secs.is_finite() && config.max_lag_secs >= 0.0) {
        return Err(ProcessingError::InvalidArgument(format!(
            "max_lag_secs must be >= 0, got {}",
            config.max_lag_secs
        )));
    }
    if !(0.0..=1.0).contains(&config.quantile) {
        return Err(ProcessingError::InvalidArgument(format!(
            "quantile must lie in [0, 1], got {}",
            config.quantile
        )));
    }
    require_positive("event_window_secs", config.event_window_secs)
}

/// `b'[i] = b[i - shift]`, `NaN` where the source index falls outside.
pub fn shift_samples(values: &[f64], shift: i64) -> Vec<f64> {
    let n = values.len() as i64;
    (0..n)
        .map(|i| {
            let src = i - shift;
            if (0..n).contains(&src) {
                values[src as usize]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Samples whose envelope reaches the `q` quantile of its own envelope.
fn event_mask(values: &[f64], window: usize, q: f64) -> Result<Option<Vec<bool>>, ProcessingError> {
    let env = rolling_max(values, window)?;
    Ok(quantile(&env, q).map(|threshold| env.iter().map(|&e| e >= threshold).collect()))
}

/// Compare `b` against `a`, both sampled at about `sample_rate` Hz.
pub fn compare(
    a: NamedSeries<'_>,
    b: NamedSeries<'_>,
    sample_rate: f64,
    config: &SimilarityConfig,
) -> Result<Option<SimilarityResult>, ProcessingError> {
    require_positive("sample_rate", sample_rate)?;
    check_config(config)?;

    if !a.series.has_data() || !b.series.has_data() {
        warn!(a = a.name, b = b.name, "Similarity skipped: stream has no data");
        return Ok(None);
    }

    let half_period_ms = secs_to_millis(0.5 / sample_rate);
    let a_values = a.series.values();
    let b_aligned = reindex_nearest(b.series, a.series.timestamps(), half_period_ms);

    let max_lag = (config.max_lag_secs * sample_rate).round() as usize;
    let Some(best) = search_shift(a_values, &b_aligned, max_lag) else {
        warn!(a = a.name, b = b.name, "Similarity skipped: no computable lag");
        return Ok(None);
    };
    let b_shifted = shift_samples(&b_aligned, best.shift);

    let window = window_samples(config.event_window_secs, 1.0 / sample_rate);
    let (Some(mask_a), Some(mask_b)) = (
        event_mask(a_values, window, config.quantile)?,
        event_mask(&b_shifted, window, config.quantile)?,
    ) else {
        warn!(a = a.name, b = b.name, "Similarity skipped: no event threshold");
        return Ok(None);
    };

    let mut total_samples = 0;
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..a_values.len() {
        let (x, y) = (a_values[i], b_shifted[i]);
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        total_samples += 1;
        if mask_a[i] || mask_b[i] {
            xs.push(x);
            ys.push(y);
        }
    }

    let (Some(correlation), Some((rmse, mae))) = (pearson_finite(&xs, &ys), error_metrics(&xs, &ys))
    else {
        warn!(
            a = a.name,
            b = b.name,
            event_samples = xs.len(),
            "Similarity skipped: event samples carry no correlation"
        );
        return Ok(None);
    };

    let result = SimilarityResult {
        label_a: a.name.to_string(),
        label_b: b.name.to_string(),
        shift_samples: best.shift,
        shift_seconds: best.shift as f64 / sample_rate,
        correlation,
        p_value: correlation_p_value(correlation, xs.len()),
        rmse,
        mae,
        event_samples: xs.len(),
        total_samples,
    };
    debug!(
        a = a.name,
        b = b.name,
        shift = result.shift_samples,
        correlation,
        rmse,
        events = result.event_samples,
        "Similarity computed"
    );
    Ok(Some(result))
}

/// Compare every unordered pair of `streams` in parallel. Pairs without a
/// result are left out.
pub fn compare_all(
    streams: &[NamedSeries<'_>],
    sample_rate: f64,
    config: &SimilarityConfig,
) -> Result<Vec<SimilarityResult>, ProcessingError> {
    let pairs: Vec<(usize, usize)> = (0..streams.len())
        .flat_map(|i| (i + 1..streams.len()).map(move |j| (i, j)))
        .collect();

    let results = pairs
        .par_iter()
        .map(|&(i, j)| compare(streams[i], streams[j], sample_rate, config))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results.into_iter().flatten().collect())
}
