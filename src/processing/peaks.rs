//! Peak extraction on a single channel.
//!
//! `find_n_peaks` follows the usual local-maximum pipeline: plateau-aware
//! maxima, then a minimum horizontal distance (higher peaks win), then an
//! optional prominence floor. Survivors are ranked by value and the top
//! `count` are returned in time order.

use crate::types::{Peak, TimeSeries};

use super::{require_positive, ProcessingError};

/// Global maximum of the series. `None` when there is no finite sample.
pub fn find_max_peak(series: &TimeSeries) -> Option<Peak> {
    let mut best: Option<usize> = None;
    for (i, v) in series.values().iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some(b) if series.values()[b] >= *v => {}
            _ => best = Some(i),
        }
    }
    best.map(|i| Peak {
        timestamp: series.timestamps()[i],
        value: series.values()[i],
    })
}

/// Up to `count` salient maxima sorted by timestamp ascending.
///
/// # Arguments
/// * `count` - Maximum number of peaks returned (must be > 0)
/// * `sample_rate` - Sampling rate in Hz used to convert `min_time_diff`
/// * `min_time_diff` - Minimum separation between peaks in seconds
/// * `prominence` - Optional minimum prominence; `None` disables the filter
pub fn find_n_peaks(
    series: &TimeSeries,
    count: usize,
    sample_rate: f64,
    min_time_diff: f64,
    prominence: Option<f64>,
) -> Result<Vec<Peak>, ProcessingError> {
    if count == 0 {
        return Err(ProcessingError::InvalidArgument(
            "peak count must be > 0".to_string(),
        ));
    }
    require_positive("sample_rate", sample_rate)?;
    require_positive("min_time_diff", min_time_diff)?;
    if let Some(p) = prominence {
        if !(p.is_finite() && p >= 0.0) {
            return Err(ProcessingError::InvalidArgument(format!(
                "prominence must be >= 0, got {p}"
            )));
        }
    }

    let values = series.values();
    let distance = ((min_time_diff * sample_rate).ceil() as usize).max(1);

    let mut peaks = local_maxima(values);
    peaks = select_by_distance(values, &peaks, distance);
    if let Some(min_prominence) = prominence {
        peaks.retain(|&i| peak_prominence(values, i) >= min_prominence);
    }

    peaks.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    peaks.truncate(count);
    peaks.sort_unstable();

    tracing::debug!(
        found = peaks.len(),
        requested = count,
        distance_samples = distance,
        "Peak extraction complete"
    );

    Ok(peaks
        .into_iter()
        .map(|i| Peak {
            timestamp: series.timestamps()[i],
            value: values[i],
        })
        .collect())
}

/// Indices of local maxima. A flat top counts once, at its middle sample.
fn local_maxima(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                let right_edge = ahead - 1;
                peaks.push((i + right_edge) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Drop peaks closer than `distance` samples to a higher peak.
fn select_by_distance(values: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }

    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| values[peaks[b]].total_cmp(&values[peaks[a]]).then(a.cmp(&b)));

    for &k in &order {
        if !keep[k] {
            continue;
        }
        let centre = peaks[k];
        // Neighbours on the left
        let mut j = k;
        while j > 0 && centre - peaks[j - 1] < distance {
            keep[j - 1] = false;
            j -= 1;
        }
        // Neighbours on the right
        let mut j = k + 1;
        while j < peaks.len() && peaks[j] - centre < distance {
            keep[j] = false;
            j += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Height of a peak above the higher of its two surrounding valleys.
///
/// Each valley is the minimum between the peak and the nearest strictly
/// higher sample on that side (or the channel edge).
fn peak_prominence(values: &[f64], peak: usize) -> f64 {
    let height = values[peak];

    let mut left_min = height;
    for &v in values[..peak].iter().rev() {
        if v > height {
            break;
        }
        if v < left_min {
            left_min = v;
        }
    }

    let mut right_min = height;
    for &v in &values[peak + 1..] {
        if v > height {
            break;
        }
        if v < right_min {
            right_min = v;
        }
    }

    height - left_min.max(right_min)
}
