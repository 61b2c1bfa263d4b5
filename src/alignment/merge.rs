//! Merge, downsample and envelope steps of the alignment pipeline.

use super::NamedSeries;
use crate::config::AlignmentConfig;
use crate::processing::rolling::{rolling_max, window_samples};
use crate::processing::{require_positive, ProcessingError};
use crate::types::{secs_to_millis, Table, TimeSeries, Timestamp};

/// Low-rate samples within the high-rate span extended by its own length on
/// both sides: `[h0 - d, h1 + d]` with `d = h1 - h0`.
pub fn trim_to_span(low: &TimeSeries, high: &TimeSeries) -> TimeSeries {
    match high.span() {
        Some((start, end)) => {
            let buffer = end - start;
            low.slice_time(start - buffer, end + buffer)
        }
        None => TimeSeries::default(),
    }
}

/// Sorted union of two strictly increasing indexes.
pub fn union_index(a: &[Timestamp], b: &[Timestamp]) -> Vec<Timestamp> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Values of `series` at its own timestamps within `index`, `NaN` elsewhere.
fn reindex_exact(series: &TimeSeries, index: &[Timestamp]) -> Vec<f64> {
    let (ts, vs) = (series.timestamps(), series.values());
    let mut out = vec![f64::NAN; index.len()];
    let mut j = 0;
    for (slot, &t) in out.iter_mut().zip(index) {
        while j < ts.len() && ts[j] < t {
            j += 1;
        }
        if j < ts.len() && ts[j] == t {
            *slot = vs[j];
        }
    }
    out
}

/// Nearest sample of `series` for every timestamp of `index`, accepted only
/// within `tolerance_ms`. Equidistant neighbours resolve to the earlier one.
pub fn reindex_nearest(series: &TimeSeries, index: &[Timestamp], tolerance_ms: i64) -> Vec<f64> {
    let (ts, vs) = (series.timestamps(), series.values());
    index
        .iter()
        .map(|&t| {
            let pos = ts.partition_point(|&s| s < t);
            let before = pos.checked_sub(1).map(|k| (t - ts[k], k));
            let after = (pos < ts.len()).then(|| (ts[pos] - t, pos));
            let nearest = match (before, after) {
                (Some(b), Some(a)) => Some(if a.0 < b.0 { a } else { b }),
                (b, a) => b.or(a),
            };
            match nearest {
                Some((distance, k)) if distance <= tolerance_ms => vs[k],
                _ => f64::NAN,
            }
        })
        .collect()
}

/// Outer merge of a high- and a low-rate series.
///
/// The index is the union of both indexes. The high channel keeps only its
/// own samples; the low channel is matched to the nearest sample within
/// `tolerance_secs`.
pub fn merge_nearest(
    high: NamedSeries<'_>,
    low: NamedSeries<'_>,
    tolerance_secs: f64,
) -> Result<Table, ProcessingError> {
    if high.name == low.name {
        return Err(ProcessingError::InvalidArgument(format!(
            "merged channels need distinct names, both are '{}'",
            high.name
        )));
    }
    if !(tolerance_secs.is_finite() && tolerance_secs >= 0.0) {
        return Err(ProcessingError::InvalidArgument(format!(
            "merge tolerance must be >= 0, got {tolerance_secs}"
        )));
    }

    let index = union_index(high.series.timestamps(), low.series.timestamps());
    let high_values = reindex_exact(high.series, &index);
    let low_values = reindex_nearest(low.series, &index, secs_to_millis(tolerance_secs));

    Table::new(index)?
        .with_channel(high.name, high_values)?
        .with_channel(low.name, low_values)
}

/// Per-bin maximum on a regular grid of `bin_secs`.
///
/// Bins are aligned to multiples of the bin width since the epoch and run
/// contiguously from the first to the last occupied bin. Each bin is
/// stamped with its start; bins without finite samples hold `NaN`.
pub fn downsample_max(table: &Table, bin_secs: f64) -> Result<Table, ProcessingError> {
    require_positive("bin_secs", bin_secs)?;
    let bin_ms = secs_to_millis(bin_secs);
    if bin_ms < 1 {
        return Err(ProcessingError::InvalidArgument(format!(
            "bin width {bin_secs} s is below the 1 ms index resolution"
        )));
    }

    let index = table.index();
    let (Some(&first), Some(&last)) = (index.first(), index.last()) else {
        return Table::new(Vec::new());
    };
    let first_bin = first.div_euclid(bin_ms);
    let bins = (last.div_euclid(bin_ms) - first_bin + 1) as usize;
    let bin_of = |t: Timestamp| (t.div_euclid(bin_ms) - first_bin) as usize;

    let grid: Vec<Timestamp> = (0..bins as i64).map(|k| (first_bin + k) * bin_ms).collect();
    let mut out = Table::new(grid)?;
    for (name, values) in table.channels() {
        let mut binned = vec![f64::NAN; bins];
        for (&t, &v) in index.iter().zip(values) {
            if !v.is_finite() {
                continue;
            }
            let slot = &mut binned[bin_of(t)];
            if slot.is_nan() || v > *slot {
                *slot = v;
            }
        }
        out.insert(name, binned)?;
    }
    Ok(out)
}

/// Centred rolling maximum of every channel on a grid of `interval_secs`.
pub fn envelope(table: &Table, window_secs: f64, interval_secs: f64) -> Result<Table, ProcessingError> {
    require_positive("window_secs", window_secs)?;
    let window = window_samples(window_secs, interval_secs);
    let mut out = Table::new(table.index().to_vec())?;
    for (name, values) in table.channels() {
        out.insert(name, rolling_max(values, window)?)?;
    }
    Ok(out)
}

/// Trim, merge, downsample and envelope: the comparison table both shift
/// discovery and synchronization correlate on.
pub fn merged_envelope(
    high: NamedSeries<'_>,
    low: NamedSeries<'_>,
    config: &AlignmentConfig,
) -> Result<Table, ProcessingError> {
    let trimmed = trim_to_span(low.series, high.series);
    let merged = merge_nearest(
        high,
        NamedSeries::new(low.name, &trimmed),
        config.merge_tolerance_secs,
    )?;
    let binned = downsample_max(&merged, config.downsample_secs)?;
    let env = envelope(&binned, config.rolling_max_window_secs, config.downsample_secs)?;

    tracing::debug!(
        merged_rows = merged.len(),
        bins = env.len(),
        low_samples = trimmed.len(),
        "Comparison envelope prepared"
    );
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(ts: &[i64], vs: &[f64]) -> TimeSeries {
        TimeSeries::new(ts.to_vec(), vs.to_vec()).unwrap()
    }

    #[test]
    fn test_trim_keeps_one_span_either_side() {
        let high = series(&[10_000, 20_000], &[0.0, 0.0]);
        let low = series(&[-5_000, 0, 15_000, 30_000, 31_000], &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let trimmed = trim_to_span(&low, &high);
        assert_eq!(trimmed.timestamps(), &[0, 15_000, 30_000]);
        assert!(trim_to_span(&low, &TimeSeries::default()).is_empty());
    }

    #[test]
    fn test_union_index_dedupes() {
        assert_eq!(union_index(&[1, 3, 5], &[2, 3, 6]), vec![1, 2, 3, 5, 6]);
        assert_eq!(union_index(&[], &[4]), vec![4]);
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let low = series(&[0, 10_000], &[1.0, 2.0]);
        let out = reindex_nearest(&low, &[-1_000, 4_000, 5_000, 6_000, 13_000, 20_000], 3_000);
        assert_eq!(out[0], 1.0);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert!(out[3].is_nan());
        assert_eq!(out[4], 2.0);
        assert!(out[5].is_nan());

        let wide = reindex_nearest(&low, &[5_000, 6_000], 10_000);
        assert_eq!(wide, vec![1.0, 2.0]);
    }

    #[test]
    fn test_merge_outer_join() {
        let high = series(&[0, 1_000, 2_000], &[1.0, 2.0, 3.0]);
        let low = series(&[1_500], &[9.0]);
        let merged = merge_nearest(
            NamedSeries::new("sway", &high),
            NamedSeries::new("wind", &low),
            1.0,
        )
        .unwrap();
        assert_eq!(merged.index(), &[0, 1_000, 1_500, 2_000]);
        let sway = merged.get("sway").unwrap();
        assert!(sway[2].is_nan());
        assert_eq!(sway[3], 3.0);
        let wind = merged.get("wind").unwrap();
        assert!(wind[0].is_nan());
        assert_eq!(&wind[1..], &[9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_merge_requires_distinct_names() {
        let s = series(&[0], &[1.0]);
        assert!(merge_nearest(NamedSeries::new("a", &s), NamedSeries::new("a", &s), 1.0).is_err());
    }

    #[test]
    fn test_downsample_bin_max_and_gaps() {
        let table = Table::new(vec![61_000, 90_000, 119_000, 250_000])
            .unwrap()
            .with_channel("x", vec![1.0, 5.0, f64::NAN, 2.0])
            .unwrap();
        let out = downsample_max(&table, 60.0).unwrap();
        assert_eq!(out.index(), &[60_000, 120_000, 180_000, 240_000]);
        let x = out.get("x").unwrap();
        assert_eq!(x[0], 5.0);
        assert!(x[1].is_nan());
        assert!(x[2].is_nan());
        assert_eq!(x[3], 2.0);
        assert!(downsample_max(&table, 0.0).is_err());
    }

    #[test]
    fn test_envelope_window_from_seconds() {
        let table = Table::new(vec![0, 60_000, 120_000, 180_000, 240_000])
            .unwrap()
            .with_channel("x", vec![0.0, 0.0, 4.0, 0.0, 0.0])
            .unwrap();
        let out = envelope(&table, 180.0, 60.0).unwrap();
        assert_eq!(out.get("x").unwrap(), &[0.0, 4.0, 4.0, 4.0, 0.0]);
    }
}
