//! Statistics over channels that may contain `NaN` gaps.
//!
//! Every function here skips non-finite samples (or non-finite pairs) rather
//! than propagating them, and reports "not computable" as `None`.

use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::{Data, Median, Statistics};

/// Minimum number of paired samples for a correlation to be reported.
pub const MIN_CORRELATION_PAIRS: usize = 3;

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Median of the finite samples.
pub fn median(values: &[f64]) -> Option<f64> {
    let data = finite(values);
    if data.is_empty() {
        return None;
    }
    Some(Data::new(data).median())
}

/// Mean of the finite samples.
pub fn mean(values: &[f64]) -> Option<f64> {
    let data = finite(values);
    if data.is_empty() {
        return None;
    }
    Some(data.iter().mean())
}

/// Quantile `q` in `[0, 1]` of the finite samples, linear interpolation
/// between the two closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut data = finite(values);
    if data.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    data.sort_by(f64::total_cmp);
    let pos = q * (data.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(data[lo] + (data[hi] - data[lo]) * frac)
}

/// Pairs where both sides are finite.
pub fn finite_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip()
}

/// Pearson correlation over finite pairs.
///
/// Returns `None` for fewer than [`MIN_CORRELATION_PAIRS`] pairs or when either
/// side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let (xs, ys) = finite_pairs(x, y);
    pearson_finite(&xs, &ys)
}

/// Pearson correlation of already-cleaned, equal-length samples.
pub fn pearson_finite(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < MIN_CORRELATION_PAIRS || n != ys.len() {
        return None;
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in xs.iter().zip(ys) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if is_flat(xs, sxx) || is_flat(ys, syy) {
        return None;
    }
    let denominator = (sxx * syy).sqrt();
    if !denominator.is_finite() {
        return None;
    }
    let r = sxy / denominator;
    Some(r.clamp(-1.0, 1.0))
}

/// Zero variance up to rounding noise relative to the signal's own scale.
fn is_flat(values: &[f64], sum_sq_dev: f64) -> bool {
    let scale: f64 = values.iter().map(|v| v * v).sum();
    sum_sq_dev <= 1e-20 * scale
}

/// Two-tailed p-value of a Pearson `r` over `n` pairs (Student's t, n-2 dof).
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 0.9999 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_stat.abs())),
        Err(_) => 1.0,
    }
}

/// Ordinary least squares `y = slope * x + intercept` over finite pairs.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let (xs, ys) = finite_pairs(x, y);
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;
    let sxx: f64 = xs.iter().map(|a| (a - mx).powi(2)).sum();
    if sxx <= 0.0 {
        return None;
    }
    let sxy: f64 = xs.iter().zip(&ys).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Root mean square and mean absolute difference over finite pairs.
pub fn error_metrics(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let (xs, ys) = finite_pairs(x, y);
    if xs.is_empty() {
        return None;
    }
    let n = xs.len() as f64;
    let (sq, abs) = xs
        .iter()
        .zip(&ys)
        .fold((0.0, 0.0), |(sq, abs), (a, b)| (sq + (a - b).powi(2), abs + (a - b).abs()));
    Some(((sq / n).sqrt(), abs / n))
}
