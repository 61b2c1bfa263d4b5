//! Empirical Mode Decomposition drift removal.
//!
//! The channel is sifted into intrinsic mode functions (IMFs). For every
//! IMF the instantaneous frequency is taken from its analytic signal, and
//! only the samples whose frequency lies inside the retained band
//! contribute to the output. The final residue (the trend) is dropped.

use super::{DriftCompensator, DriftParams};
use crate::processing::fft::{fill_gaps, instantaneous_frequency, restore_gaps};
use crate::processing::{require_positive, ProcessingError};

/// `emd`: sum in-band IMF contributions.
pub struct EmdCompensator;

impl DriftCompensator for EmdCompensator {
    fn name(&self) -> &'static str {
        "emd"
    }

    fn compensate(
        &self,
        inclination: &[f64],
        _temperature: Option<&[f64]>,
        params: &DriftParams,
    ) -> Result<Vec<f64>, ProcessingError> {
        require_positive("sample_rate_hz", params.sample_rate_hz)?;
        let (low, high) = (params.emd_freq_low_hz, params.emd_freq_high_hz);
        if !(low >= 0.0 && high > low) {
            return Err(ProcessingError::InvalidArgument(format!(
                "EMD band must satisfy 0 <= low < high, got [{low}, {high}]"
            )));
        }
        if inclination.len() < 4 {
            return Err(ProcessingError::InsufficientData {
                needed: 4,
                available: inclination.len(),
            });
        }

        let (filled, gaps) = fill_gaps(inclination)?;
        let decomposition = decompose(
            &filled,
            params.emd_max_imfs,
            params.emd_max_sift_iterations,
            params.emd_sd_threshold,
        );

        let mut out = vec![0.0; filled.len()];
        for imf in &decomposition.imfs {
            let freq = instantaneous_frequency(imf, params.sample_rate_hz)?;
            for ((acc, v), f) in out.iter_mut().zip(imf).zip(&freq) {
                if (low..=high).contains(f) {
                    *acc += v;
                }
            }
        }

        tracing::debug!(
            imfs = decomposition.imfs.len(),
            samples = filled.len(),
            low_hz = low,
            high_hz = high,
            "EMD drift removal complete"
        );

        Ok(restore_gaps(out, &gaps))
    }
}

// ============================================================================
// Decomposition
// ============================================================================

/// IMFs from highest to lowest frequency, plus the leftover trend.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub imfs: Vec<Vec<f64>>,
    pub residue: Vec<f64>,
}

/// Sift `signal` into at most `max_imfs` modes.
///
/// Each mode is sifted until the Cauchy-type SD criterion falls below
/// `sd_threshold` or `max_sift_iterations` passes have run. Decomposition
/// stops early once the residue no longer has both maxima and minima.
pub fn decompose(
    signal: &[f64],
    max_imfs: usize,
    max_sift_iterations: usize,
    sd_threshold: f64,
) -> Decomposition {
    let mut residue = signal.to_vec();
    let mut imfs = Vec::new();

    while imfs.len() < max_imfs {
        if !has_oscillation(&residue) {
            break;
        }
        let imf = sift(&residue, max_sift_iterations, sd_threshold);
        for (r, v) in residue.iter_mut().zip(&imf) {
            *r -= v;
        }
        imfs.push(imf);
    }

    Decomposition { imfs, residue }
}

fn has_oscillation(values: &[f64]) -> bool {
    let (maxima, minima) = extrema(values);
    !maxima.is_empty() && !minima.is_empty() && maxima.len() + minima.len() >= 3
}

fn sift(signal: &[f64], max_iterations: usize, sd_threshold: f64) -> Vec<f64> {
    let mut h = signal.to_vec();
    for _ in 0..max_iterations.max(1) {
        let (maxima, minima) = extrema(&h);
        if maxima.is_empty() || minima.is_empty() {
            break;
        }
        let upper = envelope(&h, &maxima);
        let lower = envelope(&h, &minima);

        let mut diff_sq = 0.0;
        let mut energy = 0.0;
        for i in 0..h.len() {
            let mean = 0.5 * (upper[i] + lower[i]);
            energy += h[i] * h[i];
            diff_sq += mean * mean;
            h[i] -= mean;
        }

        if energy <= f64::MIN_POSITIVE || diff_sq / energy < sd_threshold {
            break;
        }
    }
    h
}

/// Interior local maxima and minima. A flat run counts at its first sample.
fn extrema(values: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let mut maxima = Vec::new();
    let mut minima = Vec::new();
    for i in 1..values.len().saturating_sub(1) {
        let (prev, cur, next) = (values[i - 1], values[i], values[i + 1]);
        if prev < cur && cur >= next {
            maxima.push(i);
        } else if prev > cur && cur <= next {
            minima.push(i);
        }
    }
    (maxima, minima)
}

/// Cubic-spline envelope through the given extrema, evaluated at every
/// sample. The outermost extrema are mirrored across both channel ends.
fn envelope(values: &[f64], knots: &[usize]) -> Vec<f64> {
    let n = values.len();
    let first = knots[0];
    let last = knots[knots.len() - 1];

    let mut xs = Vec::with_capacity(knots.len() + 2);
    let mut ys = Vec::with_capacity(knots.len() + 2);
    xs.push(-(first as f64));
    ys.push(values[first]);
    for &k in knots {
        xs.push(k as f64);
        ys.push(values[k]);
    }
    xs.push(2.0 * (n - 1) as f64 - last as f64);
    ys.push(values[last]);

    natural_cubic_spline(&xs, &ys, n)
}

/// Natural cubic spline through `(xs, ys)`, evaluated at `0..n`.
/// `xs` must be strictly increasing with at least two knots.
fn natural_cubic_spline(xs: &[f64], ys: &[f64], n: usize) -> Vec<f64> {
    let m = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    // Second derivatives, zero at both ends (Thomas algorithm)
    let mut second = vec![0.0; m];
    if m > 2 {
        let inner = m - 2;
        let mut diag = vec![0.0; inner];
        let mut rhs = vec![0.0; inner];
        for j in 0..inner {
            let i = j + 1;
            diag[j] = 2.0 * (h[i - 1] + h[i]);
            rhs[j] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }
        for j in 1..inner {
            let w = h[j] / diag[j - 1];
            diag[j] -= w * h[j];
            rhs[j] -= w * rhs[j - 1];
        }
        second[inner] = rhs[inner - 1] / diag[inner - 1];
        for j in (0..inner - 1).rev() {
            second[j + 1] = (rhs[j] - h[j + 1] * second[j + 2]) / diag[j];
        }
    }

    let mut out = Vec::with_capacity(n);
    let mut seg = 0;
    for i in 0..n {
        let x = i as f64;
        while seg + 2 < m && x > xs[seg + 1] {
            seg += 1;
        }
        let (x0, x1) = (xs[seg], xs[seg + 1]);
        let hs = h[seg];
        let (a, b) = (x1 - x, x - x0);
        let value = second[seg] * a.powi(3) / (6.0 * hs)
            + second[seg + 1] * b.powi(3) / (6.0 * hs)
            + (ys[seg] / hs - second[seg] * hs / 6.0) * a
            + (ys[seg + 1] / hs - second[seg + 1] * hs / 6.0) * b;
        out.push(value);
    }
    out
}
