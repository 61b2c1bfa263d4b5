//! FFT tools using rustfft
//!
//! Spectral helpers for sway analysis:
//!
//! - Analytic signal (Hilbert transform) for instantaneous frequency of EMD modes
//! - Frequency-domain band-pass filtering of inclination channels
//!
//! # Example
//!
//! ```ignore
//! use treesway::processing::{band_pass, instantaneous_frequency};
//!
//! let sway_band = band_pass(&east_west, 20.0, 0.1, 1.0)?;
//! let inst_freq = instantaneous_frequency(&imf, 20.0)?;
//! ```

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

use super::{require_positive, ProcessingError};

// ============================================================================
// FFT Processor (Pre-planned for repeated use)
// ============================================================================

/// FFT processor with pre-planned forward and inverse transforms.
///
/// Use this when transforming many channels of the same length.
pub struct FftProcessor {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    size: usize,
    sampling_rate: f64,
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `size` - Exact transform length (rustfft handles any length)
    /// * `sampling_rate` - Sampling rate in Hz
    pub fn new(size: usize, sampling_rate: f64) -> Result<Self, ProcessingError> {
        require_positive("sampling_rate", sampling_rate)?;
        if size == 0 {
            return Err(ProcessingError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);

        Ok(Self {
            forward,
            inverse,
            size,
            sampling_rate,
        })
    }

    /// Forward transform of a real signal.
    pub fn forward(&self, signal: &[f64]) -> Result<Vec<Complex<f64>>, ProcessingError> {
        if signal.len() != self.size {
            return Err(ProcessingError::Fft(format!(
                "signal length {} does not match planned size {}",
                signal.len(),
                self.size
            )));
        }
        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        self.forward.process(&mut buffer);
        Ok(buffer)
    }

    /// Inverse transform, normalized by 1/N.
    pub fn inverse(&self, mut spectrum: Vec<Complex<f64>>) -> Result<Vec<Complex<f64>>, ProcessingError> {
        if spectrum.len() != self.size {
            return Err(ProcessingError::Fft(format!(
                "spectrum length {} does not match planned size {}",
                spectrum.len(),
                self.size
            )));
        }
        self.inverse.process(&mut spectrum);
        let scale = 1.0 / self.size as f64;
        for c in &mut spectrum {
            *c *= scale;
        }
        Ok(spectrum)
    }

    /// Signed frequency (Hz) of FFT bin `k`.
    pub fn bin_frequency(&self, k: usize) -> f64 {
        let resolution = self.frequency_resolution();
        if k <= self.size / 2 {
            k as f64 * resolution
        } else {
            -((self.size - k) as f64) * resolution
        }
    }

    /// Get the FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the frequency resolution (Hz per bin)
    pub fn frequency_resolution(&self) -> f64 {
        self.sampling_rate / self.size as f64
    }
}

// ============================================================================
// Gap handling
// ============================================================================

/// Replace NaN gaps with the mean of the finite samples so a transform can run.
/// Returns the filled signal and the gap positions.
pub(crate) fn fill_gaps(signal: &[f64]) -> Result<(Vec<f64>, Vec<usize>), ProcessingError> {
    let gaps: Vec<usize> = signal
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_finite())
        .map(|(i, _)| i)
        .collect();
    if gaps.len() == signal.len() {
        return Err(ProcessingError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    let fill = super::stats::mean(signal).unwrap_or(0.0);
    let filled = signal
        .iter()
        .map(|&v| if v.is_finite() { v } else { fill })
        .collect();
    Ok((filled, gaps))
}

pub(crate) fn restore_gaps(mut values: Vec<f64>, gaps: &[usize]) -> Vec<f64> {
    for &i in gaps {
        values[i] = f64::NAN;
    }
    values
}

// ============================================================================
// Standalone functions
// ============================================================================

/// Analytic signal `x + i·H(x)` via the FFT method.
///
/// Positive frequencies are doubled, negative frequencies removed; DC and
/// (for even lengths) Nyquist keep unit weight.
pub fn analytic_signal(signal: &[f64]) -> Result<Vec<Complex<f64>>, ProcessingError> {
    let n = signal.len();
    // Sample rate does not matter for the Hilbert weights
    let processor = FftProcessor::new(n, 1.0)?;
    let mut spectrum = processor.forward(signal)?;

    for (k, c) in spectrum.iter_mut().enumerate() {
        let weight = if k == 0 || (n % 2 == 0 && k == n / 2) {
            1.0
        } else if k < n.div_ceil(2) {
            2.0
        } else {
            0.0
        };
        *c *= weight;
    }

    processor.inverse(spectrum)
}

/// Instantaneous frequency (Hz) of a mono-component signal.
///
/// Derivative of the unwrapped analytic phase, central differences inside
/// and one-sided differences at both ends. Same length as the input.
pub fn instantaneous_frequency(signal: &[f64], sample_rate: f64) -> Result<Vec<f64>, ProcessingError> {
    require_positive("sample_rate", sample_rate)?;
    let n = signal.len();
    if n < 2 {
        return Err(ProcessingError::InsufficientData {
            needed: 2,
            available: n,
        });
    }

    let analytic = analytic_signal(signal)?;
    let phase = unwrap_phase(&analytic.iter().map(|c| c.arg()).collect::<Vec<_>>());
    let to_hz = sample_rate / (2.0 * PI);

    let mut freq = Vec::with_capacity(n);
    freq.push((phase[1] - phase[0]) * to_hz);
    for i in 1..n - 1 {
        freq.push((phase[i + 1] - phase[i - 1]) * 0.5 * to_hz);
    }
    freq.push((phase[n - 1] - phase[n - 2]) * to_hz);
    Ok(freq)
}

/// Remove 2π jumps from a wrapped phase sequence.
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phase.len());
    let mut offset = 0.0;
    let mut prev: Option<f64> = None;
    for &p in phase {
        if let Some(q) = prev {
            let delta = p - q;
            if delta > PI {
                offset -= 2.0 * PI * ((delta + PI) / (2.0 * PI)).floor();
            } else if delta < -PI {
                offset += 2.0 * PI * ((-delta + PI) / (2.0 * PI)).floor();
            }
        }
        out.push(p + offset);
        prev = Some(p);
    }
    out
}

/// Keep only spectral content with `low_hz <= |f| <= high_hz`.
///
/// NaN samples are bridged with the channel mean for the transform and
/// reported as NaN again in the output.
pub fn band_pass(
    signal: &[f64],
    sample_rate: f64,
    low_hz: f64,
    high_hz: f64,
) -> Result<Vec<f64>, ProcessingError> {
    require_positive("sample_rate", sample_rate)?;
    if !(low_hz >= 0.0 && high_hz > low_hz) {
        return Err(ProcessingError::InvalidArgument(format!(
            "band must satisfy 0 <= low < high, got [{low_hz}, {high_hz}]"
        )));
    }
    if signal.is_empty() {
        return Ok(Vec::new());
    }

    let (filled, gaps) = fill_gaps(signal)?;
    let processor = FftProcessor::new(filled.len(), sample_rate)?;
    let mut spectrum = processor.forward(&filled)?;

    for (k, c) in spectrum.iter_mut().enumerate() {
        let f = processor.bin_frequency(k).abs();
        if f < low_hz || f > high_hz {
            *c = Complex::new(0.0, 0.0);
        }
    }

    let filtered = processor.inverse(spectrum)?.iter().map(|c| c.re).collect();

    tracing::debug!(
        samples = signal.len(),
        low_hz,
        high_hz,
        resolution_hz = processor.frequency_resolution(),
        "Band-pass filter applied"
    );

    Ok(restore_gaps(filtered, &gaps))
}

// ============================================================================
// Tests
// ============================================================================
