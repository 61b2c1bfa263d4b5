//! Temperature regression drift compensation.
//!
//! Both methods centre temperature on its median, fit inclination against
//! it, subtract the prediction and re-centre the residual on its median.
//! They differ only in how the line is fitted, which lets one cross-check
//! the other.

use super::{DriftCompensator, DriftParams};
use crate::processing::stats::{finite_pairs, linear_fit, median};
use crate::processing::{check_lengths, ProcessingError};

/// Fitted straight line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearModel {
    /// Ordinary least squares over finite pairs.
    ///
    /// A predictor without variance yields a flat model through the mean.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self, ProcessingError> {
        let (xs, ys) = finite_pairs(x, y);
        let n = xs.len();
        if n < 2 {
            return Err(ProcessingError::InsufficientData {
                needed: 2,
                available: n,
            });
        }
        Ok(match linear_fit(&xs, &ys) {
            Some((slope, intercept)) => Self { slope, intercept },
            None => Self {
                slope: 0.0,
                intercept: ys.iter().sum::<f64>() / n as f64,
            },
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares degree-1 polynomial via the 2x2 normal equations of the
/// Vandermonde design `[x, 1]`. Returns `[slope, intercept]`.
pub fn polyfit_degree1(x: &[f64], y: &[f64]) -> Result<[f64; 2], ProcessingError> {
    let (xs, ys) = finite_pairs(x, y);
    let n = xs.len();
    if n < 2 {
        return Err(ProcessingError::InsufficientData {
            needed: 2,
            available: n,
        });
    }

    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for (a, b) in xs.iter().zip(&ys) {
        sx += a;
        sy += b;
        sxx += a * a;
        sxy += a * b;
    }
    let nf = n as f64;
    let det = nf * sxx - sx * sx;
    if det.abs() <= f64::EPSILON * nf * sxx {
        return Ok([0.0, sy / nf]);
    }
    let slope = (nf * sxy - sx * sy) / det;
    let intercept = (sxx * sy - sx * sxy) / det;
    Ok([slope, intercept])
}

fn centred_temperature(
    inclination: &[f64],
    temperature: Option<&[f64]>,
) -> Result<Vec<f64>, ProcessingError> {
    let temperature = temperature.ok_or_else(|| {
        ProcessingError::MissingChannel(crate::types::channels::TEMPERATURE.to_string())
    })?;
    check_lengths(inclination, temperature)?;
    let centre = median(temperature).ok_or(ProcessingError::InsufficientData {
        needed: 1,
        available: 0,
    })?;
    Ok(temperature.iter().map(|t| t - centre).collect())
}

fn recentre(mut residual: Vec<f64>) -> Vec<f64> {
    if let Some(centre) = median(&residual) {
        for r in &mut residual {
            *r -= centre;
        }
    }
    residual
}

fn subtract_prediction(inclination: &[f64], temperature: &[f64], slope: f64, intercept: f64) -> Vec<f64> {
    inclination
        .iter()
        .zip(temperature)
        .map(|(y, t)| y - (slope * t + intercept))
        .collect()
}

/// `linear`: fit through a [`LinearModel`].
pub struct LinearCompensator;

impl DriftCompensator for LinearCompensator {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn needs_temperature(&self) -> bool {
        true
    }

    fn compensate(
        &self,
        inclination: &[f64],
        temperature: Option<&[f64]>,
        _params: &DriftParams,
    ) -> Result<Vec<f64>, ProcessingError> {
        let centred = centred_temperature(inclination, temperature)?;
        let model = LinearModel::fit(&centred, inclination)?;
        tracing::debug!(
            slope = model.slope,
            intercept = model.intercept,
            "Linear drift model fitted"
        );
        Ok(recentre(subtract_prediction(
            inclination,
            &centred,
            model.slope,
            model.intercept,
        )))
    }
}

/// `linear-alt`: fit through [`polyfit_degree1`].
pub struct LinearAltCompensator;

impl DriftCompensator for LinearAltCompensator {
    fn name(&self) -> &'static str {
        "linear-alt"
    }

    fn needs_temperature(&self) -> bool {
        true
    }

    fn compensate(
        &self,
        inclination: &[f64],
        temperature: Option<&[f64]>,
        _params: &DriftParams,
    ) -> Result<Vec<f64>, ProcessingError> {
        let centred = centred_temperature(inclination, temperature)?;
        let [slope, intercept] = polyfit_degree1(&centred, inclination)?;
        tracing::debug!(slope, intercept, "Polynomial drift fit");
        Ok(recentre(subtract_prediction(inclination, &centred, slope, intercept)))
    }
}
