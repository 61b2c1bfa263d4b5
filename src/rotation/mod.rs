//! Axis rotation of the horizontal inclination pair
//!
//! Sensors are rarely mounted with their axes along the dominant sway
//! direction. The rotators turn the `(east_west, north_south)` cloud so the
//! first output channel follows the main sway axis:
//!
//! - **pca**: project the centred cloud onto its principal axes
//! - **regression**: rotate so the OLS line of `y` on `x` becomes the x-axis
//!
//! Both report the rotation actually applied as a [`Rotation`].

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use crate::processing::stats::{finite_pairs, linear_fit};
use crate::processing::{check_lengths, ProcessingError};
use crate::types::Rotation;

/// Rotated channel pair plus the applied angle.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedPair {
    pub first: Vec<f64>,
    pub second: Vec<f64>,
    pub rotation: Rotation,
}

/// Closed set of rotation methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationMethod {
    #[default]
    None,
    #[serde(alias = "pca-rotation")]
    Pca,
    #[serde(alias = "regression-rotation")]
    Regression,
}

impl RotationMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pca => "pca",
            Self::Regression => "regression",
        }
    }

    /// Rotate the pair. `None` hands the channels back untouched with a zero
    /// angle.
    pub fn apply(self, x: &[f64], y: &[f64]) -> Result<RotatedPair, ProcessingError> {
        check_lengths(x, y)?;
        let pair = match self {
            Self::None => RotatedPair {
                first: x.to_vec(),
                second: y.to_vec(),
                rotation: Rotation::from_radians(0.0),
            },
            Self::Pca => pca_rotation(x, y)?,
            Self::Regression => regression_rotation(x, y)?,
        };
        tracing::debug!(
            method = self.name(),
            angle_deg = pair.rotation.angle_deg,
            "Axis rotation applied"
        );
        Ok(pair)
    }
}

impl FromStr for RotationMethod {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "pca" | "pca-rotation" => Ok(Self::Pca),
            "regression" | "regression-rotation" => Ok(Self::Regression),
            other => Err(ProcessingError::UnknownMethod {
                kind: "rotation",
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for RotationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rotate every point counter-clockwise by `angle` radians. NaN propagates.
pub fn rotate(x: &[f64], y: &[f64], angle: f64) -> (Vec<f64>, Vec<f64>) {
    let (sin, cos) = angle.sin_cos();
    x.iter()
        .zip(y)
        .map(|(a, b)| (a * cos - b * sin, a * sin + b * cos))
        .unzip()
}

/// Principal-axis projection of the centred cloud.
///
/// The principal axis sits at `θ = ½·atan2(2·sxy, sxx − syy)`; projecting on
/// it is a rotation by `−θ`, which is what gets reported.
pub fn pca_rotation(x: &[f64], y: &[f64]) -> Result<RotatedPair, ProcessingError> {
    let (xs, ys) = finite_pairs(x, y);
    let n = xs.len();
    if n < 2 {
        return Err(ProcessingError::InsufficientData {
            needed: 2,
            available: n,
        });
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (a, b) in xs.iter().zip(&ys) {
        let (dx, dy) = (a - mx, b - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);

    let centred_x: Vec<f64> = x.iter().map(|a| a - mx).collect();
    let centred_y: Vec<f64> = y.iter().map(|b| b - my).collect();
    let (first, second) = rotate(&centred_x, &centred_y, -theta);

    Ok(RotatedPair {
        first,
        second,
        rotation: Rotation::from_radians(-theta),
    })
}

/// Rotation by `−atan(slope)` of the OLS fit of `y` on `x`.
///
/// A cloud with no spread in `x` is treated as a vertical line.
pub fn regression_rotation(x: &[f64], y: &[f64]) -> Result<RotatedPair, ProcessingError> {
    let (xs, ys) = finite_pairs(x, y);
    if xs.len() < 2 {
        return Err(ProcessingError::InsufficientData {
            needed: 2,
            available: xs.len(),
        });
    }
    let angle = match linear_fit(&xs, &ys) {
        Some((slope, _)) => -slope.atan(),
        None => -FRAC_PI_2,
    };
    let (first, second) = rotate(x, y, angle);
    Ok(RotatedPair {
        first,
        second,
        rotation: Rotation::from_radians(angle),
    })
}
