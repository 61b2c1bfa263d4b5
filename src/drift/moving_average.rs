//! Moving-average drift removal.

use super::{DriftCompensator, DriftParams};
use crate::processing::{rolling, ProcessingError};

/// `moving-average`: subtract a centred rolling mean of
/// `moving_average_window` samples. Edges use the shrunken window and the
/// result is not re-centred.
pub struct MovingAverageCompensator;

impl DriftCompensator for MovingAverageCompensator {
    fn name(&self) -> &'static str {
        "moving-average"
    }

    fn compensate(
        &self,
        inclination: &[f64],
        _temperature: Option<&[f64]>,
        params: &DriftParams,
    ) -> Result<Vec<f64>, ProcessingError> {
        let trend = rolling::rolling_mean(inclination, params.moving_average_window)?;
        Ok(inclination
            .iter()
            .zip(&trend)
            .map(|(v, t)| v - t)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::DriftMethod;

    #[test]
    fn test_removes_slow_ramp() {
        let values: Vec<f64> = (0..400)
            .map(|i| 0.01 * i as f64 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let params = DriftParams {
            moving_average_window: 20,
            ..DriftParams::default()
        };
        let out = DriftMethod::MovingAverage
            .compensate(&values, None, &params)
            .unwrap();
        // Interior: ramp cancels, alternating component survives
        for v in &out[20..380] {
            assert!((v.abs() - 0.5).abs() < 0.02, "got {v}");
        }
    }

    #[test]
    fn test_zero_window_rejected() {
        let params = DriftParams {
            moving_average_window: 0,
            ..DriftParams::default()
        };
        assert!(DriftMethod::MovingAverage
            .compensate(&[1.0, 2.0], None, &params)
            .is_err());
    }

    #[test]
    fn test_constant_channel_goes_to_zero() {
        let out = DriftMethod::MovingAverage
            .compensate(&[4.0; 50], None, &DriftParams::default())
            .unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-12));
    }
}
