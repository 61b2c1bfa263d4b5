//! Inclination magnitude and compass direction from two orthogonal channels.
//!
//! Direction convention: `atan2(north_south, east_west)` in degrees, folded
//! into `[0, 360)`. East is 0°, north is 90°, west is 180°, south is 270°.

use super::{check_lengths, ProcessingError};
use crate::types::{channels, Table};

/// Elementwise `sqrt(x² + y²)`.
pub fn magnitude(east_west: &[f64], north_south: &[f64]) -> Result<Vec<f64>, ProcessingError> {
    check_lengths(east_west, north_south)?;
    Ok(east_west
        .iter()
        .zip(north_south)
        .map(|(x, y)| x.hypot(*y))
        .collect())
}

/// Elementwise direction in degrees, `0 <= d < 360`.
pub fn direction(east_west: &[f64], north_south: &[f64]) -> Result<Vec<f64>, ProcessingError> {
    check_lengths(east_west, north_south)?;
    Ok(east_west
        .iter()
        .zip(north_south)
        .map(|(x, y)| direction_deg(*x, *y))
        .collect())
}

/// Direction of a single sample.
pub fn direction_deg(east_west: f64, north_south: f64) -> f64 {
    let deg = north_south.atan2(east_west).to_degrees();
    let deg = if deg < 0.0 { deg + 360.0 } else { deg };
    // -1e-15 + 360 rounds to 360
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

/// Table with magnitude and direction derived from an inclination pair.
///
/// Reads `East-West inclination` and `North-South inclination` (with
/// `suffix` appended when given) and writes the two derived channels under
/// the same suffix.
pub fn with_derived_channels(table: &Table, suffix: Option<&str>) -> Result<Table, ProcessingError> {
    let name = |channel: &str| match suffix {
        Some(method) => channels::labelled(channel, method),
        None => channel.to_string(),
    };
    let east_west = table.require(&name(channels::EAST_WEST))?;
    let north_south = table.require(&name(channels::NORTH_SOUTH))?;
    let magnitude = magnitude(east_west, north_south)?;
    let direction = direction(east_west, north_south)?;
    table
        .clone()
        .with_channel(name(channels::MAGNITUDE), magnitude)?
        .with_channel(name(channels::DIRECTION), direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_magnitude_pythagoras() {
        let m = magnitude(&[3.0, -3.0, 0.0], &[4.0, -4.0, 0.0]).unwrap();
        assert_eq!(m, vec![5.0, 5.0, 0.0]);
    }

    #[test]
    fn test_magnitude_length_mismatch() {
        let err = magnitude(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, ProcessingError::LengthMismatch { left: 2, right: 1 });
        assert!(direction(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_canonical_axis_mapping() {
        assert!(approx(direction_deg(1.0, 0.0), 0.0));
        assert!(approx(direction_deg(0.0, 1.0), 90.0));
        assert!(approx(direction_deg(-1.0, 0.0), 180.0));
        assert!(approx(direction_deg(0.0, -1.0), 270.0));
    }

    #[test]
    fn test_diagonal_scenario() {
        let d = direction(&[-1.0, 1.0, -1.0, 1.0], &[1.0, -1.0, -1.0, 1.0]).unwrap();
        let expected = [135.0, 315.0, 225.0, 45.0];
        for (got, want) in d.iter().zip(expected) {
            assert!(approx(*got, want), "got {got}, want {want}");
        }
    }

    #[test]
    fn test_direction_range_holds() {
        for i in 0..720 {
            let a = (i as f64 * 0.5).to_radians();
            for r in [1e-12, 0.3, 1.0, 250.0] {
                let d = direction_deg(r * a.cos(), r * a.sin());
                assert!((0.0..360.0).contains(&d), "direction {d} out of range");
            }
        }
        assert!((0.0..360.0).contains(&direction_deg(1.0, -1e-300)));
        assert!((0.0..360.0).contains(&direction_deg(0.0, -0.0)));
    }

    #[test]
    fn test_table_helper_adds_labelled_channels() {
        let table = Table::new(vec![0, 1_000])
            .unwrap()
            .with_channel(channels::labelled(channels::EAST_WEST, "linear"), vec![3.0, 0.0])
            .unwrap()
            .with_channel(channels::labelled(channels::NORTH_SOUTH, "linear"), vec![4.0, -2.0])
            .unwrap();
        let out = with_derived_channels(&table, Some("linear")).unwrap();
        assert_eq!(out.get("Inclination magnitude - linear").unwrap(), &[5.0, 2.0]);
        let direction = out.get("Inclination direction - linear").unwrap();
        assert!(approx(direction[1], 270.0));
        assert!(with_derived_channels(&table, None).is_err());
    }
}
