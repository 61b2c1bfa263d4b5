//! Pipeline Regression Tests
//!
//! Exercises the compensation pipeline end to end: inclination math, drift
//! methods, rotation, peak extraction and the CSV boundary. Synthetic data
//! comes from a seeded `StdRng` so every run sees the same numbers.

use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use treesway::compensation::{compensate_methods, compensate_table, CompensationPlan};
use treesway::drift::{DriftMethod, DriftParams};
use treesway::processing::inclination::{direction, direction_deg, magnitude};
use treesway::processing::{find_max_peak, find_n_peaks, ProcessingError};
use treesway::rotation::RotationMethod;
use treesway::table_io::{read_table, write_table};
use treesway::types::{channels, Table, TimeSeries};

/// Ten minutes of 20 Hz sway with a temperature-driven offset on both axes.
fn drifting_sensor(seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::<f64>::new(0.0, 0.01).unwrap();
    let n = 12_000;
    let fs = 20.0;

    let index: Vec<i64> = (0..n as i64).map(|i| 1_700_000_000_000 + i * 50).collect();
    let temperature: Vec<f64> = (0..n)
        .map(|i| 10.0 + 4.0 * (i as f64 / n as f64 * std::f64::consts::PI).sin())
        .collect();
    let sway: Vec<f64> = (0..n)
        .map(|i| 0.3 * (2.0 * std::f64::consts::PI * 0.4 * i as f64 / fs).sin())
        .collect();
    let east_west: Vec<f64> = (0..n)
        .map(|i| 0.5 + sway[i] + 0.2 * temperature[i] + noise.sample(&mut rng))
        .collect();
    let north_south: Vec<f64> = (0..n)
        .map(|i| -0.2 + 0.5 * sway[i] - 0.15 * temperature[i] + noise.sample(&mut rng))
        .collect();

    Table::new(index)
        .unwrap()
        .with_channel(channels::EAST_WEST, east_west)
        .unwrap()
        .with_channel(channels::NORTH_SOUTH, north_south)
        .unwrap()
        .with_channel(channels::TEMPERATURE, temperature)
        .unwrap()
}

fn correlation(a: &[f64], b: &[f64]) -> f64 {
    treesway::processing::stats::pearson(a, b).unwrap()
}

// ============================================================================
// Inclination Math
// ============================================================================

#[test]
fn magnitude_and_direction_hold_over_a_grid() {
    let mut rng = StdRng::seed_from_u64(11);
    let xs: Vec<f64> = (0..500).map(|_| rng.gen_range(-5.0..5.0)).collect();
    let ys: Vec<f64> = (0..500).map(|_| rng.gen_range(-5.0..5.0)).collect();

    let mags = magnitude(&xs, &ys).unwrap();
    let dirs = direction(&xs, &ys).unwrap();
    for i in 0..xs.len() {
        assert!((mags[i] - xs[i].hypot(ys[i])).abs() < 1e-12);
        assert!(mags[i] >= 0.0);
        assert!((0.0..360.0).contains(&dirs[i]), "direction {} out of range", dirs[i]);
    }
}

#[test]
fn canonical_axis_mapping() {
    let cases = [((1.0, 0.0), 0.0), ((0.0, 1.0), 90.0), ((-1.0, 0.0), 180.0), ((0.0, -1.0), 270.0)];
    for ((x, y), expected) in cases {
        let d = direction_deg(x, y);
        assert!((d - expected).abs() < 1e-9, "direction({x}, {y}) = {d}");
    }
}

#[test]
fn diagonal_scenario_through_the_pipeline() {
    let table = Table::new(vec![0, 1_000, 2_000, 3_000])
        .unwrap()
        .with_channel(channels::EAST_WEST, vec![-1.0, 1.0, -1.0, 1.0])
        .unwrap()
        .with_channel(channels::NORTH_SOUTH, vec![1.0, -1.0, -1.0, 1.0])
        .unwrap();
    let plan = CompensationPlan::new(DriftMethod::Original, DriftParams::default());
    let out = compensate_table(&table, &plan).unwrap();

    let dirs = out
        .table
        .get(&channels::labelled(channels::DIRECTION, "original"))
        .unwrap();
    let expected = [135.0, 315.0, 225.0, 45.0];
    for (d, e) in dirs.iter().zip(expected) {
        assert!((d - e).abs() < 1e-9, "got {d}, expected {e}");
    }
    let mags = out
        .table
        .get(&channels::labelled(channels::MAGNITUDE, "original"))
        .unwrap();
    assert!(mags.iter().all(|m| (m - 2f64.sqrt()).abs() < 1e-12));
}

// ============================================================================
// Drift Compensation
// ============================================================================

#[test]
fn original_method_is_identity() {
    let table = drifting_sensor(1);
    let ew = table.get(channels::EAST_WEST).unwrap();
    let out = DriftMethod::Original
        .compensate(ew, None, &DriftParams::default())
        .unwrap();
    assert_eq!(out, ew);
}

#[test]
fn linear_method_removes_temperature_dependence() {
    let table = drifting_sensor(2);
    let temperature = table.get(channels::TEMPERATURE).unwrap();
    let raw = table.get(channels::EAST_WEST).unwrap();
    assert!(correlation(raw, temperature) > 0.5);

    for method in [DriftMethod::Linear, DriftMethod::LinearAlt] {
        let corrected = method
            .compensate(raw, Some(temperature), &DriftParams::default())
            .unwrap();
        assert!(
            correlation(&corrected, temperature).abs() < 0.05,
            "{method} left temperature correlation"
        );
    }
}

#[test]
fn unknown_method_names_are_rejected() {
    let err = "polynomial".parse::<DriftMethod>().unwrap_err();
    assert!(matches!(err, ProcessingError::UnknownMethod { kind: "drift", .. }));
    assert!("spin".parse::<RotationMethod>().is_err());
    assert_eq!("pca-rotation".parse::<RotationMethod>().unwrap(), RotationMethod::Pca);
}

#[test]
fn every_method_side_by_side() {
    let table = drifting_sensor(3);
    let params = DriftParams {
        moving_average_window: 200,
        ..DriftParams::default()
    };
    let plan = CompensationPlan::new(DriftMethod::Original, params);
    let out = compensate_methods(&table, &DriftMethod::ALL, &plan).unwrap();

    assert_eq!(out.len(), table.len());
    for method in DriftMethod::ALL {
        for channel in [
            channels::EAST_WEST,
            channels::NORTH_SOUTH,
            channels::MAGNITUDE,
            channels::DIRECTION,
        ] {
            let name = channels::labelled(channel, method.name());
            assert!(out.contains(&name), "missing {name}");
        }
    }
}

#[test]
fn rotation_aligns_main_sway_axis() {
    let table = drifting_sensor(4);
    let plan = CompensationPlan::new(DriftMethod::Linear, DriftParams::default())
        .with_rotation(RotationMethod::Pca);
    let out = compensate_table(&table, &plan).unwrap();
    assert_eq!(out.label, "linear+pca");

    let first = out
        .table
        .get(&channels::labelled(channels::EAST_WEST, "linear+pca"))
        .unwrap();
    let second = out
        .table
        .get(&channels::labelled(channels::NORTH_SOUTH, "linear+pca"))
        .unwrap();
    let var = |v: &[f64]| {
        let m = v.iter().sum::<f64>() / v.len() as f64;
        v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / v.len() as f64
    };
    // Sway runs along (1, 0.5); after rotation nearly all variance sits on one axis
    assert!(var(first) > 20.0 * var(second));
    assert!(out.rotation.is_some());
}

// ============================================================================
// Peaks
// ============================================================================

#[test]
fn max_peak_of_ramp() {
    let series = TimeSeries::new(vec![10, 20, 30], vec![1.0, 2.0, 3.0]).unwrap();
    let peak = find_max_peak(&series).unwrap();
    assert_eq!(peak.timestamp, 30);
    assert_eq!(peak.value, 3.0);
}

#[test]
fn n_peaks_are_sorted_and_separated() {
    let mut rng = StdRng::seed_from_u64(21);
    let noise = Normal::<f64>::new(0.0, 0.3).unwrap();
    let fs = 20.0;
    let values: Vec<f64> = (0..20 * 600)
        .map(|i| (i as f64 / fs / 7.0).sin() + noise.sample(&mut rng))
        .collect();
    let series = TimeSeries::regular(0, fs, values).unwrap();

    let min_time_diff = 30.0;
    let peaks = find_n_peaks(&series, 8, fs, min_time_diff, None).unwrap();
    assert!(!peaks.is_empty());
    assert!(peaks.len() <= 8);
    for pair in peaks.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
        assert!((pair[1].timestamp - pair[0].timestamp) as f64 >= min_time_diff * 1_000.0);
    }
}

// ============================================================================
// CSV Boundary
// ============================================================================

#[test]
fn compensated_table_survives_csv() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = dir.path().join("raw.csv");
    let out_path = dir.path().join("corrected.csv");

    let table = drifting_sensor(5).slice_time(1_700_000_000_000, 1_700_000_060_000);
    write_table(&table, &raw_path).unwrap();

    let loaded = read_table(&raw_path).unwrap();
    assert_eq!(loaded.index(), table.index());

    let plan = CompensationPlan::new(DriftMethod::Linear, DriftParams::default());
    let out = compensate_table(&loaded, &plan).unwrap();
    write_table(&out.table, &out_path).unwrap();

    let reread = read_table(&out_path).unwrap();
    let name = channels::labelled(channels::DIRECTION, "linear");
    let a = out.table.get(&name).unwrap();
    let b = reread.get(&name).unwrap();
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-9);
    }
}
