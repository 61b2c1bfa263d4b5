//! Config Validation Tests
//!
//! Typo detection, range validation and file loading for `treesway.toml`,
//! exercised through the public config API.

use std::io::Write;

use treesway::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use treesway::config::{ConfigError, SwayConfig, CONFIG_ENV_VAR};
use treesway::drift::DriftMethod;
use treesway::rotation::RotationMethod;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_drift_key_warns_with_suggestion() {
    let toml_str = r#"
[drift]
moving_averge_window = 500
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "drift.moving_averge_window");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("drift.moving_average_window"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn misspelled_section_is_suggested() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("alignmnt", &known).as_deref(), Some("alignment"));
    assert_eq!(suggest_correction("completely_unrelated_key", &known), None);
}

#[test]
fn typo_does_not_break_loading() {
    let file = write_config(
        r#"
[peaks]
cont = 3
min_time_diff_secs = 90.0
"#,
    );
    let config = SwayConfig::load_from_file(file.path()).unwrap();
    // The misspelled key is ignored, the valid one applies
    assert_eq!(config.peaks.count, SwayConfig::default().peaks.count);
    assert_eq!(config.peaks.min_time_diff_secs, 90.0);
}

#[test]
fn every_default_key_is_known() {
    let text = SwayConfig::default().to_toml().unwrap();
    assert!(validate_unknown_keys(&text).is_empty());
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn out_of_range_values_are_all_reported() {
    let mut config = SwayConfig::default();
    config.drift.lowpass_window = 0;
    config.alignment.downsample_secs = -60.0;
    config.alignment.batch_min_correlation = 1.5;
    config.similarity.event_window_secs = 0.0;

    let (errors, _) = validate_ranges(&config);
    assert_eq!(errors.len(), 4, "{errors:?}");
    for key in [
        "drift.lowpass_window",
        "alignment.downsample_secs",
        "alignment.batch_min_correlation",
        "similarity.event_window_secs",
    ] {
        assert!(errors.iter().any(|e| e.contains(key)), "no error for {key}");
    }
}

#[test]
fn negative_batch_threshold_is_legal() {
    let mut config = SwayConfig::default();
    config.alignment.batch_min_correlation = -0.2;
    assert!(config.validate().is_ok());
}

#[test]
fn quantile_bounds_are_inclusive() {
    for quantile in [0.0, 1.0] {
        let mut config = SwayConfig::default();
        config.similarity.quantile = quantile;
        assert!(config.validate().is_ok(), "quantile {quantile} rejected");
    }
}

#[test]
fn shift_window_below_one_bin_warns() {
    let mut config = SwayConfig::default();
    config.alignment.max_shift_secs = 30.0;
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "alignment.max_shift_secs"));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn file_values_override_defaults() {
    let file = write_config(
        r#"
[sensor]
sample_rate_hz = 10.0

[drift]
method = "moving-average"
rotation = "regression-rotation"

[similarity]
quantile = 0.9
"#,
    );
    let config = SwayConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.sensor.sample_rate_hz, 10.0);
    assert_eq!(config.drift.method, DriftMethod::MovingAverage);
    assert_eq!(config.drift.rotation, RotationMethod::Regression);
    assert_eq!(config.similarity.quantile, 0.9);
    assert_eq!(config.alignment, SwayConfig::default().alignment);
}

#[test]
fn invalid_file_reports_path_and_problems() {
    let file = write_config("[similarity]\nquantile = 1.5\n");
    match SwayConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("similarity.quantile"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let file = write_config("[drift]\nmethod = \"spline\"\n");
    match SwayConfig::load_from_file(file.path()) {
        Err(err @ ConfigError::Parse(..)) => {
            assert!(err.to_string().contains(&file.path().display().to_string()));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn saved_config_loads_back_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("treesway.toml");

    let mut config = SwayConfig::default();
    config.drift.method = DriftMethod::Emd;
    config.peaks.prominence = Some(0.25);
    config.alignment.max_shift_secs = 7_200.0;
    config.save_to_file(&path).unwrap();

    assert_eq!(SwayConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn env_var_selects_config_file() {
    let file = write_config("[alignment]\ndownsample_secs = 30.0\n");
    std::env::set_var(CONFIG_ENV_VAR, file.path());
    let config = SwayConfig::load();
    std::env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(config.alignment.downsample_secs, 30.0);
}
