//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Unknown keys never break a config.

use std::collections::HashSet;

use super::SwayConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of [`SwayConfig`].
///
/// Maintained by hand alongside sway_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [sensor]
        "sensor",
        "sensor.sample_rate_hz",
        // [drift]
        "drift",
        "drift.method",
        "drift.moving_average_window",
        "drift.emd_freq_low_hz",
        "drift.emd_freq_high_hz",
        "drift.emd_max_imfs",
        "drift.emd_max_sift_iterations",
        "drift.emd_sd_threshold",
        "drift.filter",
        "drift.lowpass_window",
        "drift.band_low_hz",
        "drift.band_high_hz",
        "drift.rotation",
        // [peaks]
        "peaks",
        "peaks.count",
        "peaks.min_time_diff_secs",
        "peaks.prominence",
        // [alignment]
        "alignment",
        "alignment.max_shift_secs",
        "alignment.downsample_secs",
        "alignment.rolling_max_window_secs",
        "alignment.merge_tolerance_secs",
        "alignment.batch_min_correlation",
        // [similarity]
        "similarity",
        "similarity.max_lag_secs",
        "similarity.quantile",
        "similarity.event_window_secs",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3. Ties resolve alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

fn require_positive(value: f64, key: &str, errors: &mut Vec<String>) -> bool {
    if value.is_finite() && value > 0.0 {
        true
    } else {
        errors.push(format!("{key} = {value} must be a finite value > 0"));
        false
    }
}

fn require_nonzero(value: usize, key: &str, errors: &mut Vec<String>) {
    if value == 0 {
        errors.push(format!("{key} must be at least 1"));
    }
}

fn require_band(low: f64, high: f64, key: &str, errors: &mut Vec<String>) {
    if !(low.is_finite() && high.is_finite() && low >= 0.0 && high > low) {
        errors.push(format!(
            "{key}: band [{low}, {high}] must satisfy 0 <= low < high"
        ));
    }
}

/// Check value ranges on a parsed config.
///
/// Returns (errors, warnings). Errors are values no component can run
/// with; warnings are legal but likely mistakes.
pub fn validate_ranges(config: &SwayConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let rate_ok = require_positive(config.sensor.sample_rate_hz, "sensor.sample_rate_hz", &mut errors);

    // Drift
    let d = &config.drift;
    require_nonzero(d.moving_average_window, "drift.moving_average_window", &mut errors);
    require_nonzero(d.emd_max_imfs, "drift.emd_max_imfs", &mut errors);
    require_nonzero(d.emd_max_sift_iterations, "drift.emd_max_sift_iterations", &mut errors);
    require_positive(d.emd_sd_threshold, "drift.emd_sd_threshold", &mut errors);
    require_band(d.emd_freq_low_hz, d.emd_freq_high_hz, "drift.emd_freq", &mut errors);
    require_nonzero(d.lowpass_window, "drift.lowpass_window", &mut errors);
    require_band(d.band_low_hz, d.band_high_hz, "drift.band", &mut errors);

    if rate_ok {
        let nyquist = config.sensor.sample_rate_hz / 2.0;
        for (key, value) in [
            ("drift.emd_freq_high_hz", d.emd_freq_high_hz),
            ("drift.band_high_hz", d.band_high_hz),
        ] {
            if value > nyquist {
                warnings.push(ValidationWarning {
                    field: key.to_string(),
                    message: format!("{key} = {value} is above the Nyquist frequency ({nyquist} Hz)"),
                    suggestion: None,
                });
            }
        }
    }

    // Peaks
    let p = &config.peaks;
    require_nonzero(p.count, "peaks.count", &mut errors);
    require_positive(p.min_time_diff_secs, "peaks.min_time_diff_secs", &mut errors);
    if let Some(prominence) = p.prominence {
        if !(prominence.is_finite() && prominence >= 0.0) {
            errors.push(format!("peaks.prominence = {prominence} must be >= 0"));
        }
    }

    // Alignment
    let a = &config.alignment;
    if !(a.max_shift_secs.is_finite() && a.max_shift_secs >= 0.0) {
        errors.push(format!("alignment.max_shift_secs = {} must be >= 0", a.max_shift_secs));
    }
    let cadence_ok = require_positive(a.downsample_secs, "alignment.downsample_secs", &mut errors);
    require_positive(a.rolling_max_window_secs, "alignment.rolling_max_window_secs", &mut errors);
    if !(a.merge_tolerance_secs.is_finite() && a.merge_tolerance_secs >= 0.0) {
        errors.push(format!(
            "alignment.merge_tolerance_secs = {} must be >= 0",
            a.merge_tolerance_secs
        ));
    }
    if !(-1.0..=1.0).contains(&a.batch_min_correlation) {
        errors.push(format!(
            "alignment.batch_min_correlation = {} must lie in [-1, 1]",
            a.batch_min_correlation
        ));
    }
    if cadence_ok && a.max_shift_secs < a.downsample_secs {
        warnings.push(ValidationWarning {
            field: "alignment.max_shift_secs".to_string(),
            message: format!(
                "alignment.max_shift_secs = {} is shorter than one bin ({} s); only zero shift is searched",
                a.max_shift_secs, a.downsample_secs
            ),
            suggestion: None,
        });
    }

    // Similarity
    let s = &config.similarity;
    if !(s.max_lag_secs.is_finite() && s.max_lag_secs >= 0.0) {
        errors.push(format!("similarity.max_lag_secs = {} must be >= 0", s.max_lag_secs));
    }
    if !(0.0..=1.0).contains(&s.quantile) {
        errors.push(format!("similarity.quantile = {} must lie in [0, 1]", s.quantile));
    }
    require_positive(s.event_window_secs, "similarity.event_window_secs", &mut errors);

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("quantile", "quantile"), 0);
        assert_eq!(levenshtein("quantle", "quantile"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let value: toml::Value = "[drift]\nmethod = \"emd\"\n".parse().unwrap();
        let keys = walk_toml_keys(&value, "");
        assert_eq!(keys, vec!["drift".to_string(), "drift.method".to_string()]);
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys("[similarity]\nquantil = 0.9\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "similarity.quantil");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("similarity.quantile"));
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[sensor]
sample_rate_hz = 20.0

[drift]
method = "linear"
rotation = "pca"

[alignment]
downsample_secs = 60.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_unknown_section_has_no_suggestion() {
        let warnings = validate_unknown_keys("[telemetry_exporter]\nendpoint = \"x\"\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }

    #[test]
    fn test_defaults_are_clean() {
        let (errors, warnings) = validate_ranges(&SwayConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_inverted_band_is_error() {
        let mut config = SwayConfig::default();
        config.drift.emd_freq_low_hz = 3.0;
        config.drift.emd_freq_high_hz = 1.0;
        let (errors, _) = validate_ranges(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("drift.emd_freq"));
    }

    #[test]
    fn test_band_above_nyquist_warns() {
        let mut config = SwayConfig::default();
        config.sensor.sample_rate_hz = 2.0;
        let (errors, warnings) = validate_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "drift.emd_freq_high_hz"));
    }

    #[test]
    fn test_zero_windows_rejected() {
        let mut config = SwayConfig::default();
        config.drift.moving_average_window = 0;
        config.peaks.count = 0;
        config.alignment.downsample_secs = -60.0;
        let (errors, _) = validate_ranges(&config);
        assert_eq!(errors.len(), 3, "{errors:?}");
    }
}
