//! treesway - tree-sway inclination processing and wind alignment
//!
//! Command-line front end over the `treesway` library. Tables are read from
//! and written to CSV (first column timestamp, one column per channel);
//! numeric results are printed as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Drift-compensate a sensor file with the configured method
//! treesway compensate --input tree01.csv --output tree01_corrected.csv
//!
//! # Every drift method side by side, PCA-rotated
//! treesway compensate --input tree01.csv --output all.csv --all-methods --rotation pca
//!
//! # Discover the lag between sway magnitude and wind speed
//! treesway shift --high tree01.csv --high-channel "Inclination magnitude" \
//!     --low wind.csv --low-channel wind_speed
//! ```
//!
//! # Environment Variables
//!
//! - `TREESWAY_CONFIG`: Path to a `treesway.toml` (default: `./treesway.toml`)
//! - `RUST_LOG`: Logging level (default: info)
//!
//! Logs go to stderr so JSON results on stdout can be piped.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use treesway::alignment::{self, BatchItem, NamedSeries};
use treesway::compensation::{compensate_methods, compensate_table};
use treesway::config::SwayConfig;
use treesway::drift::DriftMethod;
use treesway::processing::filter::FilterKind;
use treesway::processing::find_n_peaks;
use treesway::rotation::RotationMethod;
use treesway::similarity;
use treesway::table_io::{read_table, write_table};
use treesway::types::{Table, TimeSeries};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "treesway")]
#[command(about = "Tree-sway inclination processing and wind alignment")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides TREESWAY_CONFIG and ./treesway.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Drift-compensate the inclination channels of a sensor table
    Compensate {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Drift method (original, linear, linear-alt, moving-average, emd)
        #[arg(long)]
        method: Option<DriftMethod>,
        /// Secondary filter (none, low-pass, band-pass)
        #[arg(long)]
        filter: Option<FilterKind>,
        /// Axis rotation (none, pca, regression)
        #[arg(long)]
        rotation: Option<RotationMethod>,
        /// Run every drift method and write all labelled channels
        #[arg(long, conflicts_with = "method")]
        all_methods: bool,
    },

    /// Discover the time shift between a high-rate and a low-rate stream
    Shift {
        #[command(flatten)]
        streams: StreamArgs,
        /// Write the result as JSON to this file instead of stdout
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Median shift over several high/low file pairs sharing channel names
    Batch {
        /// High-rate files, one per item
        #[arg(long, num_args = 1.., required = true)]
        high: Vec<PathBuf>,
        #[arg(long)]
        high_channel: String,
        /// Low-rate files, same order and count as --high
        #[arg(long, num_args = 1.., required = true)]
        low: Vec<PathBuf>,
        #[arg(long)]
        low_channel: String,
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Apply a shift and write the merged envelopes before and after
    Sync {
        #[command(flatten)]
        streams: StreamArgs,
        /// Shift in seconds; discovered when omitted
        #[arg(long, allow_negative_numbers = true)]
        shift: Option<f64>,
        /// Output CSV of the shifted merge
        #[arg(short, long)]
        output: PathBuf,
        /// Optional output CSV of the unshifted merge
        #[arg(long)]
        reference_output: Option<PathBuf>,
    },

    /// Salient peaks of one channel
    Peaks {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        count: Option<usize>,
        /// Minimum separation between peaks in seconds
        #[arg(long)]
        min_time_diff: Option<f64>,
        #[arg(long)]
        prominence: Option<f64>,
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Pairwise event similarity between sensors
    Compare {
        /// Sensor tables to compare (at least two)
        #[arg(num_args = 2.., required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        channel: String,
        /// Sample rate in Hz (default: from the first table's median spacing)
        #[arg(long)]
        sample_rate: Option<f64>,
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct StreamArgs {
    /// High-rate table (e.g. inclination)
    #[arg(long)]
    high: PathBuf,
    #[arg(long)]
    high_channel: String,
    /// Low-rate table (e.g. wind station)
    #[arg(long)]
    low: PathBuf,
    #[arg(long)]
    low_channel: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<SwayConfig> {
    match path {
        Some(p) => SwayConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(SwayConfig::load()),
    }
}

fn load_table(path: &Path) -> Result<Table> {
    read_table(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_series(path: &Path, channel: &str) -> Result<TimeSeries> {
    load_table(path)?
        .series(channel)
        .with_context(|| format!("{}: channel '{}'", path.display(), channel))
}

fn save_table(table: &Table, path: &Path) -> Result<()> {
    write_table(table, path).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), rows = table.len(), "Table written");
    Ok(())
}

fn emit_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(p) => {
            std::fs::write(p, json).with_context(|| format!("Failed to write {}", p.display()))?;
            info!(path = %p.display(), "Result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn file_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Subcommands
// ============================================================================

fn run_compensate(
    config: &mut SwayConfig,
    input: &Path,
    output: &Path,
    method: Option<DriftMethod>,
    filter: Option<FilterKind>,
    rotation: Option<RotationMethod>,
    all_methods: bool,
) -> Result<()> {
    if let Some(m) = method {
        config.drift.method = m;
    }
    if let Some(f) = filter {
        config.drift.filter = f;
    }
    if let Some(r) = rotation {
        config.drift.rotation = r;
    }
    config.validate()?;

    let table = load_table(input)?;
    let plan = config.compensation_plan();
    let result = if all_methods {
        compensate_methods(&table, &DriftMethod::ALL, &plan)?
    } else {
        let compensated = compensate_table(&table, &plan)?;
        if let Some(r) = compensated.rotation {
            info!(angle_deg = r.angle_deg, "Rotation angle");
        }
        compensated.table
    };
    save_table(&result, output)
}

fn run_shift(config: &SwayConfig, streams: &StreamArgs, json: Option<&Path>) -> Result<()> {
    let high = load_series(&streams.high, &streams.high_channel)?;
    let low = load_series(&streams.low, &streams.low_channel)?;
    let result = alignment::discover_shift(
        NamedSeries::new(&streams.high_channel, &high),
        NamedSeries::new(&streams.low_channel, &low),
        &config.alignment,
    )?;
    match result {
        Some(r) => emit_json(&r, json),
        None => bail!("No shift could be computed for the given streams"),
    }
}

fn run_batch(
    config: &SwayConfig,
    high: &[PathBuf],
    high_channel: &str,
    low: &[PathBuf],
    low_channel: &str,
    json: Option<&Path>,
) -> Result<()> {
    if high.len() != low.len() {
        bail!("--high and --low need the same number of files ({} vs {})", high.len(), low.len());
    }

    let mut loaded = Vec::with_capacity(high.len());
    for (h, l) in high.iter().zip(low) {
        loaded.push((file_id(h), load_series(h, high_channel)?, load_series(l, low_channel)?));
    }
    let items: Vec<BatchItem<'_>> = loaded
        .iter()
        .map(|(id, h, l)| BatchItem {
            id,
            high: NamedSeries::new(high_channel, h),
            low: NamedSeries::new(low_channel, l),
        })
        .collect();

    let batch = alignment::batch_median_shift(&items, &config.alignment)?;
    emit_json(&batch, json)
}

fn run_sync(
    config: &SwayConfig,
    streams: &StreamArgs,
    shift: Option<f64>,
    output: &Path,
    reference_output: Option<&Path>,
) -> Result<()> {
    let high_series = load_series(&streams.high, &streams.high_channel)?;
    let low_series = load_series(&streams.low, &streams.low_channel)?;
    let high = NamedSeries::new(&streams.high_channel, &high_series);
    let low = NamedSeries::new(&streams.low_channel, &low_series);

    let shift_seconds = match shift {
        Some(s) => s,
        None => match alignment::discover_shift(high, low, &config.alignment)? {
            Some(r) => r.shift_seconds,
            None => bail!("No shift could be computed; pass --shift explicitly"),
        },
    };

    let sync = alignment::synchronize(high, low, shift_seconds, &config.alignment)?;
    info!(
        shift_seconds,
        reference_correlation = sync.reference_correlation,
        shifted_correlation = sync.shifted_correlation,
        "Synchronization summary"
    );
    save_table(&sync.shifted, output)?;
    if let Some(path) = reference_output {
        save_table(&sync.reference, path)?;
    }
    Ok(())
}

fn run_peaks(
    config: &SwayConfig,
    input: &Path,
    channel: &str,
    count: Option<usize>,
    min_time_diff: Option<f64>,
    prominence: Option<f64>,
    json: Option<&Path>,
) -> Result<()> {
    let series = load_series(input, channel)?;
    let peaks = find_n_peaks(
        &series,
        count.unwrap_or(config.peaks.count),
        config.sensor.sample_rate_hz,
        min_time_diff.unwrap_or(config.peaks.min_time_diff_secs),
        prominence.or(config.peaks.prominence),
    )?;
    info!(channel, found = peaks.len(), "Peaks extracted");
    emit_json(&peaks, json)
}

fn run_compare(
    config: &SwayConfig,
    inputs: &[PathBuf],
    channel: &str,
    sample_rate: Option<f64>,
    json: Option<&Path>,
) -> Result<()> {
    let mut loaded = Vec::with_capacity(inputs.len());
    for path in inputs {
        loaded.push((file_id(path), load_series(path, channel)?));
    }
    let sample_rate = sample_rate
        .or_else(|| {
            loaded
                .first()
                .and_then(|(_, s)| s.median_interval_secs())
                .filter(|dt| *dt > 0.0)
                .map(|dt| 1.0 / dt)
        })
        .unwrap_or(config.sensor.sample_rate_hz);
    let streams: Vec<NamedSeries<'_>> = loaded
        .iter()
        .map(|(id, s)| NamedSeries::new(id, s))
        .collect();

    let results = similarity::compare_all(&streams, sample_rate, &config.similarity)?;
    info!(streams = streams.len(), sample_rate, results = results.len(), "Comparison complete");
    emit_json(&results, json)
}

fn run_config(config: &SwayConfig, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => config.save_to_file(path)?,
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

// ============================================================================
// Entry Point
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);
    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        SubCommand::Compensate {
            input,
            output,
            method,
            filter,
            rotation,
            all_methods,
        } => run_compensate(&mut config, &input, &output, method, filter, rotation, all_methods),
        SubCommand::Shift { streams, json } => run_shift(&config, &streams, json.as_deref()),
        SubCommand::Batch {
            high,
            high_channel,
            low,
            low_channel,
            json,
        } => run_batch(&config, &high, &high_channel, &low, &low_channel, json.as_deref()),
        SubCommand::Sync {
            streams,
            shift,
            output,
            reference_output,
        } => run_sync(&config, &streams, shift, &output, reference_output.as_deref()),
        SubCommand::Peaks {
            input,
            channel,
            count,
            min_time_diff,
            prominence,
            json,
        } => run_peaks(&config, &input, &channel, count, min_time_diff, prominence, json.as_deref()),
        SubCommand::Compare {
            inputs,
            channel,
            sample_rate,
            json,
        } => run_compare(&config, &inputs, &channel, sample_rate, json.as_deref()),
        SubCommand::Config { output } => run_config(&config, output.as_deref()),
    }
}
