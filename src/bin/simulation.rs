//! Tree-Sway Simulation
//!
//! Generates synthetic inclinometer and wind-station tables for exercising
//! treesway end to end:
//! - `sway_NN.csv`: 20 Hz East-West/North-South inclination plus temperature,
//!   with a thermal drift on both axes and a lean offset per tree
//! - `wind.csv`: 10-minute wind speed and direction
//!
//! The trees respond to the wind `--lag-secs` after the station records it,
//! so `treesway shift` against the wind file should report about `+lag`.
//!
//! # Usage
//! ```bash
//! ./simulation --hours 6 --trees 2 --seed 7 --output-dir demo
//! treesway compensate -i demo/sway_01.csv -o demo/sway_01_linear.csv --method linear
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use tracing::info;

use treesway::table_io::write_table;
use treesway::types::{channels, Table, Timestamp};

// ============================================================================
// Model Constants
// ============================================================================

/// 2024-05-01T00:00:00Z
const START_MS: Timestamp = 1_714_521_600_000;
/// Wind station reporting interval (s)
const WIND_INTERVAL_SECS: f64 = 600.0;
/// Long-run mean wind speed (m/s)
const MEAN_WIND: f64 = 5.0;
/// AR(1) persistence of the wind speed between reports
const WIND_PERSISTENCE: f64 = 0.8;
/// Inclination per (m/s)^2 of wind (degrees)
const SWAY_GAIN: f64 = 0.004;
/// Mean air temperature (°C) and daily half-range
const MEAN_TEMP: f64 = 12.0;
const DAILY_TEMP_SWING: f64 = 6.0;
/// Apparent inclination per °C (degrees)
const THERMAL_COEFF_EW: f64 = 0.03;
const THERMAL_COEFF_NS: f64 = -0.02;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "treesway-simulation")]
#[command(about = "Synthetic tree-sway and wind data for treesway")]
#[command(version = "1.0")]
struct Args {
    /// Duration in hours (1-48)
    #[arg(short = 'H', long, default_value = "6", value_parser = clap::value_parser!(u32).range(1..=48))]
    hours: u32,

    /// Number of instrumented trees
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=16))]
    trees: u32,

    /// Inclinometer sample rate in Hz
    #[arg(long, default_value = "20")]
    sample_rate: u32,

    /// Delay between the wind record and the tree response (s)
    #[arg(long, default_value = "1200")]
    lag_secs: u32,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Directory receiving the CSV files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

// ============================================================================
// Wind
// ============================================================================

/// Wind reports on a fixed grid, with linear interpolation in between.
struct WindRecord {
    start_ms: Timestamp,
    speed: Vec<f64>,
    direction_deg: Vec<f64>,
}

impl WindRecord {
    /// AR(1) speed around [`MEAN_WIND`] and a random-walk direction.
    fn generate(rng: &mut StdRng, start_ms: Timestamp, reports: usize) -> Result<Self> {
        let speed_noise = Normal::<f64>::new(0.0, 1.2)?;
        let dir_noise = Normal::<f64>::new(0.0, 8.0)?;

        let mut speed = Vec::with_capacity(reports);
        let mut direction_deg = Vec::with_capacity(reports);
        let mut s = MEAN_WIND;
        let mut d: f64 = rng.gen_range(0.0..360.0);
        for _ in 0..reports {
            s = (MEAN_WIND + WIND_PERSISTENCE * (s - MEAN_WIND) + speed_noise.sample(rng)).max(0.0);
            // occasional squall
            if rng.gen_bool(0.05) {
                s += rng.gen_range(4.0..9.0);
            }
            d = (d + dir_noise.sample(rng)).rem_euclid(360.0);
            speed.push(s);
            direction_deg.push(d);
        }

        Ok(Self {
            start_ms,
            speed,
            direction_deg,
        })
    }

    fn timestamps(&self) -> Vec<Timestamp> {
        let step = (WIND_INTERVAL_SECS * 1_000.0) as i64;
        (0..self.speed.len() as i64)
            .map(|k| self.start_ms + k * step)
            .collect()
    }

    /// Speed and direction at wall time `t_ms`, clamped at both ends.
    fn at(&self, t_ms: f64) -> (f64, f64) {
        let t_secs = (t_ms - self.start_ms as f64) / 1_000.0;
        let pos = (t_secs / WIND_INTERVAL_SECS).max(0.0);
        let last = self.speed.len() - 1;
        let k = (pos.floor() as usize).min(last);
        let k1 = (k + 1).min(last);
        let w = (pos - k as f64).clamp(0.0, 1.0);
        let speed = self.speed[k] * (1.0 - w) + self.speed[k1] * w;
        (speed, self.direction_deg[k])
    }

    fn to_table(&self) -> Result<Table> {
        Ok(Table::new(self.timestamps())?
            .with_channel(channels::WIND_SPEED, self.speed.clone())?
            .with_channel(channels::WIND_DIRECTION, self.direction_deg.clone())?)
    }
}

// ============================================================================
// Trees
// ============================================================================

/// One instrumented tree.
struct Tree {
    natural_freq_hz: f64,
    lean_ew: f64,
    lean_ns: f64,
    /// Offset of the main sway axis from the wind direction (degrees)
    axis_offset_deg: f64,
}

impl Tree {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            natural_freq_hz: rng.gen_range(0.2..0.6),
            lean_ew: rng.gen_range(-1.0..1.0),
            lean_ns: rng.gen_range(-1.0..1.0),
            axis_offset_deg: rng.gen_range(-20.0..20.0),
        }
    }

    fn simulate(
        &self,
        rng: &mut StdRng,
        wind: &WindRecord,
        samples: usize,
        sample_rate: f64,
        lag_secs: f64,
    ) -> Result<Table> {
        let sensor_noise = Normal::<f64>::new(0.0, 0.002)?;
        let temp_noise = Normal::<f64>::new(0.0, 0.05)?;
        let across_wind = Normal::<f64>::new(0.0, 0.3)?;
        let step_ms = 1_000.0 / sample_rate;

        let mut index = Vec::with_capacity(samples);
        let mut ew = Vec::with_capacity(samples);
        let mut ns = Vec::with_capacity(samples);
        let mut temperature = Vec::with_capacity(samples);

        for i in 0..samples {
            let t = i as f64 / sample_rate;
            let wall_ms = START_MS as f64 + i as f64 * step_ms;
            let (speed, dir_deg) = wind.at(wall_ms - lag_secs * 1_000.0);
            let amplitude = SWAY_GAIN * speed * speed;
            let phase = 2.0 * PI * self.natural_freq_hz * t;
            let along = amplitude * phase.sin();
            let across = amplitude * across_wind.sample(rng) * (0.5 * phase).cos();
            let axis = (dir_deg + self.axis_offset_deg).to_radians();

            let day_phase = 2.0 * PI * (t / 86_400.0 - 0.25);
            let temp = MEAN_TEMP + DAILY_TEMP_SWING * day_phase.sin() + temp_noise.sample(rng);
            let thermal = temp - MEAN_TEMP;

            index.push(wall_ms.round() as i64);
            ew.push(
                self.lean_ew
                    + along * axis.cos()
                    - across * axis.sin()
                    + THERMAL_COEFF_EW * thermal
                    + sensor_noise.sample(rng),
            );
            ns.push(
                self.lean_ns
                    + along * axis.sin()
                    + across * axis.cos()
                    + THERMAL_COEFF_NS * thermal
                    + sensor_noise.sample(rng),
            );
            temperature.push(temp);
        }

        Ok(Table::new(index)?
            .with_channel(channels::EAST_WEST, ew)?
            .with_channel(channels::NORTH_SOUTH, ns)?
            .with_channel(channels::TEMPERATURE, temperature)?)
    }
}

fn write(table: &Table, dir: &Path, name: &str) -> Result<()> {
    let path = dir.join(name);
    write_table(table, &path).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), rows = table.len(), "Wrote table");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let duration_secs = f64::from(args.hours) * 3_600.0;
    let lag_secs = f64::from(args.lag_secs);
    let sample_rate = f64::from(args.sample_rate.max(1));
    let samples = (duration_secs * sample_rate) as usize;
    // Wind covers the sway span plus the lag on the early side
    let reports = ((duration_secs + lag_secs) / WIND_INTERVAL_SECS).ceil() as usize + 1;

    info!(
        hours = args.hours,
        trees = args.trees,
        sample_rate,
        lag_secs,
        seed = ?args.seed,
        "Simulating"
    );

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    // First report precedes the first sway sample by the lag
    let wind_start = START_MS - (lag_secs * 1_000.0) as i64;
    let wind = WindRecord::generate(&mut rng, wind_start, reports)?;
    write(&wind.to_table()?, &args.output_dir, "wind.csv")?;

    for n in 1..=args.trees {
        let tree = Tree::random(&mut rng);
        let table = tree.simulate(&mut rng, &wind, samples, sample_rate, lag_secs)?;
        write(&table, &args.output_dir, &format!("sway_{n:02}.csv"))?;
    }

    info!(expected_shift_secs = lag_secs, "Simulation complete");
    Ok(())
}
