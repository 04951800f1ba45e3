//! Synthetic charging-session CSV generation.
//!
//! Produces files in the same shape as public charging-station usage exports
//! (`Station Name`, `Start Date`, `Energy (kWh)`), so the fit pipeline can be
//! demonstrated and tested without the real dataset.
//!
//! - energies are gamma distributed (a long right tail of big top-ups)
//! - start times mix a morning commute peak and a broader midday peak
//! - each energy cell is left blank with a configurable probability

use std::io::Write;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Gamma, Normal};

use crate::domain::SampleConfig;
use crate::error::AppError;
use crate::io::ingest::{DEFAULT_ENERGY_COLUMN, DEFAULT_TIME_COLUMN};

const ENERGY_SHAPE: f64 = 2.0;
const ENERGY_SCALE_KWH: f64 = 4.5;

/// Morning peak: mean 08:30, sd 1.5h, weight 0.6.
const MORNING: (f64, f64, f64) = (8.5 * 3600.0, 1.5 * 3600.0, 0.6);
/// Midday peak: mean 13:30, sd 2.5h.
const MIDDAY: (f64, f64) = (13.5 * 3600.0, 2.5 * 3600.0);

/// Sessions per calendar day in the generated file.
const SESSIONS_PER_DAY: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleStats {
    pub rows: usize,
    pub missing_energy: usize,
}

/// Write a synthetic dataset to `out`.
pub fn write_sample<W: Write>(out: W, config: &SampleConfig) -> Result<SampleStats, AppError> {
    if config.rows == 0 {
        return Err(AppError::input("Sample row count must be > 0."));
    }
    if !(0.0..1.0).contains(&config.missing_prob) {
        return Err(AppError::input("Missing-energy probability must be in [0, 1)."));
    }
    if config.stations == 0 {
        return Err(AppError::input("Station count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let energy = Gamma::new(ENERGY_SHAPE, ENERGY_SCALE_KWH)
        .map_err(|e| AppError::input(format!("Energy distribution error: {e}")))?;
    let morning = Normal::new(MORNING.0, MORNING.1)
        .map_err(|e| AppError::input(format!("Start-time distribution error: {e}")))?;
    let midday = Normal::new(MIDDAY.0, MIDDAY.1)
        .map_err(|e| AppError::input(format!("Start-time distribution error: {e}")))?;

    let first_day = NaiveDate::from_ymd_opt(2011, 7, 29)
        .ok_or_else(|| AppError::input("Invalid sample start date."))?;

    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["Station Name", DEFAULT_TIME_COLUMN, DEFAULT_ENERGY_COLUMN])
        .map_err(|e| AppError::input(format!("Failed to write sample header: {e}")))?;

    let mut missing_energy = 0usize;
    for i in 0..config.rows {
        let day = first_day + Duration::days((i / SESSIONS_PER_DAY) as i64);
        let secs = if rng.r#gen::<f64>() < MORNING.2 {
            morning.sample(&mut rng)
        } else {
            midday.sample(&mut rng)
        };
        let start = at_time_of_day(day, secs);

        let station = format!("PALO ALTO CA / SAMPLE #{}", rng.gen_range(1..=config.stations));
        let energy_cell = if rng.r#gen::<f64>() < config.missing_prob {
            missing_energy += 1;
            String::new()
        } else {
            format!("{:.6}", energy.sample(&mut rng))
        };

        writer
            .write_record([station, start.format("%-m/%-d/%Y %-H:%M").to_string(), energy_cell])
            .map_err(|e| AppError::input(format!("Failed to write sample row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush sample CSV: {e}")))?;

    Ok(SampleStats {
        rows: config.rows,
        missing_energy,
    })
}

/// Wrap `secs` onto a 24h clock and truncate to whole minutes.
fn at_time_of_day(day: NaiveDate, secs: f64) -> NaiveDateTime {
    let secs = (secs.round() as i64).rem_euclid(86_400);
    let minutes = (secs / 60) as u32;
    let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN);
    day.and_time(time)
}
