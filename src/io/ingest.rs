//! CSV ingest for charging-session exports.
//!
//! This module turns a charging-station usage CSV into a list of
//! `ChargingSession` records with a parsed start timestamp and an optional
//! energy value.
//!
//! Design goals:
//! - **Strict schema** for the two required columns (clear errors + exit code 2)
//! - **Fail fast** on malformed timestamps or energy values (line numbers in errors)
//! - **Missing energy is data, not an error**: NA cells become `None`
//! - **Separation of concerns**: no series derivation or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::ChargingSession;
use crate::error::AppError;

pub const DEFAULT_TIME_COLUMN: &str = "Start Date";
pub const DEFAULT_ENERGY_COLUMN: &str = "Energy (kWh)";

/// Cell values treated as a missing energy reading.
const NA_MARKERS: [&str; 13] = [
    "na", "n/a", "nan", "-nan", "null", "none", "#n/a", "<na>", "#na", "-1.#ind", "1.#ind", "-1.#qnan", "1.#qnan",
];

/// Loaded dataset: every record plus a few counts for logging/reporting.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub sessions: Vec<ChargingSession>,
    pub rows_read: usize,
    pub missing_energy: usize,
}

/// Load charging sessions from a CSV file.
pub fn load_sessions(path: &Path, time_column: &str, energy_column: &str) -> Result<SessionData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_sessions(file, time_column, energy_column)
}

/// Parse charging sessions from any CSV source.
pub fn read_sessions<R: Read>(source: R, time_column: &str, energy_column: &str) -> Result<SessionData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    let time_idx = require_column(&header_map, time_column)?;
    let energy_idx = require_column(&header_map, energy_column)?;

    let mut sessions = Vec::new();
    let mut missing_energy = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        let record = result.map_err(|e| AppError::input(format!("CSV parse error on line {line}: {e}")))?;

        let raw_time = cell(&record, time_idx)
            .ok_or_else(|| AppError::input(format!("Line {line}: missing `{time_column}` value.")))?;
        let start = parse_timestamp(raw_time).map_err(|e| AppError::input(format!("Line {line}: {e}")))?;

        let energy_kwh = parse_energy(cell(&record, energy_idx))
            .map_err(|e| AppError::input(format!("Line {line}: {e}")))?;
        if energy_kwh.is_none() {
            missing_energy += 1;
        }

        sessions.push(ChargingSession {
            line,
            start,
            energy_kwh,
        });
    }

    Ok(SessionData {
        rows_read: sessions.len(),
        sessions,
        missing_energy,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins on duplicate headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn require_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| AppError::input(format!("Missing required column: `{name}`")))
}

fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a session start timestamp.
///
/// Exports from charging networks disagree on formats; we accept a small,
/// fixed set so parsing stays deterministic.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    const DATETIME_FMTS: [&str; 8] = [
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ];
    const DATE_FMTS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

    let s = s.trim();
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        // Keep the wall-clock time as recorded at the station.
        return Ok(dt.naive_local());
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.and_time(chrono::NaiveTime::MIN));
        }
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected e.g. M/D/YYYY H:MM, YYYY-MM-DD HH:MM:SS or RFC 3339."
    ))
}

/// Parse an energy cell: `Ok(None)` for missing/NA, error for non-numeric text.
pub fn parse_energy(s: Option<&str>) -> Result<Option<f64>, String> {
    let Some(s) = s else { return Ok(None) };
    if is_na_marker(s) {
        return Ok(None);
    }
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid energy value '{s}' (expected a number in kWh)."))?;
    if v.is_finite() { Ok(Some(v)) } else { Ok(None) }
}

fn is_na_marker(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    NA_MARKERS.contains(&lower.as_str())
}
