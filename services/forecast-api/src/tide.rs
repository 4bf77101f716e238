//! Tide table: CHS prediction CSV filtered to the daytime window.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use csv::{ReaderBuilder, StringRecord, Trim};
use forecast_common::grid::{local_dates, FIRST_LOCAL_HOUR, LAST_LOCAL_HOUR};
use forecast_common::{Clock, ErrorDocument};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::ApiError;

pub const HEADER_ROWS: usize = 7;
pub const UNIT: &str = "m";

pub const FILE_NOT_FOUND: &str = "Tide data file not found";
pub const FILE_UNREADABLE: &str = "Could not open tide data file";

/// Date format used inside the CSV.
const CSV_DATE_FORMAT: &str = "%Y/%m/%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidePoint {
    pub time: String,
    pub hour: f64,
    pub value: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideDocument {
    pub station: String,
    pub unit: String,
    pub dates: Vec<String>,
    pub data: Vec<TidePoint>,
    pub generated_at: DateTime<Utc>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn within_daytime(hour: u32, minute: u32) -> bool {
    (FIRST_LOCAL_HOUR..=LAST_LOCAL_HOUR).contains(&hour) && !(hour == LAST_LOCAL_HOUR && minute > 0)
}

/// Parse one data row into a point if it falls on a wanted date and inside
/// the daytime window.
fn parse_row(record: &StringRecord, wanted: &[String]) -> Option<TidePoint> {
    let datetime = record.get(0)?;
    let value = record.get(1)?;

    let row_date = datetime.get(0..10)?;
    if !wanted.iter().any(|d| d == row_date) {
        return None;
    }

    let time = datetime.get(11..16)?;
    let hour: u32 = time.get(0..2)?.parse().ok()?;
    let minute: u32 = time.get(3..5)?.parse().ok()?;
    if !within_daytime(hour, minute) {
        return None;
    }

    let value: f64 = match value.parse() {
        Ok(v) => v,
        Err(_) => {
            debug!(row = ?record, "Skipping tide row with unparseable value");
            return None;
        }
    };

    Some(TidePoint {
        time: format!("{:02}:{:02}", hour, minute),
        hour: hour as f64 + minute as f64 / 60.0,
        value: round2(value),
        date: row_date.replace('/', "-"),
    })
}

/// Everything after the station header block.
fn data_section(content: &str) -> &str {
    match content.match_indices('\n').nth(HEADER_ROWS - 1) {
        Some((idx, _)) => &content[idx + 1..],
        None => "",
    }
}

/// Points for `dates`, in file order, and the dates that actually matched.
pub fn parse_tide_csv(content: &str, dates: &[NaiveDate]) -> (Vec<TidePoint>, Vec<String>) {
    let wanted: Vec<String> = dates.iter().map(|d| d.format(CSV_DATE_FORMAT).to_string()).collect();

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data_section(content).as_bytes());

    let mut points = Vec::new();
    let mut matched: Vec<String> = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "Skipping malformed tide row");
                continue;
            }
        };
        if let Some(point) = parse_row(&record, &wanted) {
            if !matched.contains(&point.date) {
                matched.push(point.date.clone());
            }
            points.push(point);
        }
    }

    (points, matched)
}

pub struct TideService {
    csv_path: PathBuf,
    station: String,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl TideService {
    pub fn new(csv_path: impl Into<PathBuf>, station: impl Into<String>, timezone: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            csv_path: csv_path.into(),
            station: station.into(),
            timezone,
            clock,
        }
    }

    /// Serialized tide table, or an error document when the file is missing
    /// or unreadable.
    pub async fn get(&self, days: usize, debug: bool) -> Result<Bytes, ApiError> {
        let now = self.clock.now();
        let dates = local_dates(self.timezone, now, days);

        let content = match tokio::fs::read(&self.csv_path).await {
            Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %self.csv_path.display(), "Tide data file not found");
                return error_body(FILE_NOT_FOUND);
            }
            Err(e) => {
                warn!(path = %self.csv_path.display(), error = %e, "Could not read tide data file");
                return error_body(FILE_UNREADABLE);
            }
        };

        let (data, matched) = parse_tide_csv(&content, &dates);
        let document = TideDocument {
            station: self.station.clone(),
            unit: UNIT.to_string(),
            dates: matched,
            data,
            generated_at: now,
        };

        if !debug {
            return Ok(Bytes::from(serde_json::to_vec_pretty(&document)?));
        }

        let total_points = document.data.len();
        let mut value = serde_json::to_value(document)?;
        value["debug"] = json!({
            "csv_file": self.csv_path.display().to_string(),
            "file_exists": self.csv_path.exists(),
            "requested_dates": dates
                .iter()
                .map(|d| d.format(CSV_DATE_FORMAT).to_string())
                .collect::<Vec<_>>(),
            "total_points": total_points,
        });
        Ok(Bytes::from(serde_json::to_vec_pretty(&value)?))
    }
}

fn error_body(message: &str) -> Result<Bytes, ApiError> {
    Ok(Bytes::from(serde_json::to_vec(&ErrorDocument::new(message))?))
}
