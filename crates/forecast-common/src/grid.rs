//! Daytime time grid in the reference timezone.
//!
//! Each entry pairs a local date and hour with the UTC instant used for the
//! upstream `TIME` parameter.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// First local hour of the daytime window.
pub const FIRST_LOCAL_HOUR: u32 = 7;
/// Last local hour of the daytime window (inclusive).
pub const LAST_LOCAL_HOUR: u32 = 21;
/// Entries generated per day.
pub const HOURS_PER_DAY: usize = (LAST_LOCAL_HOUR - FIRST_LOCAL_HOUR + 1) as usize;

pub const MIN_DAYS: usize = 1;
pub const MAX_DAYS: usize = 7;
pub const DEFAULT_DAYS: usize = 2;

/// How the UTC offset is chosen for each grid date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// One offset for the whole horizon, taken from the current instant.
    #[default]
    Current,
    /// Offset recomputed at local noon of every date.
    PerDay,
}

impl std::str::FromStr for DstPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "current" => Ok(DstPolicy::Current),
            "per_day" | "per-day" => Ok(DstPolicy::PerDay),
            other => Err(format!("unknown DST policy '{}' (expected current or per_day)", other)),
        }
    }
}

impl std::fmt::Display for DstPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DstPolicy::Current => f.write_str("current"),
            DstPolicy::PerDay => f.write_str("per_day"),
        }
    }
}

/// One (local date, local hour) cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeGridEntry {
    pub local_date: NaiveDate,
    pub local_hour: u32,
    pub utc_instant: DateTime<Utc>,
}

impl TimeGridEntry {
    /// WMS `TIME` value, e.g. `2024-07-15T14:00:00Z`.
    pub fn utc_param(&self) -> String {
        self.utc_instant.format("%Y-%m-%dT%H:00:00Z").to_string()
    }

    /// Local date as `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        self.local_date.format("%Y-%m-%d").to_string()
    }

    /// Local wall time, e.g. `2024-07-15 07:00`.
    pub fn local_label(&self) -> String {
        format!("{} {:02}:00", self.date_string(), self.local_hour)
    }
}

/// Clamp a requested horizon to the supported range.
pub fn clamp_days(days: i64) -> usize {
    days.clamp(MIN_DAYS as i64, MAX_DAYS as i64) as usize
}

/// Parse a `days` query value; unparseable input falls back to `default`.
pub fn parse_days(raw: Option<&str>, default: usize) -> usize {
    match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
        Some(days) => clamp_days(days),
        None => clamp_days(default as i64),
    }
}

/// Local calendar dates covered by a horizon, starting today.
pub fn local_dates(tz: Tz, now: DateTime<Utc>, days: usize) -> Vec<NaiveDate> {
    let today = now.with_timezone(&tz).date_naive();
    (0..days as i64).map(|d| today + Duration::days(d)).collect()
}

/// Builds time grids for a fixed timezone and DST policy.
#[derive(Debug, Clone, Copy)]
pub struct TimeGridGenerator {
    timezone: Tz,
    policy: DstPolicy,
}

impl TimeGridGenerator {
    pub fn new(timezone: Tz, policy: DstPolicy) -> Self {
        Self { timezone, policy }
    }

    /// Generate `15 × days` entries, day-major and hour-ascending.
    ///
    /// `days` is clamped to 1..=7.
    pub fn generate(&self, now: DateTime<Utc>, days: usize) -> Vec<TimeGridEntry> {
        let days = clamp_days(days as i64);
        let current_offset = self.offset_hours_at(now);

        let mut entries = Vec::with_capacity(days * HOURS_PER_DAY);
        for local_date in local_dates(self.timezone, now, days) {
            let offset = match self.policy {
                DstPolicy::Current => current_offset,
                DstPolicy::PerDay => self.offset_hours_on(local_date).unwrap_or(current_offset),
            };

            for local_hour in FIRST_LOCAL_HOUR..=LAST_LOCAL_HOUR {
                // Adding whole hours to midnight rolls the UTC date forward
                // when hour + offset reaches 24.
                let utc_instant = (local_date.and_time(NaiveTime::MIN)
                    + Duration::hours(local_hour as i64 + offset))
                .and_utc();

                entries.push(TimeGridEntry {
                    local_date,
                    local_hour,
                    utc_instant,
                });
            }
        }

        entries
    }

    /// Hours to add to local time to get UTC (7 under PDT, 8 under PST).
    pub fn offset_hours_at(&self, instant: DateTime<Utc>) -> i64 {
        let local_minus_utc = self
            .timezone
            .offset_from_utc_datetime(&instant.naive_utc())
            .fix()
            .local_minus_utc();
        -(local_minus_utc as i64) / 3600
    }

    fn offset_hours_on(&self, date: NaiveDate) -> Option<i64> {
        let noon = date.and_hms_opt(12, 0, 0)?;
        let local = self.timezone.from_local_datetime(&noon).earliest()?;
        Some(-(local.offset().fix().local_minus_utc() as i64) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vancouver() -> TimeGridGenerator {
        TimeGridGenerator::new(chrono_tz::America::Vancouver, DstPolicy::Current)
    }

    #[test]
    fn test_parse_days_defaults_and_clamps() {
        assert_eq!(parse_days(None, DEFAULT_DAYS), 2);
        assert_eq!(parse_days(Some("abc"), DEFAULT_DAYS), 2);
        assert_eq!(parse_days(Some("0"), DEFAULT_DAYS), 1);
        assert_eq!(parse_days(Some("-3"), DEFAULT_DAYS), 1);
        assert_eq!(parse_days(Some("4"), DEFAULT_DAYS), 4);
        assert_eq!(parse_days(Some("30"), DEFAULT_DAYS), 7);
    }

    #[test]
    fn test_offset_hours() {
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(vancouver().offset_hours_at(summer), 7);
        assert_eq!(vancouver().offset_hours_at(winter), 8);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("current".parse::<DstPolicy>().unwrap(), DstPolicy::Current);
        assert_eq!("per-day".parse::<DstPolicy>().unwrap(), DstPolicy::PerDay);
        assert!("exact".parse::<DstPolicy>().is_err());
    }

    #[test]
    fn test_utc_param_format() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap();
        let grid = vancouver().generate(now, 1);
        assert_eq!(grid[0].utc_param(), "2024-07-15T14:00:00Z");
        assert_eq!(grid[0].local_label(), "2024-07-15 07:00");
    }
}
