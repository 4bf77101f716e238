//! Prefetch scheduler: refreshes the forecast and marine caches at fixed
//! local wall-clock times so requests rarely pay for a full pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use forecast_common::Clock;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::forecast::ForecastService;
use crate::marine::MarineService;

/// Daily slots at `minute` past each of `hours`, in the reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub hours: &'static [u32],
    pub minute: u32,
}

/// 04:00, 10:00, 16:00 and 22:00 local.
pub const FORECAST_SCHEDULE: DailySchedule = DailySchedule {
    hours: &[4, 10, 16, 22],
    minute: 0,
};

/// Every three hours at half past.
pub const MARINE_SCHEDULE: DailySchedule = DailySchedule {
    hours: &[0, 3, 6, 9, 12, 15, 18, 21],
    minute: 30,
};

impl DailySchedule {
    /// First slot strictly after `after`. Slots that fall in a DST gap are
    /// skipped; ambiguous ones fire at their earlier instant.
    pub fn next_after(&self, tz: Tz, after: DateTime<Utc>) -> DateTime<Utc> {
        let local_date = after.with_timezone(&tz).date_naive();

        // Two days always contain a slot; the third covers a skipped gap
        for day in 0..3 {
            let date = local_date + ChronoDuration::days(day);
            for &hour in self.hours {
                let Some(time) = NaiveTime::from_hms_opt(hour, self.minute, 0) else {
                    continue;
                };
                let Some(slot) = tz.from_local_datetime(&date.and_time(time)).earliest() else {
                    continue;
                };
                let slot = slot.with_timezone(&Utc);
                if slot > after {
                    return slot;
                }
            }
        }

        after + ChronoDuration::days(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchJob {
    Forecast,
    Marine,
}

impl PrefetchJob {
    pub fn name(&self) -> &'static str {
        match self {
            PrefetchJob::Forecast => "forecast",
            PrefetchJob::Marine => "marine",
        }
    }
}

pub struct PrefetchScheduler {
    forecast: Arc<ForecastService>,
    marine: Arc<MarineService>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl PrefetchScheduler {
    pub fn new(
        forecast: Arc<ForecastService>,
        marine: Arc<MarineService>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            forecast,
            marine,
            clock,
            timezone,
        }
    }

    /// Which job fires next and when.
    pub fn next_job(
        next_forecast: DateTime<Utc>,
        next_marine: DateTime<Utc>,
    ) -> (PrefetchJob, DateTime<Utc>) {
        if next_forecast <= next_marine {
            (PrefetchJob::Forecast, next_forecast)
        } else {
            (PrefetchJob::Marine, next_marine)
        }
    }

    /// Run one job now. Failures are logged; the previous cache entry stays.
    pub async fn run_job(&self, job: PrefetchJob) {
        info!(job = job.name(), "Running scheduled prefetch");
        let result = match job {
            PrefetchJob::Forecast => self
                .forecast
                .refresh(self.forecast.default_days())
                .await
                .map(|_| ()),
            PrefetchJob::Marine => self.marine.refresh().await.map(|_| ()),
        };
        if let Err(e) = result {
            error!(job = job.name(), error = %e, "Scheduled prefetch failed");
        }
    }

    /// Run until a shutdown signal arrives.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) {
        let now = self.clock.now();
        let mut next_forecast = FORECAST_SCHEDULE.next_after(self.timezone, now);
        let mut next_marine = MARINE_SCHEDULE.next_after(self.timezone, now);

        loop {
            let (job, at) = Self::next_job(next_forecast, next_marine);
            let wait = (at - self.clock.now()).to_std().unwrap_or(Duration::ZERO);
            info!(job = job.name(), at = %at, wait_secs = wait.as_secs(), "Next prefetch scheduled");

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down prefetch scheduler");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            self.run_job(job).await;

            match job {
                PrefetchJob::Forecast => next_forecast = FORECAST_SCHEDULE.next_after(self.timezone, at),
                PrefetchJob::Marine => next_marine = MARINE_SCHEDULE.next_after(self.timezone, at),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Vancouver;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_forecast_slots_in_summer() {
        // 11:00 PDT
        let now = utc(2024, 7, 15, 18, 0);
        assert_eq!(FORECAST_SCHEDULE.next_after(Vancouver, now), utc(2024, 7, 15, 23, 0));
    }

    #[test]
    fn test_forecast_rolls_to_next_day() {
        // 22:30 PDT
        let now = utc(2024, 7, 16, 5, 30);
        assert_eq!(FORECAST_SCHEDULE.next_after(Vancouver, now), utc(2024, 7, 16, 11, 0));
    }

    #[test]
    fn test_marine_slot_is_strictly_after() {
        // Exactly 12:30 PDT
        let now = utc(2024, 7, 15, 19, 30);
        assert_eq!(MARINE_SCHEDULE.next_after(Vancouver, now), utc(2024, 7, 15, 22, 30));
    }

    #[test]
    fn test_slots_in_winter() {
        // 02:00 PST
        let now = utc(2024, 1, 15, 10, 0);
        assert_eq!(MARINE_SCHEDULE.next_after(Vancouver, now), utc(2024, 1, 15, 11, 30));
        assert_eq!(FORECAST_SCHEDULE.next_after(Vancouver, now), utc(2024, 1, 15, 12, 0));
    }

    #[test]
    fn test_slots_across_spring_forward() {
        // 23:00 PST on 2024-03-09; clocks skip 02:00-03:00 overnight
        let now = utc(2024, 3, 10, 7, 0);
        assert_eq!(MARINE_SCHEDULE.next_after(Vancouver, now), utc(2024, 3, 10, 8, 30));
        // 03:30 PDT
        let after_midnight = utc(2024, 3, 10, 8, 30);
        assert_eq!(MARINE_SCHEDULE.next_after(Vancouver, after_midnight), utc(2024, 3, 10, 10, 30));
    }

    #[test]
    fn test_next_job_picks_earliest() {
        let a = utc(2024, 7, 15, 19, 30);
        let b = utc(2024, 7, 15, 23, 0);
        assert_eq!(PrefetchScheduler::next_job(b, a), (PrefetchJob::Marine, a));
        assert_eq!(PrefetchScheduler::next_job(a, b), (PrefetchJob::Forecast, a));
    }
}
