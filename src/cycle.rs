//! Daily reset clock.
//!
//! The day ends at midnight of a fixed UTC+1 clock, which is 23:00 UTC all year.
//! A [`DailyCycle`] remembers the next reset instant; each tick compares the
//! current time against it and reports a rollover once it has been reached.
//! Missed resets are not replayed: a cycle created after a reset instant simply
//! waits for the following one.

use crate::session::Session;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing;

/// Offset of the reset clock from UTC, in seconds.
pub const RESET_CLOCK_OFFSET_SECS: i64 = 3600;
const SECS_PER_DAY: i64 = 86_400;

/// First reset instant strictly after `now`.
pub fn next_reset_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let clock_secs = (now.timestamp() + RESET_CLOCK_OFFSET_SECS).rem_euclid(SECS_PER_DAY);
    let whole_second = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()));
    whole_second + Duration::seconds(SECS_PER_DAY - clock_secs)
}

/// Calendar date on the reset clock.
pub fn reset_clock_date(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::seconds(RESET_CLOCK_OFFSET_SECS)).date_naive()
}

/// Monday of the week containing `now` on the reset clock.
pub fn tournament_week_start(now: DateTime<Utc>) -> NaiveDate {
    let today = reset_clock_date(now);
    today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Counting,
    /// The reset instant was reached on this tick.
    Rollover,
}

#[derive(Debug, Clone)]
pub struct DailyCycle {
    next_reset: DateTime<Utc>,
}

impl DailyCycle {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self { next_reset: next_reset_after(now) }
    }

    pub fn next_reset(&self) -> DateTime<Utc> {
        self.next_reset
    }

    /// Whole seconds left, never negative.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.next_reset - now).num_seconds().max(0)
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> CyclePhase {
        if now < self.next_reset {
            return CyclePhase::Counting;
        }
        self.next_reset = next_reset_after(now);
        CyclePhase::Rollover
    }
}

/// Running 1 Hz timer driving a session's rollovers.
pub struct DailyCycleHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DailyCycleHandle {
    /// Cancels the timer and waits for the task to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Daily cycle task ended abnormally");
        }
    }
}

/// Starts ticking `session` once per second until stopped.
pub fn spawn_daily_cycle(session: Arc<Session>) -> DailyCycleHandle {
    let (stop, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut interval = time::interval(std::time::Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Daily cycle timer started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = session.tick(Utc::now()).await {
                        tracing::error!(error = %e, "Persisting daily rollover failed");
                    }
                }
                _ = stopped.changed() => break,
            }
        }

        tracing::info!("Daily cycle timer stopped");
    });

    DailyCycleHandle { stop, task }
}
