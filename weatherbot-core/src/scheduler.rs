//! Daily wall-clock trigger for the pipeline.
//!
//! The loop wakes on a short tick, converts the current instant into the
//! configured timezone and fires an entry whose `HH:MM` matches, at most once
//! per entry per local calendar day. Runs are awaited inline, so they never
//! overlap; an entry whose minute passes while a run is still going is
//! skipped for that day.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::{collections::HashMap, future::Future, time::Duration};
use tokio::time::MissedTickBehavior;

use crate::{error::SchedulerError, model::ScheduleEntry};

pub const DEFAULT_TICK: Duration = Duration::from_secs(15);

/// Work triggered by the scheduler. Failures are the job's to log.
#[async_trait]
pub trait Job: Send {
    async fn fire(&mut self, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Running,
}

#[derive(Debug)]
pub struct Scheduler {
    timezone: Tz,
    entries: Vec<ScheduleEntry>,
    last_fired: HashMap<ScheduleEntry, NaiveDate>,
    state: SchedulerState,
    tick: Duration,
}

impl Scheduler {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            entries: Vec::new(),
            last_fired: HashMap::new(),
            state: SchedulerState::Idle,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Register the daily entries. Duplicates collapse into one.
    pub fn arm(&mut self, entries: &[ScheduleEntry]) -> Result<(), SchedulerError> {
        let mut entries = entries.to_vec();
        entries.sort();
        entries.dedup();

        if entries.is_empty() {
            return Err(SchedulerError::EmptySchedule);
        }

        self.entries = entries;
        self.state = SchedulerState::Armed;
        Ok(())
    }

    /// The entry that should fire at `now`, if any; marks it fired for today.
    pub fn due(&mut self, now: DateTime<Utc>) -> Option<ScheduleEntry> {
        let local = now.with_timezone(&self.timezone);
        let today = local.date_naive();

        let entry = *self
            .entries
            .iter()
            .find(|e| e.matches(&local) && self.last_fired.get(*e) != Some(&today))?;

        self.last_fired.insert(entry, today);
        Some(entry)
    }

    /// Next instant strictly after `now` at which an entry is scheduled.
    pub fn next_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
        let today = now.with_timezone(&self.timezone).date_naive();

        [today, today + ChronoDuration::days(1)]
            .into_iter()
            .flat_map(|day| self.entries.iter().filter_map(move |e| self.at(day, e)))
            .filter(|t| *t > now)
            .min()
    }

    fn at(&self, day: NaiveDate, entry: &ScheduleEntry) -> Option<DateTime<Tz>> {
        let naive = day.and_hms_opt(entry.hour(), entry.minute(), 0)?;
        // a wall-clock time inside a DST gap does not exist that day
        self.timezone.from_local_datetime(&naive).earliest()
    }

    /// Drive `job` until `shutdown` resolves.
    pub async fn run<J, S>(&mut self, job: &mut J, shutdown: S) -> Result<(), SchedulerError>
    where
        J: Job,
        S: Future<Output = ()>,
    {
        if self.state != SchedulerState::Armed {
            return Err(SchedulerError::NotArmed);
        }
        self.state = SchedulerState::Running;

        let times: Vec<String> = self.entries.iter().map(ToString::to_string).collect();
        tracing::info!(timezone = %self.timezone, entries = ?times, "scheduler started");
        self.log_next(Utc::now());

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let now = Utc::now();
                    if let Some(entry) = self.due(now) {
                        tracing::info!(%entry, "schedule entry fired");
                        job.fire(now).await;
                        self.log_next(Utc::now());
                    }
                }
            }
        }

        tracing::info!("scheduler stopped");
        self.state = SchedulerState::Armed;
        Ok(())
    }

    fn log_next(&self, now: DateTime<Utc>) {
        if let Some(next) = self.next_fire(now) {
            tracing::info!(next = %next.format("%Y-%m-%d %H:%M %Z"), "next scheduled run");
        }
    }
}
