//! Staggered sweeps and the daily summary trigger

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use wxwatch_archive::DailyAggregator;

use crate::pipeline::{IngestFailure, IngestJob, IngestOutcome};

/// What happened to one location in a sweep
#[derive(Debug)]
pub struct SweepOutcome {
    pub location: String,
    pub index: usize,
    pub dispatched_at: Instant,
    pub result: Result<IngestOutcome, IngestFailure>,
}

/// Tasks spawned for one sweep and the channel they report on
pub struct SweepHandle {
    pub started_at: Instant,
    outcomes: mpsc::UnboundedReceiver<SweepOutcome>,
    tasks: Vec<JoinHandle<()>>,
}

impl SweepHandle {
    /// Next outcome in completion order; `None` once every task has reported
    pub async fn next_outcome(&mut self) -> Option<SweepOutcome> {
        self.outcomes.recv().await
    }

    /// Wait for the whole sweep, outcomes in completion order
    #[cfg(test)]
    pub async fn collect(mut self) -> Vec<SweepOutcome> {
        let mut all = Vec::with_capacity(self.tasks.len());
        while let Some(outcome) = self.outcomes.recv().await {
            all.push(outcome);
        }
        all
    }
}

/// Start one sweep: location `i` is dispatched `i * delay` after the start.
///
/// Every location runs in its own task so a slow or failing location never
/// holds back the ones after it.
pub fn run_sweep(locations: &[String], delay: Duration, job: &IngestJob) -> SweepHandle {
    let started_at = Instant::now();
    let (tx, outcomes) = mpsc::unbounded_channel();

    let tasks = locations
        .iter()
        .enumerate()
        .map(|(index, location)| {
            let tx = tx.clone();
            let job = job.clone();
            let location = location.clone();
            let offset = delay.saturating_mul(index as u32);

            tokio::spawn(async move {
                sleep_until(started_at + offset).await;
                let dispatched_at = Instant::now();
                debug!(%location, index, "dispatching fetch");

                let result = job.run(&location).await;
                if let Err(e) = &result {
                    warn!(%location, error = %e, "location skipped this sweep");
                }

                // receiver may already be gone (fire-and-forget sweeps)
                let _ = tx.send(SweepOutcome {
                    location,
                    index,
                    dispatched_at,
                    result,
                });
            })
        })
        .collect();

    SweepHandle {
        started_at,
        outcomes,
        tasks,
    }
}

async fn log_sweep(mut handle: SweepHandle) {
    let started_at = handle.started_at;
    let (mut total, mut failed) = (0usize, 0usize);
    while let Some(o) = handle.next_outcome().await {
        total += 1;
        if o.result.is_err() {
            failed += 1;
        }
        debug!(
            location = %o.location,
            index = o.index,
            offset_ms = (o.dispatched_at - started_at).as_millis() as u64,
            ok = o.result.is_ok(),
            "sweep outcome"
        );
    }
    // a task that panicked drops its sender without reporting
    let missing = handle.tasks.len().saturating_sub(total);
    if missing > 0 {
        warn!(missing, "Sweep tasks ended without reporting");
    }
    info!(total, failed, "Sweep finished");
}

/// Pad standard 5-field cron to the 6-field form the `cron` crate expects
fn normalize_cron_expr(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

pub fn parse_cron(expr: &str) -> Result<cron::Schedule> {
    cron::Schedule::from_str(&normalize_cron_expr(expr))
        .with_context(|| format!("Invalid cron expression: {}", expr))
}

/// Whether `day` still needs a summary, given the last day aggregated.
///
/// The wait is computed on the wall clock but slept on the monotonic one, so
/// a lagging wall clock can wake before the firing and see it again.
fn is_new_day(last: Option<NaiveDate>, day: NaiveDate) -> bool {
    last.map_or(true, |last| day > last)
}

/// First firing strictly after `now`
pub fn next_firing<Tz: TimeZone>(schedule: &cron::Schedule, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    schedule.after(now).next()
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub locations: Vec<String>,
    pub sweep_interval: Duration,
    pub stagger: Duration,
    pub daily_cron: String,
}

/// Drives periodic sweeps and the daily aggregation
pub struct Scheduler {
    settings: SchedulerSettings,
    daily: cron::Schedule,
    job: IngestJob,
    aggregator: DailyAggregator,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings, job: IngestJob, aggregator: DailyAggregator) -> Result<Self> {
        let daily = parse_cron(&settings.daily_cron)?;
        Ok(Self {
            settings,
            daily,
            job,
            aggregator,
        })
    }

    /// Run both loops until the future is dropped
    pub async fn run(&self) -> Result<()> {
        info!(
            locations = self.settings.locations.len(),
            interval_secs = self.settings.sweep_interval.as_secs(),
            stagger_ms = self.settings.stagger.as_millis() as u64,
            daily = %self.settings.daily_cron,
            "Scheduler started"
        );

        tokio::join!(self.sweep_loop(), self.daily_loop());
        Ok(())
    }

    async fn sweep_loop(&self) {
        let mut ticker = interval(self.settings.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // first tick completes immediately
            ticker.tick().await;
            let handle = run_sweep(&self.settings.locations, self.settings.stagger, &self.job);
            info!(tasks = self.settings.locations.len(), "Sweep started");

            // report in the background; the next tick never waits on this sweep
            tokio::spawn(log_sweep(handle));
        }
    }

    async fn daily_loop(&self) {
        let mut last_day: Option<NaiveDate> = None;
        loop {
            let now = Local::now();
            let Some(next) = next_firing(&self.daily, &now) else {
                warn!(cron = %self.settings.daily_cron, "daily schedule has no further firings");
                return;
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(next = %next, "Daily summary scheduled");
            sleep(wait).await;

            let day = next.date_naive();
            if !is_new_day(last_day, day) {
                debug!(%day, "Daily summary already ran, skipping repeat firing");
                continue;
            }
            last_day = Some(day);

            let aggregator = self.aggregator.clone();
            tokio::spawn(async move {
                match aggregator.run_for_day(day, &Local).await {
                    Ok(report) => info!(
                        %day,
                        persisted = report.persisted.len(),
                        failed = report.failed.len(),
                        "Daily summary complete"
                    ),
                    Err(e) => error!(%day, error = %e, "Error creating daily summary"),
                }
            });
        }
    }
}
