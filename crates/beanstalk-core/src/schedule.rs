//! One-shot and cron-driven execution of a full run.

use crate::config::CronConfig;
use crate::error::Result;
use crate::jitter::{JitterSource, Sleeper};
use crate::notify::{NotificationSink, TITLE};
use crate::orchestrator::AccountOrchestrator;
use crate::summary::RunSession;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::watch;

/// Next fire time strictly after `now`, evaluated in `tz`.
pub fn next_fire(schedule: &cron::Schedule, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule
        .after(&now.with_timezone(&tz))
        .next()
        .map(|t| t.with_timezone(&Utc))
}

pub struct ScheduleDriver {
    orchestrator: AccountOrchestrator,
    notifier: Arc<dyn NotificationSink>,
    sleeper: Arc<dyn Sleeper>,
    cron: CronConfig,
}

impl ScheduleDriver {
    pub fn new(
        orchestrator: AccountOrchestrator,
        notifier: Arc<dyn NotificationSink>,
        sleeper: Arc<dyn Sleeper>,
        cron: CronConfig,
    ) -> Self {
        Self {
            orchestrator,
            notifier,
            sleeper,
            cron,
        }
    }

    /// Process every account once, then deliver the run message.
    pub async fn run_once(&self) -> RunSession {
        let session = self.orchestrator.run_all().await;
        tracing::info!(
            lines = session.lines().len(),
            failed_accounts = session.failed_accounts(),
            "run finished"
        );
        if let Err(e) = self.notifier.send(TITLE, &session.message()).await {
            tracing::warn!(error = %e, "could not deliver run message");
        }
        session
    }

    /// Run at every fire time of the configured cron expression until
    /// `shutdown` turns true or its sender is dropped.
    ///
    /// Each fire is optionally delayed by a whole-run jitter. Returns the
    /// number of completed runs.
    pub async fn run_periodic(&self, mut shutdown: watch::Receiver<bool>) -> Result<usize> {
        let schedule = self.cron.schedule()?;
        let tz = self.cron.tz()?;
        let jitter = JitterSource::new();
        let mut runs = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = Utc::now();
            let Some(next) = next_fire(&schedule, tz, now) else {
                tracing::warn!(expression = %self.cron.expression, "cron expression has no further fire times");
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(next = %next.with_timezone(&tz), "waiting for next run");

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            let delay = jitter.sample(&self.cron.jitter);
            if delay > 0 {
                tracing::info!(secs = delay, "delaying run");
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = self.sleeper.sleep(delay) => {}
                }
            }

            self.run_once().await;
            runs += 1;
        }

        tracing::info!(runs, "scheduler stopped");
        Ok(runs)
    }
}
