//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Runtime helpers supporting the controller."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error};

/// Periodic ticker. Ticks that fall due while the previous one is still being
/// handled are dropped rather than replayed in a burst.
#[derive(Debug)]
pub struct RateLimiter {
    interval: tokio::time::Interval,
}

impl RateLimiter {
    /// First tick completes immediately.
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// First tick completes after one full `period`.
    pub fn delayed(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

/// Named set of spawned tasks that are torn down together.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, name: &'static str, fut: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        debug!(task = name, "spawning task");
        self.tasks.push((name, tokio::spawn(fut)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Await every task. Failures are logged and the first one is returned
    /// once all tasks have finished.
    pub async fn join(self) -> Result<()> {
        let mut first_error = None;
        for (name, task) in self.tasks {
            let outcome = match task.await {
                Ok(result) => result,
                Err(err) => Err(anyhow::anyhow!("task join failure: {}", err)),
            };
            if let Err(err) = outcome {
                error!(task = name, error = %err, "task ended with error");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Abort every task without waiting for cooperative shutdown.
    pub fn abort_all(&self) {
        for (name, task) in &self.tasks {
            debug!(task = *name, "aborting task");
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rate_limiter_skips_missed_ticks() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2));
        let start = limiter.tick().await;
        tokio::time::advance(Duration::from_secs(7)).await;
        // One overdue tick fires, the backlog at 4s and 6s is dropped.
        let late = limiter.tick().await;
        assert_eq!(late.duration_since(start), Duration::from_secs(2));
        let next = limiter.tick().await;
        assert_eq!(next.duration_since(start), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_limiter_waits_one_period() {
        let started = Instant::now();
        let mut limiter = RateLimiter::delayed(Duration::from_secs(5));
        let first = limiter.tick().await;
        assert!(first.duration_since(started) >= Duration::from_secs(5));
        assert_eq!(limiter.period(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn task_set_reports_first_failure() {
        let mut tasks = TaskSet::new();
        tasks.spawn("ok", async { Ok(()) });
        tasks.spawn("fails", async { Err(anyhow::anyhow!("boom")) });
        assert_eq!(tasks.len(), 2);
        let err = tasks.join().await.expect_err("failure should surface");
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn aborted_tasks_are_reported_as_join_failures() {
        let mut tasks = TaskSet::new();
        tasks.spawn("forever", async {
            std::future::pending::<()>().await;
            Ok(())
        });
        tasks.abort_all();
        assert!(tasks.join().await.is_err());
    }
}
