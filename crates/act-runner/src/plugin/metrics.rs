//! Run metrics collected by wrapping `run()`.

use super::{Middleware, Next, Plugin};
use crate::outcome::{RunSummary, SuiteResult};
use crate::runner::Runner;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::info;

/// Slowest single (element, test) execution seen so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlowTest {
    /// Suite name
    pub suite: String,
    /// Test name
    pub name: String,
    /// Execution time
    #[serde(with = "crate::outcome::duration_ms")]
    pub duration: Duration,
}

/// Accumulated metrics across runs
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    /// Completed `run()` calls
    pub runs: usize,
    /// Wall time of all runs
    #[serde(with = "crate::outcome::duration_ms")]
    pub total_wall: Duration,
    /// Wall time of the most recent run
    #[serde(with = "crate::outcome::duration_ms")]
    pub last_wall: Duration,
    /// Outcome totals summed over runs
    pub totals: RunSummary,
    /// Slowest execution over all runs
    pub slowest: Option<SlowTest>,
}

impl RunMetrics {
    fn record(&mut self, results: &[SuiteResult], wall: Duration) {
        self.runs += 1;
        self.total_wall += wall;
        self.last_wall = wall;

        let run = RunSummary::from_results(results);
        let totals = &mut self.totals;
        totals.suites += run.suites;
        totals.total += run.total;
        totals.passed += run.passed;
        totals.failed += run.failed;
        totals.skipped += run.skipped;
        totals.todo += run.todo;
        totals.timeout += run.timeout;
        totals.errored_suites += run.errored_suites;

        let slowest_now = results
            .iter()
            .flat_map(|suite| suite.tests.iter())
            .max_by_key(|test| test.duration);
        if let Some(test) = slowest_now {
            let beats = self
                .slowest
                .as_ref()
                .map_or(true, |current| test.duration > current.duration);
            if beats {
                self.slowest = Some(SlowTest {
                    suite: test.suite.clone(),
                    name: test.name.clone(),
                    duration: test.duration,
                });
            }
        }
    }

    /// Mean wall time per run
    #[must_use]
    pub fn mean_wall(&self) -> Duration {
        if self.runs == 0 {
            return Duration::ZERO;
        }
        self.total_wall / self.runs as u32
    }
}

/// Shared read handle onto the metrics a [`MetricsPlugin`] collects
#[derive(Debug, Clone, Default)]
pub struct MetricsHandle {
    inner: Rc<RefCell<RunMetrics>>,
}

impl MetricsHandle {
    /// Borrow the current metrics
    #[must_use]
    pub fn get(&self) -> Ref<'_, RunMetrics> {
        self.inner.borrow()
    }

    /// Copy of the current metrics
    #[must_use]
    pub fn snapshot(&self) -> RunMetrics {
        self.inner.borrow().clone()
    }

    /// Forget everything recorded
    pub fn reset(&self) {
        *self.inner.borrow_mut() = RunMetrics::default();
    }
}

/// Middleware recording wall time and outcome totals of every run
#[derive(Debug, Clone, Default)]
pub struct MetricsPlugin {
    shared: MetricsHandle,
}

impl MetricsPlugin {
    /// Create a plugin with fresh metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that stays valid after the plugin is installed
    #[must_use]
    pub fn metrics(&self) -> MetricsHandle {
        self.shared.clone()
    }
}

impl Middleware for MetricsPlugin {
    fn handle<'a>(&'a self, next: Next<'a>) -> LocalBoxFuture<'a, Vec<SuiteResult>> {
        async move {
            let started = Instant::now();
            let results = next.run().await;
            let wall = started.elapsed();
            let mut metrics = self.shared.inner.borrow_mut();
            metrics.record(&results, wall);
            info!(
                runs = metrics.runs,
                wall_ms = wall.as_millis() as u64,
                "metrics recorded"
            );
            drop(metrics);
            results
        }
        .boxed_local()
    }
}

impl Plugin for MetricsPlugin {
    fn install(self, runner: &mut Runner) {
        runner.wrap(self);
    }
}
