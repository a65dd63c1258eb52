//! Suite and test execution.

use super::{Runner, RunnerState, DEFAULT_SELECTOR};
use crate::config::AfterEachPolicy;
use crate::context::{Interrupt, TestContext, TestError, TestFnResult};
use crate::dom::{compile_selector, Document, Element};
use crate::event::{now_millis, TestEvent};
use crate::outcome::{ElementInfo, FailureInfo, FailureKind, RunSummary, SuiteResult, TestResult};
use crate::registry::{SelectedSuite, TestDefinition, TestFn, TestSuite};
use futures::FutureExt;
use scraper::Selector;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a body or hook settled
enum Settled {
    Returned(TestFnResult),
    Panicked(String),
    TimedOut,
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// What the `before_each` hook left for the body
enum BeforeEach {
    Proceed,
    Finish(Settled),
    Failed(FailureInfo),
}

struct PlannedTest<'s> {
    test: &'s TestDefinition,
    selector: &'s str,
    compiled: Selector,
}

impl Runner {
    /// The innermost `run()`: everything below the middleware chain
    pub(crate) async fn execute(&self, document: &Document) -> Vec<SuiteResult> {
        if self.state() == RunnerState::Running {
            let message = "run() called while a run is already in progress";
            warn!("{message}");
            self.emit(&TestEvent::Error {
                timestamp: now_millis(),
                suite: None,
                message,
            });
            return Vec::new();
        }
        self.set_state(RunnerState::Running);

        let started = Instant::now();
        let selected = self.registry().selected();
        let total = selected.len();
        info!(suites = total, timeout_ms = self.config().timeout_ms, "run started");
        self.emit(&TestEvent::Start {
            timestamp: now_millis(),
            suites: total,
        });

        let mut results: Vec<SuiteResult> = Vec::with_capacity(total);
        for selected_suite in &selected {
            let (suite_result, bailed) = self.run_suite(document, selected_suite).await;
            results.push(suite_result);
            if let Some(finished) = results.last() {
                self.emit(&TestEvent::Progress {
                    timestamp: now_millis(),
                    suite: finished,
                    completed: results.len(),
                    total,
                });
            }
            if bailed {
                info!(suite = %selected_suite.suite.name, "bail: abandoning remaining tests");
                break;
            }
        }

        self.set_state(RunnerState::Complete);
        let summary = RunSummary::from_results(&results);
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            todo = summary.todo,
            timeout = summary.timeout,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run complete"
        );
        self.emit(&TestEvent::Complete {
            timestamp: now_millis(),
            results: &results,
        });
        results
    }

    /// Run one suite; the flag reports whether `bail` stopped the run
    async fn run_suite(&self, document: &Document, selected: &SelectedSuite<'_>) -> (SuiteResult, bool) {
        let suite = selected.suite;
        let started = Instant::now();

        let plan = match plan_suite(suite, selected) {
            Ok(plan) => plan,
            Err(message) => {
                warn!(suite = %suite.name, %message, "suite contributes no results");
                self.emit(&TestEvent::Error {
                    timestamp: now_millis(),
                    suite: Some(&suite.name),
                    message: &message,
                });
                return (SuiteResult::errored(&suite.name, message, started.elapsed()), false);
            }
        };

        let mut tests = Vec::new();
        let mut hook_failures = 0;
        let mut bailed = false;

        'tests: for planned in &plan {
            let elements = document.select(&planned.compiled);
            debug!(
                suite = %suite.name,
                test = %planned.test.name,
                selector = planned.selector,
                matched = elements.len(),
                "resolved elements"
            );
            for element in elements {
                let (result, after_each_failed) = self
                    .execute_test(document, suite, planned, element)
                    .await;
                hook_failures += usize::from(after_each_failed);
                let failed = result.outcome.is_fail();
                tests.push(result);
                if let Some(recorded) = tests.last() {
                    self.emit(&TestEvent::Result {
                        timestamp: now_millis(),
                        suite: &suite.name,
                        result: recorded,
                        element: Some(element),
                    });
                }
                if failed && self.config().bail {
                    bailed = true;
                    break 'tests;
                }
            }
        }

        let mut result = SuiteResult::from_tests(&suite.name, tests, started.elapsed());
        if self.config().after_each_policy == AfterEachPolicy::Count {
            result.hook_failures = hook_failures;
        }
        (result, bailed)
    }

    /// Execute one (element, test) pair; the flag reports an `after_each` failure
    async fn execute_test<'d>(
        &self,
        document: &'d Document,
        suite: &TestSuite,
        planned: &PlannedTest<'_>,
        element: Element<'d>,
    ) -> (TestResult, bool) {
        let test = planned.test;
        let started = Instant::now();
        let info = self
            .config()
            .store_element_info
            .then(|| ElementInfo::capture(&element, self.config()));

        if test.skip {
            return (TestResult::skip(&suite.name, &test.name).with_element(info), false);
        }
        if test.todo {
            let result = TestResult::todo(&suite.name, &test.name, test.todo_reason.as_deref());
            return (result.with_element(info), false);
        }

        let ctx = TestContext::new(element, planned.selector, document);

        let timeout_ms = self.config().timeout_ms;
        let before = match &suite.before_each {
            None => BeforeEach::Proceed,
            Some(hook) => match self.invoke(hook, &ctx).await {
                Settled::Returned(Ok(())) if ctx.interrupt().is_none() => BeforeEach::Proceed,
                settled @ Settled::Returned(Ok(()) | Err(TestError::Skipped | TestError::Todo(_))) => {
                    BeforeEach::Finish(settled)
                }
                _ if ctx.interrupt().is_some() => BeforeEach::Finish(Settled::Returned(Ok(()))),
                settled => BeforeEach::Failed(describe_failure(settled, timeout_ms)),
            },
        };

        let result = match before {
            BeforeEach::Proceed => {
                let settled = self.invoke(&test.func, &ctx).await;
                classify(suite, test, &ctx, settled, timeout_ms)
            }
            BeforeEach::Finish(settled) => classify(suite, test, &ctx, settled, timeout_ms),
            BeforeEach::Failed(failure) => {
                let failure = FailureInfo::new(
                    FailureKind::Hook,
                    format!("beforeEach hook failed: {}", failure.message),
                );
                TestResult::fail(&suite.name, &test.name, failure)
            }
        };

        let after_each_failed = match &suite.after_each {
            Some(hook) => match self.invoke(hook, &ctx).await {
                Settled::Returned(Ok(()) | Err(TestError::Skipped | TestError::Todo(_))) => false,
                settled => {
                    let failure = describe_failure(settled, timeout_ms);
                    warn!(
                        suite = %suite.name,
                        test = %test.name,
                        message = %failure.message,
                        "afterEach hook failed"
                    );
                    true
                }
            },
            None => false,
        };

        debug!(
            suite = %suite.name,
            test = %test.name,
            outcome = %result.outcome,
            "test finished"
        );
        let result = result.with_duration(started.elapsed()).with_element(info);
        (result, after_each_failed)
    }

    /// Race a body or hook against the configured timeout, capturing panics
    async fn invoke(&self, func: &TestFn, ctx: &TestContext<'_>) -> Settled {
        let body = AssertUnwindSafe(async { func(ctx).await }).catch_unwind();
        match tokio::time::timeout(self.config().timeout(), body).await {
            Err(_) => Settled::TimedOut,
            Ok(Err(payload)) => Settled::Panicked(panic_message(&*payload)),
            Ok(Ok(returned)) => Settled::Returned(returned),
        }
    }
}

/// Compile every selector of the suite before anything in it runs
fn plan_suite<'s>(
    suite: &'s TestSuite,
    selected: &SelectedSuite<'s>,
) -> Result<Vec<PlannedTest<'s>>, String> {
    selected
        .iter()
        .map(|test| {
            let selector = suite.effective_selector(test).unwrap_or(DEFAULT_SELECTOR);
            compile_selector(selector)
                .map(|compiled| PlannedTest {
                    test,
                    selector,
                    compiled,
                })
                .map_err(|e| e.to_string())
        })
        .collect()
}

fn describe_failure(settled: Settled, timeout_ms: u64) -> FailureInfo {
    match settled {
        Settled::Returned(Ok(())) => FailureInfo::new(FailureKind::Error, "completed"),
        Settled::Returned(Err(TestError::Expectation(e))) => {
            FailureInfo::new(FailureKind::Assertion, e.message)
        }
        Settled::Returned(Err(other)) => FailureInfo::new(FailureKind::Error, other.to_string()),
        Settled::Panicked(message) => FailureInfo::new(FailureKind::Panic, message),
        Settled::TimedOut => {
            FailureInfo::new(FailureKind::Timeout, format!("Test timed out after {timeout_ms}ms"))
        }
    }
}

/// Map how the body settled to a terminal result.
///
/// An interrupt recorded on the context takes precedence over everything
/// the body did afterwards.
fn classify(
    suite: &TestSuite,
    test: &TestDefinition,
    ctx: &TestContext<'_>,
    settled: Settled,
    timeout_ms: u64,
) -> TestResult {
    match ctx.interrupt() {
        Some(Interrupt::Skip) => return TestResult::skip(&suite.name, &test.name),
        Some(Interrupt::Todo(reason)) => {
            return TestResult::todo(&suite.name, &test.name, reason.as_deref())
        }
        None => {}
    }
    match settled {
        Settled::Returned(Ok(())) => TestResult::pass(&suite.name, &test.name),
        Settled::Returned(Err(TestError::Skipped)) => TestResult::skip(&suite.name, &test.name),
        Settled::Returned(Err(TestError::Todo(reason))) => {
            TestResult::todo(&suite.name, &test.name, reason.as_deref())
        }
        failed => TestResult::fail(&suite.name, &test.name, describe_failure(failed, timeout_ms)),
    }
}
