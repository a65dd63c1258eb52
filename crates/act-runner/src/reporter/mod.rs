//! Reporters: side-effect-only consumers of events and final results.
//!
//! A reporter never mutates what it receives. Errors a reporter returns are
//! logged and absorbed so that output problems cannot break a run.

mod database;
mod json;
mod terminal;

pub use self::database::{
    DatabasePayload, DatabaseReporter, PayloadSummary, ResultSink, RuleOutcome, RuleResult,
    ACCESSIBILITY_TEST_TYPE,
};
pub use self::json::{JsonDestination, JsonReport, JsonReporter};
pub use self::terminal::ConsoleReporter;

use crate::event::{ListenerId, TestEvent};
use crate::outcome::SuiteResult;
use crate::result::RunnerResult;
use crate::runner::Runner;
use tracing::warn;

/// Consumer of the event stream and the terminal result set
pub trait Reporter {
    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called for every event, in emission order
    fn on_event(&self, _event: &TestEvent<'_>) -> RunnerResult<()> {
        Ok(())
    }

    /// Called once with the results of a finished run
    fn on_complete(&self, _results: &[SuiteResult]) -> RunnerResult<()> {
        Ok(())
    }
}

impl Runner {
    /// Subscribe `reporter` to this runner's events
    pub fn reporter<R: Reporter + 'static>(&mut self, reporter: R) -> ListenerId {
        self.on(move |event| {
            if let Err(e) = reporter.on_event(event) {
                warn!(reporter = reporter.name(), error = %e, "reporter failed");
            }
            if let TestEvent::Complete { results, .. } = event {
                if let Err(e) = reporter.on_complete(results) {
                    warn!(reporter = reporter.name(), error = %e, "reporter failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::dom::Document;
    use crate::result::RunnerError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counting {
        events: Rc<RefCell<Vec<&'static str>>>,
        completed: Rc<RefCell<usize>>,
    }

    impl Reporter for Counting {
        fn on_event(&self, event: &TestEvent<'_>) -> RunnerResult<()> {
            self.events.borrow_mut().push(event.kind());
            Ok(())
        }

        fn on_complete(&self, results: &[SuiteResult]) -> RunnerResult<()> {
            *self.completed.borrow_mut() += results.len();
            Err(RunnerError::Reporter {
                message: "disk full".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_reporter_sees_events_and_completion() {
        let reporter = Counting::default();
        let events = Rc::clone(&reporter.events);
        let completed = Rc::clone(&reporter.completed);

        let mut runner = Runner::new(RunnerConfig::default());
        runner.registry_mut().describe("doc", |suite| {
            suite.test("ok", |_| Ok(()));
        });
        runner.reporter(reporter);

        let doc = Document::parse("<p>x</p>");
        let results = runner.run(&doc).await;

        assert_eq!(results.len(), 1);
        assert_eq!(
            *events.borrow(),
            vec!["test-start", "test-result", "test-progress", "test-complete"]
        );
        assert_eq!(*completed.borrow(), 1);
    }

    #[test]
    fn test_default_name_is_type_name() {
        struct Quiet;
        impl Reporter for Quiet {}
        assert!(Quiet.name().ends_with("Quiet"));
    }
}
