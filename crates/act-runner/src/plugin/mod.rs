//! Plugins and the `run()` middleware chain.
//!
//! A plugin is installed once against a [`Runner`] and may subscribe to the
//! event stream, wrap `run()` with a [`Middleware`], or both. Wrappers
//! compose outer-around-inner: the last one registered sees the call
//! first and reaches the runner core through [`Next::run`].
//!
//! ```ignore
//! runner
//!     .plugin(MetricsPlugin::new())
//!     .plugin(|runner: &mut Runner| {
//!         runner.on(|event| tracing::debug!(kind = event.kind(), "event"));
//!     });
//! ```

mod highlight;
mod metrics;

pub use highlight::{HighlightPlugin, HighlightStyle, HighlightTarget, Highlighter};
pub use metrics::{MetricsHandle, MetricsPlugin, RunMetrics, SlowTest};

use crate::dom::Document;
use crate::outcome::SuiteResult;
use crate::runner::Runner;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::fmt;
use std::rc::Rc;

/// Extension installed into a [`Runner`]
pub trait Plugin {
    /// Install into `runner`; called exactly once
    fn install(self, runner: &mut Runner);
}

impl<F> Plugin for F
where
    F: FnOnce(&mut Runner),
{
    fn install(self, runner: &mut Runner) {
        self(runner);
    }
}

/// Interceptor around `run()`.
///
/// Implementations must call [`Next::run`] at most once and should return
/// its results unchanged unless they deliberately filter them.
pub trait Middleware {
    /// Handle one `run()` call
    fn handle<'a>(&'a self, next: Next<'a>) -> LocalBoxFuture<'a, Vec<SuiteResult>>;
}

/// Closure-based middleware
pub struct FnMiddleware<F> {
    handler: F,
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(Next<'a>) -> LocalBoxFuture<'a, Vec<SuiteResult>>,
{
    /// Create a middleware from a closure
    #[must_use]
    pub const fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(Next<'a>) -> LocalBoxFuture<'a, Vec<SuiteResult>>,
{
    fn handle<'a>(&'a self, next: Next<'a>) -> LocalBoxFuture<'a, Vec<SuiteResult>> {
        (self.handler)(next)
    }
}

/// Remainder of the middleware chain for one `run()` call
pub struct Next<'a> {
    runner: &'a Runner,
    document: &'a Document,
    chain: &'a [Rc<dyn Middleware>],
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.chain.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Next<'a> {
    pub(crate) const fn new(
        runner: &'a Runner,
        document: &'a Document,
        chain: &'a [Rc<dyn Middleware>],
    ) -> Self {
        Self {
            runner,
            document,
            chain,
        }
    }

    /// Page the run targets
    #[must_use]
    pub const fn document(&self) -> &'a Document {
        self.document
    }

    /// Runner being driven
    #[must_use]
    pub const fn runner(&self) -> &'a Runner {
        self.runner
    }

    /// Middleware still between this point and the runner core
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Continue inward: the next wrapper, or the runner core when none is left
    pub fn run(self) -> LocalBoxFuture<'a, Vec<SuiteResult>> {
        match self.chain.split_last() {
            Some((outer, inner)) => outer.handle(Next {
                chain: inner,
                ..self
            }),
            None => self.runner.execute(self.document).boxed_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use std::cell::RefCell;

    fn tracing_middleware(
        tag: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    ) -> impl Middleware {
        FnMiddleware::new(move |next: Next<'_>| {
            let log = Rc::clone(&log);
            async move {
                log.borrow_mut().push(format!("{tag}:before"));
                let results = next.run().await;
                log.borrow_mut().push(format!("{tag}:after"));
                results
            }
            .boxed_local()
        })
    }

    #[tokio::test]
    async fn test_last_registered_runs_outermost() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut runner = Runner::new(RunnerConfig::default());
        runner.wrap(tracing_middleware("first", Rc::clone(&log)));
        runner.wrap(tracing_middleware("second", Rc::clone(&log)));

        let doc = Document::parse("<p>x</p>");
        runner.run(&doc).await;

        assert_eq!(
            *log.borrow(),
            vec!["second:before", "first:before", "first:after", "second:after"]
        );
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let mut runner = Runner::new(RunnerConfig::default());
        runner.registry_mut().describe("never", |suite| {
            suite.test("t", |_| Ok(()));
        });
        runner.wrap(FnMiddleware::new(|_next: Next<'_>| {
            futures::future::ready(Vec::new()).boxed_local()
        }));

        let doc = Document::parse("<p>x</p>");
        let results = runner.run(&doc).await;
        assert!(results.is_empty());
        assert_eq!(runner.state(), crate::runner::RunnerState::Idle);
    }

    #[test]
    fn test_closure_plugin_installs() {
        let mut runner = Runner::new(RunnerConfig::default());
        runner.plugin(|runner: &mut Runner| {
            runner.on(|_| {});
        });
        assert_eq!(runner.events().len(), 1);
    }

    #[tokio::test]
    async fn test_next_exposes_document() {
        let seen = Rc::new(RefCell::new(None));
        let mut runner = Runner::new(RunnerConfig::default());
        let slot = Rc::clone(&seen);
        runner.wrap(FnMiddleware::new(move |next: Next<'_>| {
            *slot.borrow_mut() = Some((next.document().url().map(str::to_string), next.remaining()));
            next.run()
        }));

        let doc = Document::parse("<p>x</p>").with_url("https://example.test/");
        runner.run(&doc).await;
        assert_eq!(
            *seen.borrow(),
            Some((Some("https://example.test/".to_string()), 0))
        );
    }
}
