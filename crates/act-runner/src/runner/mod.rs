//! Runner core.
//!
//! ```text
//!   idle ──run()──► running ──► complete
//!                      │
//!                      └──────► error   (internal panic outside test code)
//! ```
//!
//! `run()` reads the registry at call time, queries the document fresh for
//! every test, executes (element, test) pairs sequentially in registration
//! and document order, and resolves with one [`SuiteResult`] per selected
//! suite. Test failures are data; `run()` never errors.

mod exec;

use crate::config::RunnerConfig;
use crate::dom::Document;
use crate::event::{now_millis, EventBus, ListenerId, TestEvent};
use crate::outcome::SuiteResult;
use crate::plugin::{Middleware, Next, Plugin};
use crate::registry::Registry;
use crate::result::RunnerResult;
use futures::FutureExt;
use std::cell::Cell;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

pub(crate) use exec::panic_message;

/// Selector used when neither the test nor its suite declares one
pub const DEFAULT_SELECTOR: &str = "html";

/// Lifecycle state of a [`Runner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunnerState {
    /// Never run
    #[default]
    Idle,
    /// A run is in flight
    Running,
    /// Last run finished
    Complete,
    /// Last run hit an internal failure
    Error,
}

/// Orchestrates suites from a [`Registry`] against a [`Document`]
pub struct Runner {
    registry: Registry,
    config: RunnerConfig,
    events: EventBus,
    middleware: Vec<Rc<dyn Middleware>>,
    state: Cell<RunnerState>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("events", &self.events)
            .field("middleware", &self.middleware.len())
            .field("state", &self.state.get())
            .finish()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl Runner {
    /// Create a runner with an empty registry
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_registry(Registry::new(), config)
    }

    /// Create a runner that owns `registry`
    #[must_use]
    pub fn with_registry(registry: Registry, config: RunnerConfig) -> Self {
        Self {
            registry,
            config,
            events: EventBus::new(),
            middleware: Vec::new(),
            state: Cell::new(RunnerState::Idle),
        }
    }

    /// Registered suites
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registration access
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Reset the registry for the next registration cycle
    pub fn clear(&mut self) {
        self.registry.clear();
    }

    /// Configuration
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> RunnerState {
        self.state.get()
    }

    /// Event bus
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to the event stream
    pub fn on<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&TestEvent<'_>) + 'static,
    {
        self.events.on(listener)
    }

    /// Unsubscribe from the event stream
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Install a plugin; plugins install in call order
    pub fn plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        plugin.install(self);
        self
    }

    /// Wrap `run()`; the last wrapper registered runs outermost
    pub fn wrap<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Rc::new(middleware));
        self
    }

    /// Number of installed middleware
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Run every selected suite against `document`.
    ///
    /// Never fails: test failures are recorded in the results, and an
    /// internal panic leaves the runner in [`RunnerState::Error`] with an
    /// empty result set and a `test-error` event.
    pub async fn run(&self, document: &Document) -> Vec<SuiteResult> {
        let chain = Next::new(self, document, &self.middleware);
        match AssertUnwindSafe(chain.run()).catch_unwind().await {
            Ok(results) => results,
            Err(payload) => {
                let message = format!("internal runner failure: {}", panic_message(&*payload));
                tracing::error!(%message, "run aborted");
                self.state.set(RunnerState::Error);
                self.emit(&TestEvent::Error {
                    timestamp: now_millis(),
                    suite: None,
                    message: &message,
                });
                Vec::new()
            }
        }
    }

    /// Drive [`run`](Self::run) to completion on a current-thread runtime
    pub fn run_blocking(&self, document: &Document) -> RunnerResult<Vec<SuiteResult>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        Ok(runtime.block_on(self.run(document)))
    }

    pub(crate) fn emit(&self, event: &TestEvent<'_>) {
        self.events.emit(event);
    }

    pub(crate) fn set_state(&self, state: RunnerState) {
        self.state.set(state);
    }
}
