//! act-runner: In-Page Accessibility Test Runner
//!
//! Runs ACT rule suites against a page: each suite is scoped by a CSS
//! selector, every matched element is tested in document order, and each
//! (element, test) pair yields exactly one outcome. Failures are data; a
//! run always resolves with one [`SuiteResult`] per selected suite.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    act-runner Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Registry   │    │ Runner     │    │ Document   │            │
//! │   │ describe / │───►│ core +     │───►│ (scraper + │            │
//! │   │ test       │    │ middleware │    │  layout)   │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           │ TestEvent                            │
//! │            ┌──────────────┼──────────────┐                      │
//! │            ▼              ▼              ▼                      │
//! │      ┌──────────┐   ┌──────────┐   ┌──────────┐                 │
//! │      │ Plugins  │   │Reporters │   │ Host UI  │                 │
//! │      └──────────┘   └──────────┘   └──────────┘                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use act_runner::prelude::*;
//!
//! let mut runner = Runner::new(RunnerConfig::default());
//! runner.registry_mut().describe_scoped("image-alt", "img", |suite| {
//!     suite.test("has alt", |ctx| {
//!         expect_element(ctx.element).to_have_attribute("alt")?;
//!         Ok(())
//!     });
//! });
//! runner.reporter(ConsoleReporter::default());
//!
//! let page = Document::parse(r#"<img src="a.png" alt="x"><img src="b.png">"#);
//! let results = runner.run_blocking(&page)?;
//! assert_eq!(results[0].failed, 1);
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod config;
pub mod context;
pub mod dom;
pub mod event;
pub mod expect;
pub mod outcome;
pub mod plugin;
pub mod registry;
pub mod reporter;
mod result;
pub mod rules;
pub mod runner;
pub mod selector;
pub mod visibility;

pub use config::{AfterEachPolicy, RunnerConfig, RunnerConfigBuilder};
pub use context::{Interrupt, TestContext, TestError, TestFnResult};
pub use dom::{compile_selector, BoundingBox, ComputedStyle, Document, Element, Viewport};
pub use event::{EventBus, ListenerId, TestEvent};
pub use expect::{
    expect, expect_element, ElementExpectation, Expectation, ExpectationError, ExpectationResult,
};
pub use outcome::{
    ElementInfo, FailureInfo, FailureKind, Outcome, RunSummary, SuiteResult, TestResult,
};
pub use plugin::{
    FnMiddleware, HighlightPlugin, HighlightStyle, HighlightTarget, Highlighter, MetricsHandle,
    MetricsPlugin, Middleware, Next, Plugin, RunMetrics,
};
pub use registry::{Registry, SuiteBuilder, TestDefinition, TestFn, TestSuite};
pub use reporter::{
    ConsoleReporter, DatabasePayload, DatabaseReporter, JsonDestination, JsonReporter, Reporter,
    ResultSink,
};
pub use result::{RunnerError, RunnerResult};
pub use runner::{Runner, RunnerState, DEFAULT_SELECTOR};
pub use selector::generate_selector;
pub use visibility::{
    get_visibility_ratio, is_element_visible, is_in_viewport, is_partially_in_viewport,
};

/// Install a `tracing-subscriber` fmt subscriber honouring `RUST_LOG`.
///
/// Defaults to `info` when `RUST_LOG` is unset. Calling it again, or after
/// the host installed its own subscriber, is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}

/// Prelude for convenient imports
pub mod prelude {
    pub use super::config::*;
    pub use super::context::*;
    pub use super::dom::{Document, Element};
    pub use super::event::*;
    pub use super::expect::*;
    pub use super::outcome::*;
    pub use super::plugin::*;
    pub use super::registry::*;
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::selector::*;
    pub use super::visibility::*;
    pub use futures::FutureExt;
}
