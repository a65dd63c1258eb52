//! Test registry: suites, tests, hooks and modifiers.
//!
//! Suites are appended during a registration phase and read by the runner
//! at `run()` time. Names need not be unique; results are keyed by
//! execution order.
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.describe_scoped("image-alt", "img", |suite| {
//!     suite.test("has alt", |ctx| {
//!         expect_element(ctx.element).to_have_attribute("alt")?;
//!         Ok(())
//!     });
//! });
//! ```

use crate::context::{TestContext, TestFnResult};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::fmt;
use std::rc::Rc;

/// Test body or hook, already boxed into its async form
pub type TestFn = Rc<dyn for<'a> Fn(&'a TestContext<'a>) -> LocalBoxFuture<'a, TestFnResult>>;

fn boxed<F>(f: F) -> TestFn
where
    F: for<'a> Fn(&'a TestContext<'a>) -> LocalBoxFuture<'a, TestFnResult> + 'static,
{
    Rc::new(f)
}

/// Lift a synchronous body into a [`TestFn`]
pub fn sync_fn<F>(f: F) -> TestFn
where
    F: Fn(&TestContext<'_>) -> TestFnResult + 'static,
{
    boxed(move |ctx| future::ready(f(ctx)).boxed_local())
}

/// Wrap an async body into a [`TestFn`]
pub fn async_fn<F>(f: F) -> TestFn
where
    F: for<'a> Fn(&'a TestContext<'a>) -> LocalBoxFuture<'a, TestFnResult> + 'static,
{
    boxed(f)
}

/// A registered test
#[derive(Clone)]
pub struct TestDefinition {
    /// Test name
    pub name: String,
    /// Selector overriding the suite selector
    pub selector: Option<String>,
    /// Registered as skipped
    pub skip: bool,
    /// Registered as todo
    pub todo: bool,
    /// Reason given for todo
    pub todo_reason: Option<String>,
    /// Exclusive execution marker
    pub only: bool,
    pub(crate) func: TestFn,
}

impl fmt::Debug for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("skip", &self.skip)
            .field("todo", &self.todo)
            .field("only", &self.only)
            .finish_non_exhaustive()
    }
}

impl TestDefinition {
    /// Create a test definition
    #[must_use]
    pub fn new(name: impl Into<String>, func: TestFn) -> Self {
        Self {
            name: name.into(),
            selector: None,
            skip: false,
            todo: false,
            todo_reason: None,
            only: false,
            func,
        }
    }

    /// Scope this test to its own selector
    pub fn with_selector(&mut self, selector: impl Into<String>) -> &mut Self {
        self.selector = Some(selector.into());
        self
    }

    /// Mark for exclusive execution
    pub fn mark_only(&mut self) -> &mut Self {
        self.only = true;
        self
    }

    /// Mark as skipped
    pub fn mark_skip(&mut self) -> &mut Self {
        self.skip = true;
        self
    }

    /// Mark as todo
    pub fn mark_todo(&mut self, reason: Option<&str>) -> &mut Self {
        self.todo = true;
        self.todo_reason = reason.map(str::to_string);
        self
    }
}

/// A registered suite
#[derive(Clone, Default)]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    /// Tests in registration order
    pub tests: Vec<TestDefinition>,
    /// Default selector for contained tests
    pub selector: Option<String>,
    /// Exclusive execution marker
    pub only: bool,
    pub(crate) before_each: Option<TestFn>,
    pub(crate) after_each: Option<TestFn>,
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("tests", &self.tests)
            .field("selector", &self.selector)
            .field("only", &self.only)
            .field("before_each", &self.before_each.is_some())
            .field("after_each", &self.after_each.is_some())
            .finish()
    }
}

impl TestSuite {
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the suite selector
    pub fn with_selector(&mut self, selector: impl Into<String>) -> &mut Self {
        self.selector = Some(selector.into());
        self
    }

    /// Mark for exclusive execution
    pub fn mark_only(&mut self) -> &mut Self {
        self.only = true;
        self
    }

    /// Get the number of tests
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Effective selector for `test`: the test's own, else the suite's
    #[must_use]
    pub fn effective_selector<'s>(&'s self, test: &'s TestDefinition) -> Option<&'s str> {
        test.selector.as_deref().or(self.selector.as_deref())
    }
}

/// Setup context handed to `describe`
#[derive(Debug)]
pub struct SuiteBuilder {
    suite: TestSuite,
}

impl SuiteBuilder {
    fn push(&mut self, test: TestDefinition) -> &mut TestDefinition {
        self.suite.tests.push(test);
        let last = self.suite.tests.len() - 1;
        &mut self.suite.tests[last]
    }

    /// Set the suite selector
    pub fn selector(&mut self, selector: impl Into<String>) -> &mut Self {
        self.suite.with_selector(selector);
        self
    }

    /// Register a synchronous test
    pub fn test<F>(&mut self, name: impl Into<String>, f: F) -> &mut TestDefinition
    where
        F: Fn(&TestContext<'_>) -> TestFnResult + 'static,
    {
        self.push(TestDefinition::new(name, sync_fn(f)))
    }

    /// Register an async test
    pub fn test_async<F>(&mut self, name: impl Into<String>, f: F) -> &mut TestDefinition
    where
        F: for<'a> Fn(&'a TestContext<'a>) -> LocalBoxFuture<'a, TestFnResult> + 'static,
    {
        self.push(TestDefinition::new(name, async_fn(f)))
    }

    /// Register an exclusive test (`test.only`)
    pub fn test_only<F>(&mut self, name: impl Into<String>, f: F) -> &mut TestDefinition
    where
        F: Fn(&TestContext<'_>) -> TestFnResult + 'static,
    {
        self.test(name, f).mark_only()
    }

    /// Register a skipped test (`test.skip`)
    pub fn skip<F>(&mut self, name: impl Into<String>, f: F) -> &mut TestDefinition
    where
        F: Fn(&TestContext<'_>) -> TestFnResult + 'static,
    {
        self.test(name, f).mark_skip()
    }

    /// Register a todo placeholder (`test.todo`)
    pub fn todo(&mut self, name: impl Into<String>, reason: Option<&str>) -> &mut TestDefinition {
        self.test(name, |_| Ok(())).mark_todo(reason)
    }

    /// Hook run before every (element, test) invocation
    pub fn before_each<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&TestContext<'_>) -> TestFnResult + 'static,
    {
        self.suite.before_each = Some(sync_fn(f));
        self
    }

    /// Async form of [`before_each`](Self::before_each)
    pub fn before_each_async<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a TestContext<'a>) -> LocalBoxFuture<'a, TestFnResult> + 'static,
    {
        self.suite.before_each = Some(async_fn(f));
        self
    }

    /// Hook run after every (element, test) invocation, whatever the outcome
    pub fn after_each<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&TestContext<'_>) -> TestFnResult + 'static,
    {
        self.suite.after_each = Some(sync_fn(f));
        self
    }

    /// Async form of [`after_each`](Self::after_each)
    pub fn after_each_async<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a TestContext<'a>) -> LocalBoxFuture<'a, TestFnResult> + 'static,
    {
        self.suite.after_each = Some(async_fn(f));
        self
    }
}

/// A suite together with the tests the only-filter selected from it
#[derive(Debug, Clone, Copy)]
pub struct SelectedSuite<'r> {
    /// The suite
    pub suite: &'r TestSuite,
    /// Tests to execute, registration order preserved
    pub tests: &'r [TestDefinition],
    only_tests: bool,
}

impl<'r> SelectedSuite<'r> {
    /// Iterate the selected tests
    pub fn iter(&self) -> impl Iterator<Item = &'r TestDefinition> + 'r {
        let only_tests = self.only_tests;
        let tests: &'r [TestDefinition] = self.tests;
        tests.iter().filter(move |t| !only_tests || t.only)
    }

    /// Number of selected tests
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether nothing was selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory model of registered suites
#[derive(Debug, Clone, Default)]
pub struct Registry {
    suites: Vec<TestSuite>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a suite by running `setup` against a fresh builder
    pub fn describe<F>(&mut self, name: impl Into<String>, setup: F) -> &mut TestSuite
    where
        F: FnOnce(&mut SuiteBuilder),
    {
        let mut builder = SuiteBuilder {
            suite: TestSuite::new(name),
        };
        setup(&mut builder);
        self.suites.push(builder.suite);
        let last = self.suites.len() - 1;
        &mut self.suites[last]
    }

    /// Register a suite scoped to `selector`
    pub fn describe_scoped<F>(
        &mut self,
        name: impl Into<String>,
        selector: impl Into<String>,
        setup: F,
    ) -> &mut TestSuite
    where
        F: FnOnce(&mut SuiteBuilder),
    {
        let selector = selector.into();
        self.describe(name, |suite| {
            suite.selector(selector);
            setup(suite);
        })
    }

    /// Register an exclusive suite (`describe.only`)
    pub fn describe_only<F>(&mut self, name: impl Into<String>, setup: F) -> &mut TestSuite
    where
        F: FnOnce(&mut SuiteBuilder),
    {
        self.describe(name, setup).mark_only()
    }

    /// Register a pre-built suite
    pub fn add_suite(&mut self, suite: TestSuite) {
        self.suites.push(suite);
    }

    /// Reset to empty
    pub fn clear(&mut self) {
        self.suites.clear();
    }

    /// Registered suites
    #[must_use]
    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    /// Number of suites
    #[must_use]
    pub fn len(&self) -> usize {
        self.suites.len()
    }

    /// Whether no suite is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Whether any suite or test carries `only`
    #[must_use]
    pub fn has_only(&self) -> bool {
        self.suites
            .iter()
            .any(|s| s.only || s.tests.iter().any(|t| t.only))
    }

    /// Apply the only-filter.
    ///
    /// Without any `only` marker every suite is selected whole. Otherwise
    /// the selection is the union of all `only` suites (every test in
    /// them) and all `only` tests anywhere; suites left with nothing are
    /// dropped.
    #[must_use]
    pub fn selected(&self) -> Vec<SelectedSuite<'_>> {
        let filtering = self.has_only();
        self.suites
            .iter()
            .map(|suite| SelectedSuite {
                suite,
                tests: &suite.tests,
                only_tests: filtering && !suite.only,
            })
            .filter(|selected| !filtering || !selected.is_empty())
            .collect()
    }
}
