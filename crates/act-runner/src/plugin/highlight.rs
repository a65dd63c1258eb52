//! Outcome highlighting through a host-provided overlay.

use super::Plugin;
use crate::dom::Element;
use crate::event::TestEvent;
use crate::outcome::{Outcome, TestResult};
use crate::result::RunnerResult;
use crate::runner::{panic_message, Runner};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use tracing::warn;

/// What to highlight.
///
/// The live element is preferred; the selector is the fallback when only
/// a snapshot of the element survived.
#[derive(Debug, Clone, Copy)]
pub enum HighlightTarget<'a> {
    /// Element still in scope
    Element(Element<'a>),
    /// Selector to re-resolve
    Selector(&'a str),
}

/// Visual treatment for one outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightStyle {
    /// CSS outline colour
    pub color: &'static str,
    /// Short label shown next to the element
    pub label: &'static str,
}

impl HighlightStyle {
    /// Default treatment: green pass, red fail, grey skip, amber todo
    #[must_use]
    pub const fn for_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Pass => Self {
                color: "#4caf50",
                label: "pass",
            },
            Outcome::Fail => Self {
                color: "#f44336",
                label: "fail",
            },
            Outcome::Skip => Self {
                color: "#9e9e9e",
                label: "skip",
            },
            Outcome::Todo => Self {
                color: "#ff9800",
                label: "todo",
            },
        }
    }
}

/// Host overlay that draws highlights
pub trait Highlighter {
    /// Highlight one result
    fn highlight(
        &self,
        target: HighlightTarget<'_>,
        style: &HighlightStyle,
        result: &TestResult,
    ) -> RunnerResult<()>;

    /// Remove all highlights; called when a run starts
    fn clear(&self) -> RunnerResult<()> {
        Ok(())
    }
}

/// Plugin forwarding every `test-result` to a [`Highlighter`]
pub struct HighlightPlugin<H> {
    highlighter: H,
    include_passes: bool,
}

impl<H> fmt::Debug for HighlightPlugin<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightPlugin")
            .field("include_passes", &self.include_passes)
            .finish_non_exhaustive()
    }
}

impl<H: Highlighter + 'static> HighlightPlugin<H> {
    /// Highlight every outcome
    #[must_use]
    pub const fn new(highlighter: H) -> Self {
        Self {
            highlighter,
            include_passes: true,
        }
    }

    /// Whether passing results are highlighted too
    #[must_use]
    pub const fn include_passes(mut self, enabled: bool) -> Self {
        self.include_passes = enabled;
        self
    }
}

/// Run a highlighter call, absorbing errors and panics
fn isolated(action: impl FnOnce() -> RunnerResult<()>) {
    match catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "highlighting failed"),
        Err(payload) => warn!(panic = %panic_message(&*payload), "highlighting failed"),
    }
}

impl<H: Highlighter + 'static> Plugin for HighlightPlugin<H> {
    fn install(self, runner: &mut Runner) {
        let highlighter = Rc::new(self.highlighter);
        let include_passes = self.include_passes;
        runner.on(move |event| match event {
            TestEvent::Start { .. } => isolated(|| highlighter.clear()),
            TestEvent::Result {
                result, element, ..
            } => {
                if result.outcome.is_pass() && !include_passes {
                    return;
                }
                let target = match (element, &result.element) {
                    (Some(live), _) => HighlightTarget::Element(*live),
                    (None, Some(info)) => HighlightTarget::Selector(&info.selector),
                    (None, None) => return,
                };
                let style = HighlightStyle::for_outcome(result.outcome);
                isolated(|| highlighter.highlight(target, &style, result));
            }
            _ => {}
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::dom::Document;
    use crate::expect::expect_element;
    use crate::result::RunnerError;
    use std::cell::RefCell;

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<(String, &'static str)>>>,
        clears: Rc<RefCell<usize>>,
    }

    impl Highlighter for Recorder {
        fn highlight(
            &self,
            target: HighlightTarget<'_>,
            style: &HighlightStyle,
            _result: &TestResult,
        ) -> RunnerResult<()> {
            let key = match target {
                HighlightTarget::Element(el) => el.id().unwrap_or("?").to_string(),
                HighlightTarget::Selector(sel) => sel.to_string(),
            };
            self.calls.borrow_mut().push((key, style.label));
            Ok(())
        }

        fn clear(&self) -> RunnerResult<()> {
            *self.clears.borrow_mut() += 1;
            Ok(())
        }
    }

    struct Broken;

    impl Highlighter for Broken {
        fn highlight(
            &self,
            _target: HighlightTarget<'_>,
            _style: &HighlightStyle,
            _result: &TestResult,
        ) -> RunnerResult<()> {
            Err(RunnerError::InvalidState {
                message: "overlay detached".into(),
            })
        }

        fn clear(&self) -> RunnerResult<()> {
            panic!("overlay gone")
        }
    }

    fn runner() -> Runner {
        let mut runner = Runner::new(RunnerConfig::default());
        runner.registry_mut().describe_scoped("image-alt", "img", |suite| {
            suite.test("has alt", |ctx| {
                expect_element(ctx.element).to_have_attribute("alt")?;
                Ok(())
            });
        });
        runner
    }

    #[tokio::test]
    async fn test_live_elements_are_highlighted() {
        let recorder = Recorder::default();
        let mut runner = runner();
        runner.plugin(HighlightPlugin::new(recorder.clone()));

        let doc = Document::parse(r#"<img id="a" alt="x"><img id="b">"#);
        runner.run(&doc).await;

        assert_eq!(
            *recorder.calls.borrow(),
            vec![("a".to_string(), "pass"), ("b".to_string(), "fail")]
        );
        assert_eq!(*recorder.clears.borrow(), 1);
    }

    #[tokio::test]
    async fn test_passes_can_be_excluded() {
        let recorder = Recorder::default();
        let mut runner = runner();
        runner.plugin(HighlightPlugin::new(recorder.clone()).include_passes(false));

        let doc = Document::parse(r#"<img id="a" alt="x"><img id="b">"#);
        runner.run(&doc).await;

        assert_eq!(*recorder.calls.borrow(), vec![("b".to_string(), "fail")]);
    }

    #[tokio::test]
    async fn test_highlighter_failures_do_not_escape() {
        let mut runner = runner();
        runner.plugin(HighlightPlugin::new(Broken));

        let doc = Document::parse(r#"<img alt="x"><img>"#);
        let results = runner.run(&doc).await;

        assert_eq!(results[0].total(), 2);
        assert_eq!(runner.state(), crate::runner::RunnerState::Complete);
    }

    #[test]
    fn test_style_per_outcome() {
        assert_eq!(HighlightStyle::for_outcome(Outcome::Fail).color, "#f44336");
        assert_eq!(HighlightStyle::for_outcome(Outcome::Todo).label, "todo");
    }
}
