use std::future::Future;
use std::pin::Pin;

use crate::config::ScriptOptions;
use crate::error::Result;
use crate::iteration::Iteration;
use crate::outputs::SummaryOutputs;
use crate::summary::RunSummary;

pub type IterationFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A load test: run options, the body every VU repeats, and an end-of-run hook.
///
/// One instance is shared by all VUs; per-iteration state lives in the future returned
/// by [`Scenario::iteration`].
pub trait Scenario: Send + Sync + 'static {
    fn options(&self) -> ScriptOptions;

    /// One VU iteration. Failures are recorded through checks and request metrics, never
    /// returned.
    fn iteration<'a>(&'a self, it: &'a mut Iteration) -> IterationFuture<'a>;

    /// Files to write after the run, as `(relative path, content)`.
    fn handle_summary(&self, _summary: &RunSummary) -> Result<SummaryOutputs> {
        Ok(Vec::new())
    }
}
