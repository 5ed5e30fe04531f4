//! Build pipeline
//!
//! The [`Pipeline`] holds the ordered steps of a build. It verifies every
//! step before running any of them, then runs them one at a time in
//! declared order and stops at the first failure.

use crate::context::{ActionResult, BuildContext};
use crate::error::{ActionError, Result};
use crate::progress::Progress;
use crate::traits::{Action, ActionState, Step};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Ordered sequence of build steps
///
/// # Example
///
/// ```ignore
/// use imagesmith_actions::{BuildContext, NoopAction, Pipeline};
///
/// let mut pipeline = Pipeline::new();
/// pipeline.push(NoopAction::new("test"));
///
/// let results = pipeline.build(&ctx).await?;
/// ```
#[derive(Debug, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action
    pub fn push<A: Action + 'static>(&mut self, action: A) {
        self.steps.push(Step::new(Arc::new(action)));
    }

    /// Append an action (Arc version for shared ownership)
    pub fn push_arc(&mut self, action: Arc<dyn Action>) {
        self.steps.push(Step::new(action));
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get all action names in order
    pub fn action_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Verify every step in order, stopping at the first error
    ///
    /// Nothing is run, so a failure here leaves the rootfs untouched. The
    /// error is wrapped as [`ActionError::Step`] naming the failed action.
    pub fn verify(&mut self, ctx: &BuildContext) -> Result<()> {
        for step in &mut self.steps {
            if let Err(e) = step.verify(ctx) {
                error!(action = %step.name(), error = %e, "Verification failed");
                return Err(ActionError::Step {
                    action: step.name().to_string(),
                    source: Box::new(e),
                });
            }
        }
        info!(steps = self.steps.len(), "All actions verified");
        Ok(())
    }

    /// Run every step in order, stopping at the first error
    ///
    /// Steps must have been verified. Side effects of steps that already
    /// ran are not rolled back.
    pub async fn run(&mut self, ctx: &BuildContext) -> Result<Vec<ActionResult>> {
        let reporter = ctx.progress_reporter().clone();
        let mut results = Vec::with_capacity(self.steps.len());

        for step in &mut self.steps {
            let name = step.name().to_string();

            if ctx.is_dry_run() && !step.action().supports_dry_run() {
                warn!(action = %name, "Action has no dry-run mode, skipping");
                results.push(ActionResult::success(format!("DRY RUN: skipped {}", name)));
                continue;
            }

            reporter.report(Progress::starting(&name));
            info!(action = %name, description = %step.action().description(), "Running action");
            let start = Instant::now();

            match step.run(ctx).await {
                Ok(result) => {
                    let elapsed = start.elapsed();
                    reporter.report(Progress::completed(&name));
                    info!(action = %name, elapsed = ?elapsed, "Action completed");
                    results.push(result.with_duration(elapsed));
                }
                Err(e) => {
                    reporter.report(Progress::new(&name, 0, format!("Failed: {}", e)));
                    error!(action = %name, error = %e, "Action failed");
                    return Err(ActionError::Step {
                        action: name,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(results)
    }

    /// Verify all steps, then run them
    pub async fn build(&mut self, ctx: &BuildContext) -> Result<Vec<ActionResult>> {
        self.verify(ctx)?;
        self.run(ctx).await
    }

    /// True once every step has succeeded
    pub fn is_complete(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.state() == ActionState::Succeeded)
    }
}
