//! Action trait definition
//!
//! Every build step implements [`Action`]: a side-effect-free `verify`
//! followed by a side-effecting `run`. The pipeline wraps each action in a
//! [`Step`] that tracks its lifecycle and refuses to run anything that has
//! not been verified.

use crate::context::{ActionResult, BuildContext};
use crate::error::{ActionError, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Core trait for build actions
///
/// # Example
///
/// ```ignore
/// use imagesmith_actions::{Action, ActionResult, BuildContext, Result};
/// use async_trait::async_trait;
///
/// struct TouchAction;
///
/// #[async_trait]
/// impl Action for TouchAction {
///     fn name(&self) -> &str {
///         "touch"
///     }
///
///     fn description(&self) -> &str {
///         "Creates an empty marker in the rootfs"
///     }
///
///     async fn run(&self, ctx: &BuildContext) -> Result<ActionResult> {
///         tokio::fs::write(ctx.rootfs_path("etc/built"), b"").await?;
///         Ok(ActionResult::success("marker written"))
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + Sync {
    /// Get the action name (matches the recipe `action` tag)
    fn name(&self) -> &str;

    /// Get a human-readable description of the action
    fn description(&self) -> &str;

    /// Check preconditions before anything runs
    ///
    /// Must not have side effects. The pipeline calls this for every
    /// action before it runs any of them.
    fn verify(&self, ctx: &BuildContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Perform the action against the rootfs
    ///
    /// Only called after `verify` succeeded. Does not re-validate.
    async fn run(&self, ctx: &BuildContext) -> Result<ActionResult>;

    /// Check if this action supports dry-run mode
    ///
    /// When true, `run` must skip side effects when `ctx.is_dry_run()`.
    fn supports_dry_run(&self) -> bool {
        false
    }
}

/// Lifecycle state of an action within a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Unverified,
    Verified,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionState::Unverified => "unverified",
            ActionState::Verified => "verified",
            ActionState::Running => "running",
            ActionState::Succeeded => "succeeded",
            ActionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// An action plus its lifecycle state
///
/// `Unverified -> Verified -> Running -> Succeeded | Failed`. A failed
/// verify moves straight to `Failed`.
pub struct Step {
    action: Arc<dyn Action>,
    state: ActionState,
}

impl Step {
    pub fn new(action: Arc<dyn Action>) -> Self {
        Self {
            action,
            state: ActionState::Unverified,
        }
    }

    pub fn name(&self) -> &str {
        self.action.name()
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Verify the action. Repeating a successful verify is allowed.
    pub fn verify(&mut self, ctx: &BuildContext) -> Result<()> {
        match self.state {
            ActionState::Unverified | ActionState::Verified => {}
            state => return Err(self.invalid_state("verify", state)),
        }

        match self.action.verify(ctx) {
            Ok(()) => {
                debug!(action = %self.name(), "Verified");
                self.state = ActionState::Verified;
                Ok(())
            }
            Err(e) => {
                self.state = ActionState::Failed;
                Err(e)
            }
        }
    }

    /// Run the action; refuses unless the step is `Verified`
    pub async fn run(&mut self, ctx: &BuildContext) -> Result<ActionResult> {
        if self.state != ActionState::Verified {
            return Err(self.invalid_state("run", self.state));
        }

        self.state = ActionState::Running;
        let result = self.action.run(ctx).await;
        self.state = if result.is_ok() {
            ActionState::Succeeded
        } else {
            ActionState::Failed
        };
        result
    }

    fn invalid_state(&self, operation: &'static str, state: ActionState) -> ActionError {
        ActionError::InvalidState {
            action: self.name().to_string(),
            operation,
            state,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("action", &self.name())
            .field("state", &self.state)
            .finish()
    }
}

/// A simple no-op action for testing
pub struct NoopAction {
    name: String,
}

impl NoopAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Action for NoopAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "A no-op action for testing"
    }

    async fn run(&self, _ctx: &BuildContext) -> Result<ActionResult> {
        Ok(ActionResult::success("No-op completed"))
    }

    fn supports_dry_run(&self) -> bool {
        true
    }
}

/// An action that always fails (for testing error handling)
pub struct FailingAction {
    name: String,
    error_message: String,
    fail_verify: bool,
}

impl FailingAction {
    /// Fails in `run`
    pub fn new(name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error_message: error_message.into(),
            fail_verify: false,
        }
    }

    /// Fails in `verify`
    pub fn at_verify(name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            fail_verify: true,
            ..Self::new(name, error_message)
        }
    }
}

#[async_trait]
impl Action for FailingAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "An action that always fails (for testing)"
    }

    fn verify(&self, _ctx: &BuildContext) -> Result<()> {
        if self.fail_verify {
            return Err(ActionError::Configuration(self.error_message.clone()));
        }
        Ok(())
    }

    async fn run(&self, _ctx: &BuildContext) -> Result<ActionResult> {
        Err(ActionError::ExecutionFailed(self.error_message.clone()))
    }
}
