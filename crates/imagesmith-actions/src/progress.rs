//! Progress reporting for action execution
//!
//! This module provides types for reporting progress while a pipeline runs,
//! allowing the front end to track and display the current step.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Progress update from an action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    /// Action name
    pub action: String,

    /// Current progress percentage (0-100)
    pub percentage: u8,

    /// Human-readable status message
    pub message: String,

    /// Current phase of multi-phase actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Current phase number (1-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_number: Option<u32>,

    /// Total number of phases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_phases: Option<u32>,
}

impl Progress {
    /// Create a new progress update
    pub fn new(action: impl Into<String>, percentage: u8, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            percentage: percentage.min(100),
            message: message.into(),
            phase: None,
            phase_number: None,
            total_phases: None,
        }
    }

    /// Create a "starting" progress update
    pub fn starting(action: impl Into<String>) -> Self {
        Self::new(action, 0, "Starting...")
    }

    /// Create a "completed" progress update
    pub fn completed(action: impl Into<String>) -> Self {
        Self::new(action, 100, "Completed")
    }

    /// Add phase information
    pub fn with_phase(
        mut self,
        phase: impl Into<String>,
        phase_number: u32,
        total_phases: u32,
    ) -> Self {
        self.phase = Some(phase.into());
        self.phase_number = Some(phase_number);
        self.total_phases = Some(total_phases);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.percentage >= 100
    }
}

/// Trait for types that can send progress updates
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: Progress);
}

/// A progress reporter that discards updates
#[derive(Debug, Default, Clone)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _progress: Progress) {}
}

/// A progress reporter that writes updates to the log
#[derive(Debug, Default, Clone)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, progress: Progress) {
        match (&progress.phase, progress.phase_number, progress.total_phases) {
            (Some(phase), Some(n), Some(total)) => info!(
                action = %progress.action,
                percent = progress.percentage,
                phase = %phase,
                "[{}/{}] {}",
                n,
                total,
                progress.message
            ),
            _ => info!(
                action = %progress.action,
                percent = progress.percentage,
                "{}",
                progress.message
            ),
        }
    }
}

/// A progress reporter that collects all updates
#[derive(Debug, Default)]
pub struct CollectingReporter {
    updates: std::sync::Mutex<Vec<Progress>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<Progress> {
        self.updates.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Progress> {
        self.updates.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.updates.lock().unwrap().clear();
    }
}

impl ProgressReporter for CollectingReporter {
    fn report(&self, progress: Progress) {
        self.updates.lock().unwrap().push(progress);
    }
}
