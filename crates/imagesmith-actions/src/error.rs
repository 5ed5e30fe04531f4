//! Error types for build actions
//!
//! This module provides error types for action verification and execution,
//! including failures of the external tools an action drives.

use crate::command::CommandError;
use crate::traits::ActionState;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for action verification and execution
#[derive(Debug, Error)]
pub enum ActionError {
    /// A mandatory configuration field was left unset
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A file declared by the action is not accessible
    #[error("missing file {}: {source}", .path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external tool failed to start or exited non-zero
    #[error("{phase} failed: {source}")]
    ExternalTool {
        phase: String,
        #[source]
        source: CommandError,
    },

    /// A lifecycle operation was attempted from the wrong state, e.g. run
    /// before verify
    #[error("cannot {operation} action '{action}' in state {state}")]
    InvalidState {
        action: String,
        operation: &'static str,
        state: ActionState,
    },

    /// A local side effect of the action failed
    #[error("action execution failed: {0}")]
    ExecutionFailed(String),

    /// A pipeline step failed
    #[error("action '{action}' failed: {source}")]
    Step {
        action: String,
        #[source]
        source: Box<ActionError>,
    },

    /// I/O error during action execution
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ActionError {
    /// Strip pipeline wrapping and return the error raised by the action
    pub fn root(&self) -> &ActionError {
        match self {
            ActionError::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for action operations
pub type Result<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ActionError::Configuration("no config file provided".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: no config file provided"
        );

        let err = ActionError::MissingFile {
            path: PathBuf::from("/recipe/pacman.conf"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "missing file /recipe/pacman.conf: not found");

        let err = ActionError::InvalidState {
            action: "pacstrap".to_string(),
            operation: "run",
            state: ActionState::Unverified,
        };
        assert_eq!(
            err.to_string(),
            "cannot run action 'pacstrap' in state unverified"
        );
    }

    #[test]
    fn test_external_tool_display() {
        let err = ActionError::ExternalTool {
            phase: "pacman keyring init".to_string(),
            source: CommandError::Exit {
                label: "Pacman-key".to_string(),
                program: "pacman-key".to_string(),
                code: Some(1),
            },
        };
        assert_eq!(
            err.to_string(),
            "pacman keyring init failed: Pacman-key: 'pacman-key' exited with code 1"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let action_err: ActionError = io_err.into();
        assert!(matches!(action_err, ActionError::Io(_)));
    }

    #[test]
    fn test_root_unwraps_steps() {
        let err = ActionError::Step {
            action: "pacstrap".to_string(),
            source: Box::new(ActionError::Configuration("x".to_string())),
        };
        assert!(err.to_string().starts_with("action 'pacstrap' failed"));
        assert!(matches!(err.root(), ActionError::Configuration(_)));
    }
}
