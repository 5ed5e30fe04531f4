//! Error types for recipe loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading a recipe
#[derive(Debug, Error)]
pub enum RecipeError {
    /// Recipe file could not be read
    #[error("failed to read recipe {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Recipe is not valid YAML or does not match the schema
    #[error("failed to parse recipe: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Recipe parsed but is not usable
    #[error("invalid recipe: {0}")]
    Validation(String),
}

/// Result type for recipe operations
pub type Result<T> = std::result::Result<T, RecipeError>;
