//! Recipe document types
//!
//! A recipe holds an ordered list of steps. Each step is tagged by its
//! `action` key and carries only the fields that action consumes.

use crate::{RecipeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A build recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Recipe {
    /// Target architecture, informational for the actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    /// Steps to execute in order
    #[serde(default)]
    pub actions: Vec<Step>,
}

/// A recipe together with the directory it was loaded from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecipe {
    pub recipe: Recipe,

    /// Absolute directory containing the recipe file. Relative paths inside
    /// the recipe resolve against it.
    pub recipe_dir: PathBuf,
}

impl Recipe {
    /// Parse a recipe from YAML and validate it
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let recipe: Recipe = serde_yaml::from_str(yaml)?;
        recipe.validate()?;
        Ok(recipe)
    }

    /// Load a recipe file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<LoadedRecipe> {
        let path = path.as_ref();
        let io_err = |source| RecipeError::Io {
            path: path.to_path_buf(),
            source,
        };

        let yaml = std::fs::read_to_string(path).map_err(io_err)?;
        let recipe = Self::from_yaml(&yaml)?;

        let absolute = std::fs::canonicalize(path).map_err(io_err)?;
        let recipe_dir = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        Ok(LoadedRecipe { recipe, recipe_dir })
    }

    /// Validate the recipe structure
    ///
    /// Only structural problems are caught here. Whether referenced files
    /// exist is checked by each action's verify phase.
    pub fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(RecipeError::Validation(
                "recipe declares no actions".to_string(),
            ));
        }

        for (i, step) in self.actions.iter().enumerate() {
            step.validate().map_err(|e| {
                RecipeError::Validation(format!("actions[{}] ({}): {}", i, step.kind(), e))
            })?;
        }

        Ok(())
    }

    /// Get all action kinds in order
    pub fn action_kinds(&self) -> Vec<&str> {
        self.actions.iter().map(Step::kind).collect()
    }
}

/// One recipe step, selected by its `action` key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Bootstrap the rootfs with pacstrap
    Pacstrap(PacstrapStep),
}

impl Step {
    /// The `action` tag of this step
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Pacstrap(_) => "pacstrap",
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Step::Pacstrap(step) => step.validate(),
        }
    }
}

/// Fields consumed by the pacstrap action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PacstrapStep {
    /// Path to a complete pacman.conf. Left empty when absent so the
    /// action reports it at verify time.
    #[serde(default)]
    pub config_file: String,

    /// Mirror list to install into the rootfs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_file: Option<String>,

    /// Mirror URL template with `$repo` and `$arch` placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<String>,

    /// Repositories enabled in the generated pacman.conf
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<Repository>,
}

impl PacstrapStep {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.repositories.iter().any(|r| r.name.trim().is_empty()) {
            return Err("repository name must not be empty".to_string());
        }
        Ok(())
    }
}

/// A package repository and its signature policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub name: String,

    /// pacman SigLevel, e.g. "Optional TrustAll"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub siglevel: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
architecture: x86_64
actions:
  - action: pacstrap
    config-file: pacman.conf
    mirror-file: mirrorlist
    mirror: https://mirror.example/$repo/os/$arch
    repositories:
      - name: core
      - name: extra
        siglevel: Optional TrustAll
"#;

    #[test]
    fn test_parse_full_recipe() {
        let recipe = Recipe::from_yaml(FULL).unwrap();

        assert_eq!(recipe.architecture.as_deref(), Some("x86_64"));
        assert_eq!(recipe.action_kinds(), vec!["pacstrap"]);

        let Step::Pacstrap(step) = &recipe.actions[0];
        assert_eq!(step.config_file, "pacman.conf");
        assert_eq!(step.mirror_file.as_deref(), Some("mirrorlist"));
        assert_eq!(
            step.mirror.as_deref(),
            Some("https://mirror.example/$repo/os/$arch")
        );
        assert_eq!(step.repositories.len(), 2);
        assert_eq!(step.repositories[0].siglevel, None);
        assert_eq!(
            step.repositories[1].siglevel.as_deref(),
            Some("Optional TrustAll")
        );
    }

    #[test]
    fn test_missing_config_file_parses_as_empty() {
        let recipe = Recipe::from_yaml("actions:\n  - action: pacstrap\n").unwrap();

        let Step::Pacstrap(step) = &recipe.actions[0];
        assert!(step.config_file.is_empty());
        assert!(step.mirror_file.is_none());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = Recipe::from_yaml("actions:\n  - action: debootstrap\n");
        assert!(matches!(result, Err(RecipeError::Parse(_))));
    }

    #[test]
    fn test_empty_recipe_rejected() {
        let result = Recipe::from_yaml("architecture: x86_64\n");
        let err = result.unwrap_err();
        assert!(matches!(err, RecipeError::Validation(_)));
        assert!(err.to_string().contains("no actions"));
    }

    #[test]
    fn test_blank_repository_name_rejected() {
        let yaml = r#"
actions:
  - action: pacstrap
    config-file: pacman.conf
    repositories:
      - name: "  "
"#;
        let err = Recipe::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("actions[0] (pacstrap)"));
    }

    #[test]
    fn test_load_sets_recipe_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipe.yaml");
        std::fs::write(&path, FULL).unwrap();

        let loaded = Recipe::load(&path).unwrap();

        assert_eq!(
            loaded.recipe_dir,
            std::fs::canonicalize(dir.path()).unwrap()
        );
        assert_eq!(loaded.recipe.actions.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Recipe::load("/nonexistent/recipe.yaml").unwrap_err();
        assert!(matches!(err, RecipeError::Io { .. }));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let recipe = Recipe::from_yaml(FULL).unwrap();
        let yaml = serde_yaml::to_string(&recipe).unwrap();
        let parsed = Recipe::from_yaml(&yaml).unwrap();
        assert_eq!(recipe, parsed);
    }
}
