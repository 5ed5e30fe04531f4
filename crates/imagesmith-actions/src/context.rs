//! Build context and action result types
//!
//! The [`BuildContext`] is created once per build and shared by reference
//! with every action. It is the only channel between actions: the rootfs
//! path is read from it and the rootfs contents are what actions leave
//! behind for their successors.

use crate::command::{CommandRunner, HostRunner};
use crate::progress::{NoopReporter, ProgressReporter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Context shared by all actions of one build
///
/// `root_dir` and `recipe_dir` are fixed at construction. Actions receive
/// `&BuildContext` and have no way to replace them.
pub struct BuildContext {
    /// Root of the filesystem being assembled
    root_dir: PathBuf,

    /// Directory of the recipe, base for relative paths
    recipe_dir: PathBuf,

    /// Target architecture declared by the recipe
    architecture: Option<String>,

    /// Progress reporter for sending updates
    progress_reporter: Arc<dyn ProgressReporter>,

    /// Runner for external tools
    command_runner: Arc<dyn CommandRunner>,

    /// Whether this is a dry-run (no side effects)
    dry_run: bool,
}

impl BuildContext {
    /// Create a new build context
    pub fn new(root_dir: impl Into<PathBuf>, recipe_dir: impl Into<PathBuf>) -> Self {
        let root_dir: PathBuf = root_dir.into();
        let recipe_dir: PathBuf = recipe_dir.into();
        Self {
            root_dir: clean_path(&root_dir),
            recipe_dir: clean_path(&recipe_dir),
            architecture: None,
            progress_reporter: Arc::new(NoopReporter),
            command_runner: Arc::new(HostRunner),
            dry_run: false,
        }
    }

    /// Set the target architecture
    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = Some(architecture.into());
        self
    }

    /// Set the progress reporter
    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = reporter;
        self
    }

    /// Set the runner used for external tools
    pub fn with_command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.command_runner = runner;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn recipe_dir(&self) -> &Path {
        &self.recipe_dir
    }

    pub fn architecture(&self) -> Option<&str> {
        self.architecture.as_deref()
    }

    pub fn progress_reporter(&self) -> &Arc<dyn ProgressReporter> {
        &self.progress_reporter
    }

    pub fn command_runner(&self) -> &Arc<dyn CommandRunner> {
        &self.command_runner
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Resolve a recipe path: relative paths are taken from the recipe
    /// directory, the result is lexically cleaned
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        clean_path_at(path.as_ref(), &self.recipe_dir)
    }

    /// Path inside the rootfs; leading `/` in `path` is ignored
    pub fn rootfs_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let relative = path.as_ref().strip_prefix("/").unwrap_or(path.as_ref());
        clean_path(&self.root_dir.join(relative))
    }
}

/// Join `path` onto `base` unless it is absolute, then clean it
pub fn clean_path_at(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        clean_path(&base.join(path))
    }
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent
///
/// `..` at the root stays at the root; leading `..` of a relative path is
/// kept. Symlinks are not consulted.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Result returned from a successful action run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    /// Human-readable message describing the outcome
    pub message: String,

    /// Output data from the action (action-specific)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub output: HashMap<String, serde_json::Value>,

    /// Duration of the run, filled in by the pipeline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: HashMap::new(),
            duration: None,
        }
    }

    /// Add output data
    pub fn with_output(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.output.insert(key.into(), json_value);
        }
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn get_output(&self, key: &str) -> Option<&serde_json::Value> {
        self.output.get(key)
    }

    /// Get output value as a specific type
    pub fn get_output_as<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.output
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("root_dir", &self.root_dir)
            .field("recipe_dir", &self.recipe_dir)
            .field("architecture", &self.architecture)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CollectingReporter;

    #[test]
    fn test_context_new() {
        let ctx = BuildContext::new("/build/rootfs", "/recipes/arch");

        assert_eq!(ctx.root_dir(), Path::new("/build/rootfs"));
        assert_eq!(ctx.recipe_dir(), Path::new("/recipes/arch"));
        assert_eq!(ctx.architecture(), None);
        assert!(!ctx.is_dry_run());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let ctx = BuildContext::new("/build/rootfs", "/recipes/arch");

        assert_eq!(ctx.resolve("pacman.conf"), PathBuf::from("/recipes/arch/pacman.conf"));
        assert_eq!(ctx.resolve("./conf/../pacman.conf"), PathBuf::from("/recipes/arch/pacman.conf"));
        assert_eq!(ctx.resolve("../shared/mirrorlist"), PathBuf::from("/recipes/shared/mirrorlist"));
        assert_eq!(ctx.resolve("/etc/pacman.conf"), PathBuf::from("/etc/pacman.conf"));
    }

    #[test]
    fn test_rootfs_path() {
        let ctx = BuildContext::new("/build/rootfs", "/recipes");

        assert_eq!(
            ctx.rootfs_path("/etc/pacman.d/mirrorlist"),
            PathBuf::from("/build/rootfs/etc/pacman.d/mirrorlist")
        );
        assert_eq!(
            ctx.rootfs_path("var/log/pacman.log"),
            PathBuf::from("/build/rootfs/var/log/pacman.log")
        );
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean_path(Path::new("../a/b/..")), PathBuf::from("../a"));
        assert_eq!(clean_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(clean_path(Path::new("/a//b/")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_context_builders() {
        let reporter = Arc::new(CollectingReporter::new());
        let ctx = BuildContext::new("/rootfs", "/recipe")
            .with_architecture("x86_64")
            .with_progress_reporter(reporter.clone())
            .with_dry_run(true);

        ctx.progress_reporter()
            .report(crate::progress::Progress::starting("test"));

        assert_eq!(ctx.architecture(), Some("x86_64"));
        assert!(ctx.is_dry_run());
        assert_eq!(reporter.updates().len(), 1);
    }

    #[test]
    fn test_result_with_output() {
        let result = ActionResult::success("Done")
            .with_output("root_dir", "/rootfs")
            .with_output("mirrorlist", true)
            .with_duration(Duration::from_secs(5));

        assert_eq!(
            result.get_output_as::<String>("root_dir"),
            Some("/rootfs".to_string())
        );
        assert_eq!(result.get_output_as::<bool>("mirrorlist"), Some(true));
        assert!(result.get_output("missing").is_none());
        assert_eq!(result.duration, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_result_serialization() {
        let result = ActionResult::success("Done").with_output("test", 42);

        let json = serde_json::to_string(&result).unwrap();
        let parsed: ActionResult = serde_json::from_str(&json).unwrap();

        assert_eq!(result, parsed);
    }
}
