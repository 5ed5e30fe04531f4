//! Pacstrap action
//!
//! Builds the target rootfs with the Arch Linux bootstrap tools.
//!
//! Recipe usage:
//! ```yaml
//! - action: pacstrap
//!   config-file: pacman.conf
//!   mirror-file: mirrorlist
//! ```
//!
//! Run order:
//!   1. When a mirror file is declared, install the recipe's pacman.conf
//!      as the rootfs mirror list
//!   2. `pacman-key --init --populate` against the recipe's pacman.conf
//!   3. `pacstrap -M -C <pacman.conf> <rootdir>`
//!
//! The mirror file only switches the install on and must exist; the bytes
//! written to `etc/pacman.d/mirrorlist` are those of the config file.

use crate::command::ToolCommand;
use crate::context::{ActionResult, BuildContext};
use crate::error::{ActionError, Result};
use crate::progress::Progress;
use crate::traits::Action;
use async_trait::async_trait;
use imagesmith_recipe::{PacstrapStep, Repository};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Location of the mirror list inside the rootfs
pub const MIRRORLIST_PATH: &str = "etc/pacman.d/mirrorlist";

/// pacman's own log inside the rootfs, dumped when pacstrap fails
pub const PACMAN_LOG_PATH: &str = "var/log/pacman.log";

/// Mode of the installed mirror list
const MIRRORLIST_MODE: u32 = 0o644;

/// Phase name of the keyring initialization
pub const KEYRING_PHASE: &str = "pacman keyring init";

/// Phase name of the bootstrap itself
pub const BOOTSTRAP_PHASE: &str = "pacstrap bootstrap";

const TOTAL_PHASES: u32 = 3;

/// Bootstrap a rootfs with pacstrap
#[derive(Debug, Clone, Default)]
pub struct PacstrapAction {
    config_file: String,
    mirror_file: Option<String>,
    mirror: Option<String>,
    repositories: Vec<Repository>,
}

impl PacstrapAction {
    pub fn new(config_file: impl Into<String>) -> Self {
        Self {
            config_file: config_file.into(),
            ..Default::default()
        }
    }

    pub fn with_mirror_file(mut self, mirror_file: impl Into<String>) -> Self {
        self.mirror_file = Some(mirror_file.into());
        self
    }

    pub fn from_step(step: &PacstrapStep) -> Self {
        Self {
            config_file: step.config_file.clone(),
            mirror_file: step.mirror_file.clone().filter(|f| !f.is_empty()),
            mirror: step.mirror.clone(),
            repositories: step.repositories.clone(),
        }
    }

    /// Files the action reads, config first
    fn input_files(&self, ctx: &BuildContext) -> Vec<PathBuf> {
        std::iter::once(&self.config_file)
            .chain(self.mirror_file.as_ref())
            .map(|f| ctx.resolve(f))
            .collect()
    }

    fn keyring_command(config: &Path) -> ToolCommand {
        // A fresh keyring scoped to this config: the invoking user's
        // keyring is root-only and must not be touched by the build.
        ToolCommand::new("Pacman-key", "pacman-key")
            .arg("--config")
            .arg_path(config)
            .args(["--init", "--populate"])
    }

    fn pacstrap_command(config: &Path, root_dir: &Path) -> ToolCommand {
        ToolCommand::new("Pacstrap", "pacstrap")
            .args(["-M", "-C"])
            .arg_path(config)
            .arg_path(root_dir)
    }

    fn phase(&self, ctx: &BuildContext, n: u32, phase: &str, pct: u8, message: String) {
        ctx.progress_reporter()
            .report(Progress::new(self.name(), pct, message).with_phase(phase, n, TOTAL_PHASES));
    }
}

#[async_trait]
impl Action for PacstrapAction {
    fn name(&self) -> &str {
        "pacstrap"
    }

    fn description(&self) -> &str {
        "Construct the target rootfs with pacstrap"
    }

    fn verify(&self, ctx: &BuildContext) -> Result<()> {
        if self.config_file.is_empty() {
            return Err(ActionError::Configuration(
                "no config file provided".to_string(),
            ));
        }

        for path in self.input_files(ctx) {
            if let Err(source) = std::fs::metadata(&path) {
                return Err(ActionError::MissingFile { path, source });
            }
        }

        Ok(())
    }

    fn supports_dry_run(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &BuildContext) -> Result<ActionResult> {
        let config = ctx.resolve(&self.config_file);
        let runner = ctx.command_runner();

        let repositories: Vec<&str> = self.repositories.iter().map(|r| r.name.as_str()).collect();
        debug!(
            mirror = ?self.mirror,
            repositories = ?repositories,
            architecture = ?ctx.architecture(),
            "Recipe mirror settings"
        );

        let keyring = Self::keyring_command(&config);
        let pacstrap = Self::pacstrap_command(&config, ctx.root_dir());

        if ctx.is_dry_run() {
            if self.mirror_file.is_some() {
                info!(
                    source = %config.display(),
                    dest = %ctx.rootfs_path(MIRRORLIST_PATH).display(),
                    "DRY RUN: would install mirror list"
                );
            }
            for command in [&keyring, &pacstrap] {
                info!(label = %command.label(), "DRY RUN: would run {}", command.command_line());
            }
            return Ok(ActionResult::success(format!(
                "DRY RUN: would bootstrap {}",
                ctx.root_dir().display()
            )));
        }

        if self.mirror_file.is_some() {
            let dest = ctx.rootfs_path(MIRRORLIST_PATH);
            self.phase(ctx, 1, "mirrorlist", 5, format!("Installing {}", dest.display()));
            install_file(&config, &dest, MIRRORLIST_MODE).await?;
            info!(source = %config.display(), dest = %dest.display(), "Mirror list installed");
        }

        self.phase(ctx, 2, "keyring", 10, "Initializing pacman keyring".to_string());
        runner
            .run(&keyring)
            .await
            .map_err(|source| ActionError::ExternalTool {
                phase: KEYRING_PHASE.to_string(),
                source,
            })?;

        self.phase(
            ctx,
            3,
            "bootstrap",
            20,
            format!("Bootstrapping {}", ctx.root_dir().display()),
        );
        if let Err(source) = runner.run(&pacstrap).await {
            dump_pacman_log(ctx).await;
            return Err(ActionError::ExternalTool {
                phase: BOOTSTRAP_PHASE.to_string(),
                source,
            });
        }

        Ok(ActionResult::success(format!(
            "Bootstrapped {}",
            ctx.root_dir().display()
        ))
        .with_output("root_dir", ctx.root_dir())
        .with_output("config_file", &config)
        .with_output("mirrorlist", self.mirror_file.is_some()))
    }
}

/// Copy `source` to `dest` with an explicit mode, creating parent dirs
async fn install_file(source: &Path, dest: &Path, mode: u32) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            ActionError::ExecutionFailed(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    fs::copy(source, dest).await.map_err(|e| {
        ActionError::ExecutionFailed(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            dest.display(),
            e
        ))
    })?;

    fs::set_permissions(dest, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| {
            ActionError::ExecutionFailed(format!(
                "Failed to set permissions on {}: {}",
                dest.display(),
                e
            ))
        })
}

/// Best-effort dump of pacman's log after a failed bootstrap. Errors are
/// logged at debug level and dropped.
async fn dump_pacman_log(ctx: &BuildContext) {
    let log = ctx.rootfs_path(PACMAN_LOG_PATH);
    let cat = ToolCommand::new("pacstrap.log", "cat").arg_path(&log);
    if let Err(e) = ctx.command_runner().run(&cat).await {
        debug!(path = %log.display(), error = %e, "Could not dump pacman log");
    }
}
