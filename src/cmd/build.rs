//! `verify` and `build` commands
//!
//! Both load the recipe and construct the build context the same way; only
//! `build` goes on to run the actions.

use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use imagesmith_actions::{actions, BuildContext, Pipeline, TracingReporter};
use imagesmith_recipe::Recipe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct RecipeArgs {
    /// Path to the recipe YAML file
    pub recipe: PathBuf,

    /// Root directory of the filesystem to build
    #[arg(long, default_value = "rootfs")]
    pub rootdir: PathBuf,

    /// Log what each action would do without changing anything
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

fn prepare(args: &RecipeArgs) -> Result<(BuildContext, Pipeline)> {
    let loaded = Recipe::load(&args.recipe)
        .wrap_err_with(|| format!("Failed to load recipe {}", args.recipe.display()))?;

    let root_dir = if args.rootdir.is_absolute() {
        args.rootdir.clone()
    } else {
        std::env::current_dir()
            .wrap_err("Failed to determine current directory")?
            .join(&args.rootdir)
    };

    let mut ctx = BuildContext::new(root_dir, loaded.recipe_dir)
        .with_progress_reporter(Arc::new(TracingReporter))
        .with_dry_run(args.dry_run);
    if let Some(arch) = &loaded.recipe.architecture {
        ctx = ctx.with_architecture(arch);
    }
    debug!(context = ?ctx, "Build context ready");

    let pipeline = actions::pipeline_from_recipe(&loaded.recipe);
    Ok((ctx, pipeline))
}

pub async fn run_verify(args: RecipeArgs) -> Result<()> {
    let (ctx, mut pipeline) = prepare(&args)?;

    pipeline
        .verify(&ctx)
        .wrap_err("Recipe verification failed")?;

    println!(
        "Recipe OK: {} action(s) verified ({})",
        pipeline.len(),
        pipeline.action_names().join(", ")
    );
    Ok(())
}

pub async fn run_build(args: RecipeArgs) -> Result<()> {
    let (ctx, mut pipeline) = prepare(&args)?;

    if !ctx.is_dry_run() {
        std::fs::create_dir_all(ctx.root_dir()).wrap_err_with(|| {
            format!("Failed to create root directory {}", ctx.root_dir().display())
        })?;
    }

    info!(root = %ctx.root_dir().display(), steps = pipeline.len(), "Starting build");
    let results = pipeline.build(&ctx).await.wrap_err("Build failed")?;

    for (name, result) in pipeline.action_names().iter().zip(&results) {
        match result.duration {
            Some(elapsed) => println!("{}: {} ({:.1?})", name, result.message, elapsed),
            None => println!("{}: {}", name, result.message),
        }
    }
    println!("Build complete: {}", ctx.root_dir().display());
    Ok(())
}
