// imagesmith: build a root filesystem from a declarative recipe
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

use std::io::stderr;

mod cmd;

use cmd::build::RecipeArgs;

// Define the command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Declarative root filesystem builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output - shows more detailed logs
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a recipe and every file it references, without building.
    Verify(RecipeArgs),
    /// Verify the recipe, then run its actions against the root directory.
    Build(RecipeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Respect RUST_LOG, fall back to verbose/info for our crates
    let level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!(
        "imagesmith={level},imagesmith_actions={level},imagesmith_recipe={level}",
        level = level
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    registry()
        .with(filter)
        .with(fmt::layer().with_writer(stderr))
        .init();

    match cli.command {
        Commands::Verify(args) => cmd::build::run_verify(args).await,
        Commands::Build(args) => cmd::build::run_build(args).await,
    }
}
