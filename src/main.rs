//! wineq: wine quality model comparison
//!
//! Loads the red and white wine files, tunes seven classifiers with grid
//! search and writes the comparison report.

use clap::Parser;
use wine_quality::cli::{cmd_explore, cmd_info, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wine_quality=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(&args)?,
        Commands::Explore(args) => cmd_explore(&args)?,
        Commands::Info { data } => cmd_info(&data)?,
    }

    Ok(())
}
