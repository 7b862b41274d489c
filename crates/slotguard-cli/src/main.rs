mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Check { contract, run } => commands::check::run_check_command(&contract, &run)?,
        Commands::Demo { run } => commands::demo::run_demo_command(&run)?,
        Commands::Smt { contract, depth } => commands::smt::run_smt_command(&contract, depth)?,
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
