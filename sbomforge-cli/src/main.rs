//! sbomforge -- SPDX build manifest generator and validator.
//!
//! Loads `sbomforge.toml` (or built-in defaults), initialises logging
//! and dispatches to one command handler per subcommand.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_deref();

    // `config validate` reports load failures itself, so defer the error.
    let loaded = commands::load_config(config_path).await;
    let mut general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = cli.log_level {
        general.log_level = level;
    }
    logging::init_tracing(&general)?;

    sbomforge_core::metrics::describe_all();

    match cli.command {
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
        Commands::Generate(args) => commands::generate::execute(args, &loaded?, &writer).await,
        Commands::Validate(args) => commands::validate::execute(args, &loaded?, &writer).await,
        Commands::Aggregate(args) => commands::aggregate::execute(args, &loaded?, &writer).await,
    }
}
