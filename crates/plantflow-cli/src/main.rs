//! PlantFlow command-line entry point.
//!
//! Binary name: `pflow`
//!
//! Parses CLI arguments, loads `config.toml`, initializes tracing and the
//! engine, then dispatches to the command handler.

mod cli;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use plantflow_infra::config::load_engine_config;
use plantflow_infra::engine::Engine;
use plantflow_infra::filesystem::{config_path, resolve_data_dir};
use plantflow_observe::tracing_setup::verbosity_directive;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need the engine
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "pflow", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir: PathBuf = cli.data_dir.clone().unwrap_or_else(resolve_data_dir);
    let config_file = cli.config.clone().unwrap_or_else(|| config_path(&data_dir));
    let config = load_engine_config(&config_file).await;

    let level = if cli.quiet {
        Some("error")
    } else {
        verbosity_directive(cli.verbose)
    };
    plantflow_observe::init_tracing(&config.logging, level)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli, data_dir, config).await;
    plantflow_observe::shutdown_tracing();
    result
}

async fn run(
    cli: Cli,
    data_dir: PathBuf,
    config: plantflow_types::config::EngineConfig,
) -> anyhow::Result<()> {
    let engine = Engine::with_config(data_dir.clone(), config)
        .await
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;

    match cli.command {
        Commands::Parse { file, id, name } => {
            cli::diagram::parse(&file, id.as_deref(), name.as_deref(), cli.json).await?;
        }

        Commands::Import { file, id, name } => {
            cli::diagram::import(&engine, &file, id.as_deref(), name.as_deref(), cli.json, cli.quiet)
                .await?;
        }

        Commands::List => {
            cli::workflow::list(&engine, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::workflow::show(&engine, &id, cli.json).await?;
        }

        Commands::Delete { id, force } => {
            cli::workflow::delete(&engine, &id, force, cli.json).await?;
        }

        Commands::Run(args) => {
            cli::run::run(&engine, args, cli.json).await?;
        }

        Commands::Status => {
            cli::status::status(&engine, cli.json).await?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
