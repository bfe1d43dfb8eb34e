//! CLI command definitions for the `pflow` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod diagram;
pub mod run;
pub mod status;
pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run PlantUML activity diagrams as workflows.
#[derive(Parser)]
#[command(name = "pflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of `{data_dir}/config.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding stored workflows.
    #[arg(long, global = true, env = "PLANTFLOW_HOME")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a diagram and print the resulting graph without storing it.
    Parse {
        /// Diagram file (`-` for stdin).
        file: PathBuf,

        /// Workflow id (defaults to a fresh UUID).
        #[arg(long)]
        id: Option<String>,

        /// Workflow name (defaults to the diagram title).
        #[arg(long)]
        name: Option<String>,
    },

    /// Parse a diagram and store it.
    Import {
        /// Diagram file (`-` for stdin).
        file: PathBuf,

        /// Workflow id (defaults to the file stem).
        #[arg(long)]
        id: Option<String>,

        /// Workflow name (defaults to the diagram title).
        #[arg(long)]
        name: Option<String>,
    },

    /// List stored workflows.
    #[command(alias = "ls")]
    List,

    /// Show a stored workflow's nodes and transitions.
    Show {
        /// Workflow id.
        id: String,
    },

    /// Delete a stored workflow.
    #[command(alias = "rm")]
    Delete {
        /// Workflow id.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Walk a workflow interactively.
    Run(run::RunArgs),

    /// Data directory, config and registered actions.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pflow", "list", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn parses_run_choices() {
        let cli = Cli::try_parse_from([
            "pflow", "run", "flow.puml", "--choose", "yes", "--choose", "2", "--set", "x=1",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.target, "flow.puml");
        assert_eq!(args.choose, vec!["yes", "2"]);
        assert_eq!(args.set, vec![("x".to_string(), "1".to_string())]);
    }
}
