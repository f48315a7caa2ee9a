//! Command structures and arg parsing (via clap).

use std::path::PathBuf;

use clap::{Command, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "busmap",
    author,
    version,
    about = "Infer bus-interface structure from a flat module port list",
    long_about = None
)]
pub struct Cli {
    /// Logging verbosity
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Propose bus-interface mappings for a component's ports against a bus-definition library
    Propose {
        /// Input component.json5 with the port list of the top-level module
        component_json5: PathBuf,

        /// Root directory of bus-definition spec files (JSON5, `abstractionDefinition`)
        #[arg(short = 'b', long = "bus-def-dir", value_name = "DIR")]
        bus_def_dir: PathBuf,

        /// Output path for the proposed bus mappings (default: stdout)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Include per-signal cost breakdown alongside the proposed mapping
        #[arg(long)]
        debug: bool,

        /// Suppress the progress bar (also disabled automatically when stderr isn't a terminal)
        #[arg(long)]
        no_progress: bool,
    },

    /// Group a component's ports into a hierarchical bundle tree, with no bus-def matching
    Bundle {
        /// Input component.json5 with the port list of the top-level module
        component_json5: PathBuf,

        /// Output path for the bundle tree (default: stdout)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Build the underlying [`clap::Command`], for shell-completion generation
/// and `--help` rendering outside of [`Cli::parse`].
pub fn build_cli_command() -> Command {
    use clap::CommandFactory;
    Cli::command()
}
