//! CLI argument definitions for Fleet.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "fleet",
    version,
    about = "Build monorepo packages in dependency order",
    long_about = "Fleet builds the packages declared in fleet.toml, running independent \
                  packages in parallel and never starting a package before everything it \
                  depends on has built successfully."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Package selection shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct Selection {
    /// Select packages whose names match this glob (repeatable)
    #[arg(short, long = "package", value_name = "GLOB")]
    pub packages: Vec<String>,

    /// Select every package (the default when no -p is given)
    #[arg(long, conflicts_with = "packages")]
    pub all: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the selected packages
    Build {
        #[command(flatten)]
        selection: Selection,
        /// Maximum number of concurrent builds
        #[arg(short, long, env = "FLEET_JOBS")]
        jobs: Option<u32>,
        /// Build number substituted for NEXT in version templates
        #[arg(long, env = "FLEET_BUILD_NUMBER")]
        build_number: Option<u64>,
        /// Per-package build timeout in seconds (0 disables)
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the working set and build batches without building
    Plan {
        #[command(flatten)]
        selection: Selection,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the dependency graph of the selected packages
    Graph {
        #[command(flatten)]
        selection: Selection,
        /// Print the graph in Graphviz DOT format
        #[arg(long, conflicts_with = "json")]
        dot: bool,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse command-line arguments.
pub fn parse() -> Cli {
    Cli::parse()
}
