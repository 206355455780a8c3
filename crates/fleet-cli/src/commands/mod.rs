//! Command dispatch and handler modules.

mod build;
mod graph;
mod plan;

use std::path::PathBuf;

use miette::Result;
use serde::Serialize;

use fleet_ops::RepoContext;
use fleet_util::errors::FleetError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    tracing::debug!(command = ?cli.command, "dispatching");
    match cli.command {
        Command::Build {
            selection,
            jobs,
            build_number,
            timeout_secs,
            json,
        } => build::exec(selection, jobs, build_number, timeout_secs, json).await,
        Command::Plan { selection, json } => plan::exec(selection, json),
        Command::Graph {
            selection,
            dot,
            json,
        } => graph::exec(selection, dot, json),
    }
}

fn current_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir().map_err(FleetError::Io)?)
}

fn load_context() -> Result<RepoContext> {
    RepoContext::load(&current_dir()?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| FleetError::Generic {
        message: format!("Failed to serialize output: {e}"),
    })?;
    println!("{json}");
    Ok(())
}
