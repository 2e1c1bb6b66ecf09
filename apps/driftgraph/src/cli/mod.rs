//! # driftgraph CLI Module
//!
//! This module implements the CLI interface for driftgraph.
//!
//! ## Available Commands
//!
//! - `inspect` - Summarize a stream's header and classifications
//! - `nodes` - List the node sequence of a stream
//! - `manifest` - Show what decoding a stream ignored
//! - `sample` - Write a demonstration stream

mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use driftgraph_core::DriftError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// driftgraph - object graph stream inspector
///
/// Reads streams written by driftgraph-core and reports how they resolve
/// against the built-in catalog.
#[derive(Parser, Debug)]
#[command(name = "driftgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// TOML file with serializer options
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep the values of removed properties for display
    #[arg(long, global = true)]
    pub preview_removed: bool,

    /// Log every dropped removed property at warn level
    #[arg(long, global = true)]
    pub warn_removed: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize header and classifications of a stream
    Inspect {
        /// Path to the stream file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the nodes of a stream in write order
    Nodes {
        /// Path to the stream file
        #[arg(short, long)]
        file: PathBuf,

        /// Print at most this many nodes
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the ignored types and properties of a stream
    Manifest {
        /// Path to the stream file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write the demonstration graph
    Sample {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Write with the previous catalog generation
        #[arg(long)]
        legacy: bool,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), DriftError> {
    let mut config = load_config(cli.config.as_deref())?;
    if cli.preview_removed {
        config.preview_removed_properties = true;
    }
    if cli.warn_removed {
        config.ignore_removed_properties = false;
    }
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Inspect { file }) => cmd_inspect(&file, &config, json_mode),
        Some(Commands::Nodes { file, limit }) => cmd_nodes(&file, &config, json_mode, limit),
        Some(Commands::Manifest { file }) => cmd_manifest(&file, &config, json_mode),
        Some(Commands::Sample {
            output,
            legacy,
            force,
        }) => cmd_sample(&output, legacy, force, json_mode),
        None => Cli::command()
            .print_help()
            .map_err(|e| DriftError::IoError(e.to_string())),
    }
}
