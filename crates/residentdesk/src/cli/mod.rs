//! Command-line interface for residentdesk.
//!
//! This module provides the CLI structure for the `resdesk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{CollectionArg, ConfigCommand, ListCommand, ServeCommand, StatusCommand};

/// resdesk - Resident feedback and maintenance tickets
///
/// Serves the feedback and ticket forms for a housing complex and inspects
/// the submissions they have collected.
#[derive(Debug, Parser)]
#[command(name = "resdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server
    Serve(ServeCommand),

    /// Create any missing store
    Init,

    /// Show store location and record counts
    Status(StatusCommand),

    /// Print stored records
    List(ListCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
