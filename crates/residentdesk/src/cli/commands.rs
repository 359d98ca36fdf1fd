//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::records::Collection;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on (overrides `server.bind`)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Which collection to print
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Only show the most recent N records
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Collection selector for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectionArg {
    /// Resident feedback
    Feedback,
    /// Maintenance tickets
    Tickets,
    /// Housing-block reference list
    Housing,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Feedback => Self::Feedback,
            CollectionArg::Tickets => Self::Tickets,
            CollectionArg::Housing => Self::Housing,
        }
    }
}

/// Configuration management commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to configuration file (uses default if not specified)
        file: Option<PathBuf>,
    },
}
