//! `resdesk` - CLI for residentdesk
//!
//! This binary runs the resident web forms and inspects the collected
//! feedback and maintenance tickets.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use residentdesk::cli::{Cli, CollectionArg, Command, ConfigCommand, ListCommand};
use residentdesk::{init_logging, open_store, server, Collection, Config, Desk};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Config commands inspect the file itself, so they run before loading it.
    let config_path = cli.config;
    match cli.command {
        Command::Config(config_cmd) => handle_config(config_path, config_cmd),
        Command::Serve(serve_cmd) => {
            let (config, desk) = open_desk(config_path)?;
            let addr = serve_cmd.bind.unwrap_or(config.server.bind);
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime.block_on(server::serve(&addr, desk))?;
            Ok(())
        }
        Command::Init => {
            let (_, desk) = open_desk(config_path)?;
            desk.initialize()?;
            let store = desk.store();
            println!("{} stores ready at {}", store.backend(), store.location());
            Ok(())
        }
        Command::Status(status_cmd) => handle_status(&open_desk(config_path)?.1, status_cmd.json),
        Command::List(list_cmd) => handle_list(&open_desk(config_path)?.1, &list_cmd),
    }
}

fn open_desk(config_path: Option<PathBuf>) -> anyhow::Result<(Config, Desk)> {
    let config = Config::load_from(config_path).context("loading configuration")?;
    let store = open_store(&config).context("opening store")?;
    let desk = Desk::new(store, config.housing.default_blocks.clone());
    Ok((config, desk))
}

fn handle_status(desk: &Desk, json: bool) -> anyhow::Result<()> {
    let stats = desk.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("resdesk status");
        println!("--------------");
        println!("Backend:        {}", stats.backend);
        println!("Location:       {}", stats.location);
        println!("Feedback:       {}", stats.feedback);
        println!("Tickets:        {}", stats.tickets);
        println!("Housing blocks: {}", stats.housing_blocks);
    }
    Ok(())
}

/// Keep only the newest `limit` records.
fn tail<T>(mut records: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }
    records
}

fn print_json<T: Serialize>(records: &[T]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}

fn handle_list(desk: &Desk, cmd: &ListCommand) -> anyhow::Result<()> {
    let collection = Collection::from(cmd.collection);
    match cmd.collection {
        CollectionArg::Feedback => {
            let records = tail(desk.feedback()?, cmd.limit);
            if cmd.json {
                return print_json(&records);
            }
            for r in &records {
                println!("{}  {}/5  {}", r.timestamp, r.rating, r.description);
            }
            if records.is_empty() {
                println!("No {collection} recorded.");
            }
        }
        CollectionArg::Tickets => {
            let records = tail(desk.tickets()?, cmd.limit);
            if cmd.json {
                return print_json(&records);
            }
            for t in &records {
                println!("{}  {} / {}", t.timestamp, t.housing, t.room);
                println!("    {}", t.problem);
                if !t.time_available.is_empty() {
                    println!("    available: {}", t.time_available);
                }
            }
            if records.is_empty() {
                println!("No {collection} recorded.");
            }
        }
        CollectionArg::Housing => {
            let blocks = tail(desk.housing_blocks()?, cmd.limit);
            if cmd.json {
                return print_json(&blocks);
            }
            for block in &blocks {
                println!("{block}");
            }
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind:           {}", config.server.bind);
                println!();
                println!("[Storage]");
                println!("  Backend:        {:?}", config.storage.backend);
                println!("  Data dir:       {}", config.data_dir().display());
                println!("  Database path:  {}", config.database_path().display());
                println!();
                println!("[Housing]");
                println!(
                    "  Default blocks: {}",
                    config.housing.default_blocks.join(", ")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
