//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Shopsync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Shopsync - ERP to Shopify catalog reconciliation
#[derive(Parser, Debug)]
#[command(name = "shopsync")]
#[command(version, about, long_about = None)]
#[command(author = "Shopsync Contributors")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SHOPSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit log lines as JSON instead of the compact console format
    #[arg(long, env = "SHOPSYNC_LOG_JSON")]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the ERP catalog into the storefront
    Sync(commands::sync::SyncArgs),

    /// Delete every synced entity from the storefront
    Wipe(commands::wipe::WipeArgs),
}
