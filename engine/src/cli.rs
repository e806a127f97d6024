//! CLI interface for Confidant
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Confidant emotional-support chat bot
///
/// Relays Telegram conversations to a hosted language model and serves a
/// small HTTP status endpoint for uptime monitors.
#[derive(Parser, Debug)]
#[command(name = "confidant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The selected subcommand, `start` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Start)
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the status server and the Telegram bot (default)
    Start,

    /// Run one exchange through the full pipeline and print the reply
    Ask {
        /// Message text, as a user would send it
        text: String,

        /// Numeric user id the exchange is recorded under
        #[arg(long, default_value = "0")]
        user: u64,
    },

    /// Print the effective configuration
    Config,
}
