//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wagerbot::{ChatId, Config, ParticipantId, Result};

/// Command-line interface definition for WagerBot
#[derive(Parser)]
#[command(name = "wagerbot")]
#[command(about = "Wager games for group chats: dice, connect four and battleship")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the data directory from the configuration
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Available commands for the WagerBot CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Read JSON actions from stdin and print transport calls to stdout
    Run,

    /// List stored game sessions
    Sessions,

    /// Remove every finished game session
    CleanGames,

    /// Show a member's points balance
    Balance {
        #[arg(long, allow_hyphen_values = true)]
        room: i64,
        #[arg(long)]
        participant: i64,
    },
}

impl Commands {
    /// Get the command name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Run => "run",
            Commands::Sessions => "sessions",
            Commands::CleanGames => "clean-games",
            Commands::Balance { .. } => "balance",
        }
    }
}

impl Cli {
    /// Load the configuration and apply command-line overrides
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.bot.data_dir = dir.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Room and participant ids from raw numbers
pub fn balance_key(room: i64, participant: i64) -> (ChatId, ParticipantId) {
    (ChatId(room), ParticipantId(participant))
}
