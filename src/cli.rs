//! Command-line interface for gridguess.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gridguess - two-player country-grid guessing game
#[derive(Parser, Debug)]
#[command(name = "gridguess")]
#[command(about = "Turn-based country-grid guessing game", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (falls back to GRIDGUESS_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// JSON file with entity data sets and setups
    #[arg(long, global = true, default_value = "demos/gridguess_data.json")]
    pub data: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the winning lines for a board size
    Formations {
        /// Board size
        #[arg(short, long, default_value = "3")]
        size: usize,
    },

    /// Create the database and apply migrations
    InitDb,

    /// Start a new game
    NewGame {
        /// Session the game counts toward
        #[arg(long)]
        session: String,

        /// User for player 0
        #[arg(long)]
        first_seat: String,

        /// User for player 1
        #[arg(long)]
        second_seat: String,

        /// Game id (generated if omitted)
        #[arg(long)]
        game_id: Option<String>,

        /// Entity language (config default if omitted)
        #[arg(long)]
        language: Option<String>,

        /// Difficulty filter: easy, medium or hard
        #[arg(long)]
        difficulty: Option<String>,

        /// Play mode: online or same_device
        #[arg(long)]
        mode: Option<String>,

        /// Player to move first, 0 or 1 (random if omitted)
        #[arg(long)]
        first: Option<u8>,
    },

    /// Submit an action
    Submit {
        /// Game id
        game_id: String,

        /// Acting user
        #[arg(long)]
        user: String,

        /// Turn counter last observed
        #[arg(long)]
        counter: u64,

        /// Action as JSON, e.g. {"type":"move","x":1,"y":2,"entity":"FR"}
        #[arg(long)]
        action: String,
    },

    /// Show a game
    Show {
        /// Game id
        game_id: String,

        /// Print the full JSON snapshot
        #[arg(long)]
        json: bool,
    },

    /// Show a session's scores
    Scores {
        /// Session id
        session: String,
    },

    /// Rebuild a game from its history and compare with the stored record
    Replay {
        /// Game id
        game_id: String,
    },
}
