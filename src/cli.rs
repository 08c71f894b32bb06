//! Command-line interface for chessduel.

use chessduel::game::{Difficulty, PlayerColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chessduel - play chess against an engine or a friend
#[derive(Parser, Debug)]
#[command(name = "chessduel")]
#[command(about = "Terminal chess against Stockfish or a remote player", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Relay server URL, overriding the saved setting
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Store the overrides given on this command line as the new defaults
    #[arg(long, global = true)]
    pub save: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play against the analysis engine
    Bot {
        /// Side to play (white or black)
        #[arg(long)]
        color: Option<PlayerColor>,

        /// Engine strength, 0 to 20
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=20), conflicts_with = "preset")]
        difficulty: Option<u8>,

        /// Named strength preset
        #[arg(long, value_enum)]
        preset: Option<Difficulty>,

        /// Engine executable
        #[arg(long)]
        engine: Option<PathBuf>,

        /// Skip background evaluation
        #[arg(long)]
        no_eval: bool,
    },

    /// Create a room and play white
    Host,

    /// Join a room by code and play black
    Join {
        /// Room code shared by the host
        code: String,
    },
}
