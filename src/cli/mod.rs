//! CLI Module
//!
//! Command-line interface for the time-stretch engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MPC2000XL time-stretch tool
#[derive(Parser, Debug)]
#[command(name = "mpc-stretch-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Stretch parameters shared by `stretch` and `batch`
///
/// Absent values fall back to the engine config defaults.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct StretchArgs {
    /// Output duration as a percentage of the input (50-200)
    #[arg(short, long)]
    pub ratio: Option<i64>,

    /// Quality tier: A, B or C
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Algorithm index (0-17)
    #[arg(short, long)]
    pub algorithm: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Time-stretch one audio file
    #[command(name = "stretch")]
    Stretch {
        /// Input audio file (WAV, or MP3 with the mp3 feature)
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        #[command(flatten)]
        args: StretchArgs,
    },

    /// Time-stretch every WAV file under a directory
    #[command(name = "batch")]
    Batch {
        /// Directory to scan recursively
        input_dir: PathBuf,

        /// Directory for the stretched files (mirrors the input layout)
        output_dir: PathBuf,

        #[command(flatten)]
        args: StretchArgs,
    },

    /// List the algorithm slots
    #[command(name = "algorithms")]
    Algorithms {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print level and frequency measurements for a file
    #[command(name = "analyze")]
    Analyze {
        /// Audio file to measure
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
