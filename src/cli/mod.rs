//! CLI module for Klipp.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Klipp - Segment selection and sequencing for video assembly
///
/// Turns pools of time-stamped speech segments into a deduplicated,
/// duration-bounded, coherently ordered script. The name "Klipp" comes from
/// the Norwegian word for "cut."
#[derive(Parser, Debug)]
#[command(name = "klipp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Klipp and write a default configuration file
    Init,

    /// Score every segment in a script against a topic prompt
    Score {
        /// Input script file
        input: PathBuf,

        /// Output script file (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Topic prompt to score relevance against
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Cluster near-duplicate takes and keep one canonical take per cluster
    Dedupe {
        /// Input script file
        input: PathBuf,

        /// Output script file (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Topic prompt, used if the input still needs scoring
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Build a highlight reel: score, dedupe, rank, rerank, expand, trim
    Reel {
        /// Input script file
        input: PathBuf,

        /// Output script file
        #[arg(short, long)]
        output: PathBuf,

        /// Topic prompt to score relevance against
        #[arg(short, long)]
        topic: Option<String>,

        /// Duration budget in seconds (overrides configuration)
        #[arg(short, long)]
        budget: Option<f64>,
    },

    /// Reorder speaker-labelled segments into an alternating conversation
    Dialogue {
        /// Input script file
        input: PathBuf,

        /// Output script file
        #[arg(short, long)]
        output: PathBuf,

        /// Topic prompt, used if the input still needs scoring
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Reorder segments into a narratively coherent story
    Story {
        /// Input script file
        input: PathBuf,

        /// Output script file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the active configuration
    Show,
    /// Print the configuration file path
    Path,
}
