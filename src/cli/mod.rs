//! CLI module for VideoMind.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// VideoMind - Ask questions about video transcripts
///
/// Loads a transcript, finds the passages relevant to your question and
/// answers from them with a hosted language model.
#[derive(Parser, Debug)]
#[command(name = "videomind")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
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
    /// Ask one question about a transcript
    Ask {
        /// The question to ask
        question: String,

        /// Transcript file ('-' reads from stdin)
        #[arg(short, long)]
        transcript: String,

        /// Model to use for the answer
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show the transcript passages that best match a query
    Search {
        /// Search query
        query: String,

        /// Transcript file ('-' reads from stdin)
        #[arg(short, long)]
        transcript: String,

        /// Maximum number of results (defaults to the configured top-k)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Start an interactive chat about a transcript
    Chat {
        /// Transcript file
        #[arg(short, long)]
        transcript: String,

        /// Model to use for answers
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List available generation models
    Models,

    /// Start HTTP API server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
