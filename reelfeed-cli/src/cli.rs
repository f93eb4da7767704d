use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "reelfeed")]
#[command(about = "Preload, warm up and inspect a property video feed")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend API root, overrides the configuration file
    #[arg(long, global = true, env = "REELFEED_API_BASE")]
    pub api_base: Option<String>,

    /// Bearer token for the engagement endpoints
    #[arg(long, global = true, env = "REELFEED_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the first feed page and warm its leading items
    Feed {
        /// Ignore the cached page
        #[arg(long)]
        force: bool,

        /// Page size, overrides the configuration file
        #[arg(long)]
        per_page: Option<u32>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Issue ranged requests to pre-open connections for video URLs
    Warmup {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Bytes requested per URL
        #[arg(long)]
        bytes: Option<u64>,

        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List subtitle tracks of an HLS master playlist, or print cues
    Subtitles {
        master_url: String,

        /// Load cues for this language
        #[arg(short, long)]
        language: Option<String>,

        /// Print only the cue active at this position (seconds)
        #[arg(long, requires = "language")]
        at: Option<f64>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Toggle the like state of a video, or of a property with --property
    Like {
        id: String,

        #[arg(long)]
        property: bool,
    },

    /// Show locally stored likes
    Likes,

    /// Show the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}
