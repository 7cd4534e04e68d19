//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// TracMath - LaTeX formulas for wiki pages
///
/// Renders LaTeX snippets into cached PNG images and serves them over HTTP.
#[derive(Parser, Debug)]
#[command(name = "tracmath")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TRACMATH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a formula (or wiki markup) and print the HTML fragment
    Render(RenderArgs),

    /// Serve cached images over HTTP
    Serve(ServeArgs),

    /// Write a cached image to a file or stdout
    Fetch(FetchArgs),

    /// Check binaries and cache directory
    Status,

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Manage the image cache
    Cache(CacheArgs),
}

/// Arguments for the render command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Input file (reads stdin when omitted)
    pub input: Option<PathBuf>,

    /// Macro name to invoke
    #[arg(short, long, default_value = "latex")]
    pub r#macro: String,

    /// Treat input as wiki markup and expand every formula in it
    #[arg(long)]
    pub markup: bool,

    /// Base URL for generated image links
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address (defaults to server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Cache entry name (`<key>.png`) or request path (`/tracmath/<key>.png`)
    pub name: String,

    /// Output file (writes to stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for cache listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached images, oldest first
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Sweep intermediates and evict images over the limit
    Prune,

    /// Delete every cached image
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
