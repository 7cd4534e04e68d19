//! Configuration schema for TracMath
//!
//! Configuration is stored at `~/.config/tracmath/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Render pipeline settings
    pub render: RenderConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// How captured process output affects success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputPolicy {
    /// Any output on stdout or stderr fails the step, even with exit code 0
    #[default]
    Strict,
    /// Only a non-zero exit status fails the step
    ExitCode,
}

/// Render pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory holding rendered images and intermediates
    pub cache_dir: PathBuf,

    /// Typesetting engine producing DVI output
    pub latex_cmd: PathBuf,

    /// Rasterizer converting DVI to PNG
    pub dvipng_cmd: PathBuf,

    /// Maximum number of PNG files kept in the cache
    pub max_png: usize,

    /// Magnification passed to dvipng (`-x`)
    pub mag_factor: u32,

    /// Enable `$...$` and `$$...$$` wiki syntax
    pub use_dollars: bool,

    /// Command substrings rejected in formula source
    pub denylist: Vec<String>,

    /// Document head placed before the formula
    pub preamble: String,

    /// Success policy for toolchain output
    pub output_policy: OutputPolicy,

    /// Per-command time limit in seconds (0 = unbounded)
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("/tmp/tracmath"),
            latex_cmd: PathBuf::from("/usr/bin/latex"),
            dvipng_cmd: PathBuf::from("/usr/bin/dvipng"),
            max_png: 500,
            mag_factor: 1200,
            use_dollars: false,
            denylist: default_denylist(),
            preamble: DEFAULT_PREAMBLE.to_string(),
            output_policy: OutputPolicy::Strict,
            timeout_secs: 60,
        }
    }
}

/// Standard document head: AMS packages, bold math, no page numbers
pub const DEFAULT_PREAMBLE: &str = r"\documentclass{article}
\usepackage{amsmath}
\usepackage{amsthm}
\usepackage{amssymb}
\usepackage{bm}
\pagestyle{empty}
\begin{document}
";

/// Commands giving file I/O, macro definition or catcode access
pub fn default_denylist() -> Vec<String> {
    [
        r"\input",
        r"\include",
        r"\openin",
        r"\openout",
        r"\read",
        r"\write",
        r"\immediate",
        r"\newread",
        r"\newwrite",
        r"\def",
        r"\edef",
        r"\gdef",
        r"\xdef",
        r"\newcommand",
        r"\renewcommand",
        r"\providecommand",
        r"\catcode",
        r"\csname",
        r"\usepackage",
        r"\special",
        r"\loop",
        r"\makeatletter",
        "^^",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,

    /// Prefix prepended to generated image URLs
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8642".to_string(),
            base_url: String::new(),
        }
    }
}
