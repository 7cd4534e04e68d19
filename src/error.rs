//! Error types for TracMath
//!
//! All modules use `TracMathResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for TracMath operations
pub type TracMathResult<T> = Result<T, TracMathError>;

/// All errors that can occur in TracMath
#[derive(Error, Debug)]
pub enum TracMathError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Could not create cache directory {path}: {source}")]
    CacheDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find {tool} binary at {path}")]
    BinaryNotFound { tool: &'static str, path: PathBuf },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Render errors
    #[error("Unknown macro {0}")]
    UnknownMacro(String),

    #[error("Forbidden command found in LaTeX source: {command}")]
    Validation { command: String },

    #[error("Problem creating tex file {path}: {source}")]
    Build {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to call: {command}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    Toolchain {
        command: String,
        stdout: String,
        stderr: String,
    },

    #[error("Command timed out after {}s: {command}", .timeout.as_secs())]
    ToolchainTimeout { command: String, timeout: Duration },

    #[error("Failed to spawn: {command}")]
    ToolchainSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Fetch errors
    #[error("Cache entry not found: {0}")]
    NotFound(String),

    #[error("Invalid cache entry name: {0}")]
    InvalidName(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TracMathError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a toolchain failure from a command line and its captured streams
    pub fn toolchain(
        command: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Toolchain {
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Check if the error stems from configuration rather than the formula
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid { .. }
                | Self::CacheDirCreate { .. }
                | Self::BinaryNotFound { .. }
                | Self::ConfigDirCreate { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::BinaryNotFound { tool: "latex", .. } => {
                Some("Install a TeX distribution or set render.latex_cmd")
            }
            Self::BinaryNotFound { tool: "dvipng", .. } => {
                Some("Install dvipng or set render.dvipng_cmd")
            }
            Self::CacheDirCreate { .. } => Some("Check render.cache_dir and its permissions"),
            Self::ConfigInvalid { .. } => Some("Run: tracmath config init --force"),
            Self::Validation { .. } => {
                Some("File access and macro definitions are not allowed in formulas")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TracMathError::Validation {
            command: "\\input".to_string(),
        };
        assert!(err.to_string().contains("\\input"));
    }

    #[test]
    fn toolchain_display_includes_streams() {
        let err = TracMathError::toolchain("latex -interaction=nonstopmode a.tex", "", "boom");
        let msg = err.to_string();
        assert!(msg.contains("latex -interaction=nonstopmode a.tex"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn error_hint() {
        let err = TracMathError::BinaryNotFound {
            tool: "dvipng",
            path: PathBuf::from("/nope"),
        };
        assert_eq!(err.hint(), Some("Install dvipng or set render.dvipng_cmd"));
    }

    #[test]
    fn error_is_config() {
        assert!(TracMathError::BinaryNotFound {
            tool: "latex",
            path: PathBuf::from("/nope"),
        }
        .is_config());
        assert!(!TracMathError::UnknownMacro("tex".to_string()).is_config());
    }
}
