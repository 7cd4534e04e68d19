//! Configuration management for TracMath

pub mod schema;

pub use schema::{Config, GeneralConfig, OutputPolicy, RenderConfig, ServerConfig};

use crate::error::{TracMathError, TracMathResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tracmath")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults if the file is missing
    ///
    /// A relative `render.cache_dir` is resolved against the directory
    /// holding the config file, or the working directory without one.
    pub async fn load(&self) -> TracMathResult<Config> {
        let (mut config, base) = if self.config_path.exists() {
            let config = self.load_from_file(&self.config_path).await?;
            let base = self
                .config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            (config, base)
        } else {
            warn!(
                "No config at {}, using defaults",
                self.config_path.display()
            );
            let base = std::env::current_dir()
                .map_err(|e| TracMathError::io("getting current directory", e))?;
            (Config::default(), base)
        };

        config.render.cache_dir = resolve_against(&base, &config.render.cache_dir);
        debug!("Cache directory: {}", config.render.cache_dir.display());
        Ok(config)
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> TracMathResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TracMathError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| TracMathError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> TracMathResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            TracMathError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> TracMathResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TracMathError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.render.cache_dir, PathBuf::from("/tmp/tracmath"));
        assert_eq!(config.render.max_png, 500);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.render.max_png = 42;
        config.render.use_dollars = true;

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.render.max_png, 42);
        assert!(loaded.render.use_dollars);
    }

    #[tokio::test]
    async fn relative_cache_dir_resolves_next_to_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[render]\ncache_dir = \"math-cache\"\n").unwrap();

        let config = ConfigManager::with_path(path).load().await.unwrap();
        assert_eq!(config.render.cache_dir, temp.path().join("math-cache"));
    }

    #[tokio::test]
    async fn invalid_toml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[render]\nmax_png = \"many\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone())
            .load()
            .await
            .unwrap_err();
        match err {
            TracMathError::ConfigInvalid { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }
}
