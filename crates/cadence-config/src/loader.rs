//! Configuration loader.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::schema::Config;

/// Relative path tried first by [`ConfigLoader::default_path`].
pub const DEFAULT_CONFIG_PATH: &str = "config/cadence.toml";

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(e),
        })?;
        let config = Self::load_str(&content)?;
        debug!(path = %path.display(), jobs = config.jobs.len(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        Self::expand_paths(&mut config);
        Ok(config)
    }

    /// `config/cadence.toml` when it exists, otherwise
    /// `<config dir>/cadence/cadence.toml`.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(DEFAULT_CONFIG_PATH);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("cadence").join("cadence.toml"))
            .unwrap_or(local)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        let mut result = String::with_capacity(content.len());
        let mut last = 0;
        for cap in re.captures_iter(content) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let value = std::env::var(name.as_str())
                .map_err(|_| ConfigError::EnvVarNotSet(name.as_str().to_string()))?;
            result.push_str(&content[last..whole.start()]);
            result.push_str(&value);
            last = whole.end();
        }
        result.push_str(&content[last..]);

        Ok(result)
    }

    fn expand_paths(config: &mut Config) {
        if let Some(dir) = config.logging.directory.as_mut() {
            *dir = Self::expand_path(dir);
        }
        for job in &mut config.jobs {
            if let Some(dir) = job.working_dir.as_mut() {
                *dir = Self::expand_path(dir);
            }
        }
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}
