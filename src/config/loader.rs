//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIO";

/// Config file name
const CONFIG_FILE_NAME: &str = "serio.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIO_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIO_CONFIG` environment variable (explicit path)
    /// 2. `./serio.toml` (current directory)
    /// 3. `serio.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override any file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config)?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Defaults plus environment overrides, no file.
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|p| p.exists())
}

/// Platform config directory for serio, e.g. `~/.config/serio`.
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "serio").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default config file path inside [`get_default_config_dir`].
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Parse `SERIO_<key>` if set.
fn env_value<T: FromStr>(key: &str) -> ConfigResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    let var = format!("{ENV_PREFIX}_{key}");
    match std::env::var(&var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::env_parse(var, e.to_string())),
        Err(_) => Ok(None),
    }
}

/// Apply `SERIO_<SECTION>_<KEY>` overrides, e.g. `SERIO_PORT_BAUD_RATE=9600`.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some(v) = env_value("PORT_NAME")? {
        config.port.name = v;
    }
    if let Some(v) = env_value("PORT_BAUD_RATE")? {
        config.port.baud_rate = v;
    }
    if let Some(v) = env_value("PORT_DATA_BITS")? {
        config.port.data_bits = v;
    }
    if let Some(v) = env_value("PORT_STOP_BITS")? {
        config.port.stop_bits = v;
    }
    if let Some(v) = env_value("PORT_PARITY")? {
        config.port.parity = v;
    }
    if let Some(v) = env_value("PORT_READ_TIMEOUT_MS")? {
        config.port.read_timeout_ms = v;
    }

    if let Some(v) = env_value("TIMEOUTS_OPEN_MS")? {
        config.timeouts.open_ms = v;
    }
    if let Some(v) = env_value("TIMEOUTS_WRITE_MS")? {
        config.timeouts.write_ms = v;
    }
    if let Some(v) = env_value("TIMEOUTS_DEADLINE_MS")? {
        config.timeouts.deadline_ms = v;
    }

    if let Some(v) = env_value("LOGGING_LEVEL")? {
        config.logging.level = v;
    }
    if let Some(v) = env_value("LOGGING_FORMAT")? {
        config.logging.format = v;
    }

    Ok(())
}
