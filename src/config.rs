//! Layered settings: built-in defaults, then the YAML file, then
//! `FARMSYNC_*` environment variables. Every value remembers which layer
//! it came from so `farmsync config show` can explain it.

use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::farmos::Credentials;

pub const ENV_DATABASE_PATH: &str = "FARMSYNC_DATABASE_PATH";
pub const ENV_HOSTNAME: &str = "FARMSYNC_HOSTNAME";
pub const ENV_USERNAME: &str = "FARMSYNC_USERNAME";
pub const ENV_PASSWORD: &str = "FARMSYNC_PASSWORD";
pub const ENV_TIMEOUT_SECS: &str = "FARMSYNC_TIMEOUT_SECS";

const APP_DIR: &str = "farmsync";
const CONFIG_FILE_NAME: &str = "config.yaml";
const DATABASE_FILE_NAME: &str = "farmsync.db";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Layer a setting was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting plus the layer that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    fn fallback(value: T) -> Self {
        Self::new(value, ConfigSource::Default)
    }

    fn replace(&mut self, value: Option<T>, source: ConfigSource) {
        if let Some(value) = value {
            *self = Self::new(value, source);
        }
    }
}

/// Connection settings for the farmOS instance.
#[derive(Debug, Clone, Serialize)]
pub struct FarmOsConfig {
    /// Host without protocol, e.g. `farm.example.com`.
    pub hostname: ConfigValue<Option<String>>,
    pub username: ConfigValue<Option<String>>,
    #[serde(serialize_with = "mask_secret")]
    pub password: ConfigValue<Option<String>>,
    pub timeout_secs: ConfigValue<u64>,
}

impl Default for FarmOsConfig {
    fn default() -> Self {
        Self {
            hostname: ConfigValue::fallback(None),
            username: ConfigValue::fallback(None),
            password: ConfigValue::fallback(None),
            timeout_secs: ConfigValue::fallback(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl FarmOsConfig {
    /// `None` unless hostname, username and password are all set.
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials::new(
            self.hostname.value.clone()?,
            self.username.value.clone()?,
            self.password.value.clone()?,
        ))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.value)
    }
}

fn mask_secret<S: Serializer>(
    secret: &ConfigValue<Option<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    ConfigValue::new(secret.value.as_ref().map(|_| "****"), secret.source).serialize(serializer)
}

/// Effective configuration for one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub database_path: ConfigValue<PathBuf>,
    /// The file that was read, if one existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub farmos: FarmOsConfig,
}

/// On-disk shape of `config.yaml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    database_path: Option<PathBuf>,
    farmos: FileFarmOs,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileFarmOs {
    hostname: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: Option<u64>,
}

impl Config {
    /// Reads `config_path` (or the platform default) and the process
    /// environment.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`] with a custom environment lookup.
    pub fn load_with(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self {
            database_path: ConfigValue::fallback(Self::default_database_path()),
            config_file: None,
            farmos: FarmOsConfig::default(),
        };

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            config.apply_file(&path)?;
        }
        config.apply_env(env)?;

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // An empty file parses as null; treat it like an empty mapping.
        let settings: FileSettings = if contents.trim().is_empty() {
            FileSettings::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let database_path = settings.database_path.map(|p| base.join(p));
        self.database_path.replace(database_path, ConfigSource::File);

        let farmos = &mut self.farmos;
        let file = settings.farmos;
        farmos.hostname.replace(file.hostname.map(Some), ConfigSource::File);
        farmos.username.replace(file.username.map(Some), ConfigSource::File);
        farmos.password.replace(file.password.map(Some), ConfigSource::File);
        farmos.timeout_secs.replace(file.timeout_secs, ConfigSource::File);

        self.config_file = Some(path.to_path_buf());
        Ok(())
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());

        self.database_path
            .replace(var(ENV_DATABASE_PATH).map(PathBuf::from), ConfigSource::Environment);

        let farmos = &mut self.farmos;
        farmos.hostname.replace(var(ENV_HOSTNAME).map(Some), ConfigSource::Environment);
        farmos.username.replace(var(ENV_USERNAME).map(Some), ConfigSource::Environment);
        farmos.password.replace(var(ENV_PASSWORD).map(Some), ConfigSource::Environment);

        if let Some(raw) = var(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            farmos.timeout_secs.replace(Some(secs), ConfigSource::Environment);
        }

        Ok(())
    }

    /// `config.yaml` in the platform config dir, e.g. `~/.config/farmsync/`.
    pub fn default_config_path() -> PathBuf {
        app_dir(dirs::config_dir()).join(CONFIG_FILE_NAME)
    }

    /// `farmsync.db` in the platform data dir, e.g. `~/.local/share/farmsync/`.
    pub fn default_database_path() -> PathBuf {
        app_dir(dirs::data_dir()).join(DATABASE_FILE_NAME)
    }
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}
