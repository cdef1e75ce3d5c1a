use anyhow::{Context, Result, bail};
use iland_api::{ClientConfig, Credentials};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_CLIENT_ID: &str = "ILAND_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ILAND_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "ILAND_USERNAME";
pub const ENV_PASSWORD: &str = "ILAND_PASSWORD";
pub const ENV_API_BASE: &str = "ILAND_API_BASE";
pub const ENV_LOG_LEVEL: &str = "ILAND_LOG_LEVEL";

const CONFIG_FILE: &str = "console.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => bail!("unknown log level: {other}"),
        }
    }
}

/// Settings for the console binary, stored as JSON under `~/.iland`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_base: Option<String>,
    pub token_url: Option<String>,
    pub event_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    pub log_level: LogLevel,
    pub log_to_file: bool,
    pub log_max_files: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            api_base: None,
            token_url: None,
            event_url: None,
            timeout_secs: None,
            log_level: LogLevel::default(),
            log_to_file: false,
            log_max_files: 5,
        }
    }
}

impl ConsoleConfig {
    pub fn config_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to get user home directory")?;
        Ok(home_dir.join(".iland"))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn log_dir() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|_| PathBuf::from(".iland"))
            .join("logs")
    }

    /// Read the config file (a missing file yields defaults), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(target: "console", path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        tracing::debug!(target: "console", path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Overlay values looked up by environment variable name. Empty values are
    /// ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(value) = get(ENV_CLIENT_ID) {
            self.client_id = Some(value);
        }
        if let Some(value) = get(ENV_CLIENT_SECRET) {
            self.client_secret = Some(value);
        }
        if let Some(value) = get(ENV_USERNAME) {
            self.username = Some(value);
        }
        if let Some(value) = get(ENV_PASSWORD) {
            self.password = Some(value);
        }
        if let Some(value) = get(ENV_API_BASE) {
            self.api_base = Some(value);
        }
        if let Some(value) = get(ENV_LOG_LEVEL) {
            self.log_level = value
                .parse()
                .with_context(|| format!("Invalid {ENV_LOG_LEVEL}"))?;
        }
        Ok(())
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let required = |value: &Option<String>, name: &str, env: &str| {
            value
                .clone()
                .with_context(|| format!("Missing {name}: set it in the config file or {env}"))
        };

        Ok(Credentials::new(
            required(&self.client_id, "client_id", ENV_CLIENT_ID)?,
            required(&self.client_secret, "client_secret", ENV_CLIENT_SECRET)?,
            required(&self.username, "username", ENV_USERNAME)?,
            required(&self.password, "password", ENV_PASSWORD)?,
        ))
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        if let Some(api_base) = &self.api_base {
            config = config.with_api_base(api_base.as_str());
        }
        if let Some(token_url) = &self.token_url {
            config = config.with_token_url(token_url.as_str());
        }
        if let Some(event_url) = &self.event_url {
            config = config.with_event_url(event_url.as_str());
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config = config.with_timeout(timeout_secs);
        }
        config
    }
}
