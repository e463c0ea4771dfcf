//! Layered configuration: defaults, then `~/.isoctl/config.toml` (or an
//! explicit `--config` file), then `.env` / environment variables. The CLI
//! applies its own flags last.
//!
//! Example config.toml:
//!
//! ```toml
//! [database]
//! host = "db.internal"
//! port = 3307
//! user = "demo"
//! password = "secret"
//! name = "il_levels_demo"
//!
//! [choreography]
//! settle_delay_ms = 1000
//! signal_timeout_ms = 5000
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;
use tracing::{debug, info};

use crate::error::{IsoError, Result};

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_HOST: &str = "ISOCTL_DB_HOST";
pub const ENV_PORT: &str = "ISOCTL_DB_PORT";
pub const ENV_USER: &str = "ISOCTL_DB_USER";
pub const ENV_PASSWORD: &str = "ISOCTL_DB_PASSWORD";
pub const ENV_NAME: &str = "ISOCTL_DB_NAME";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub choreography: ChoreographySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Full connection URL; takes precedence over the discrete fields
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            name: "il_levels_demo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreographySettings {
    /// Pause between the reader's two reads in the dirty-read scenario
    pub settle_delay_ms: u64,
    /// Upper bound on any wait for the peer transaction
    pub signal_timeout_ms: u64,
}

impl Default for ChoreographySettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            signal_timeout_ms: 5000,
        }
    }
}

impl ChoreographySettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }
}

impl DatabaseSettings {
    /// Build sqlx connect options from the URL or the discrete fields.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions> {
        if let Some(url) = &self.url {
            return MySqlConnectOptions::from_str(url)
                .map_err(|e| IsoError::config(format!("invalid database URL: {}", e)));
        }

        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }

    /// Connection target without credentials, for logs.
    pub fn display_target(&self) -> String {
        match &self.url {
            Some(url) => redact_url(url),
            None => format!("{}@{}:{}/{}", self.user, self.host, self.port, self.name),
        }
    }
}

fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => match credentials.split_once(':') {
            Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
            None => format!("{}://{}@{}", scheme, credentials, host),
        },
        None => url.to_string(),
    }
}

/// Get the isoctl config directory path (~/.isoctl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".isoctl"))
}

/// Default config file path: ~/.isoctl/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Load `.env` from the current directory, then `~/.isoctl/.env`.
///
/// dotenvy never overwrites variables that are already set, so the
/// current directory wins over the home directory, and the real
/// environment wins over both.
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path.display().to_string());
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => loaded_from.push(env_file.display().to_string()),
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }

    if loaded_from.is_empty() {
        debug!("No .env files found (current dir or ~/.isoctl)");
    } else {
        info!("Loaded environment from: {}", loaded_from.join(", "));
    }
}

impl Settings {
    /// Load settings from `path`, or from the default config file if it
    /// exists, then apply environment overrides.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };

        let vars: HashMap<String, String> = env::vars().collect();
        settings.apply_env(&vars)?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IsoError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| IsoError::config(format!("invalid TOML config: {}", e)))
    }

    /// Apply environment overrides from an explicit variable map.
    ///
    /// Any `ISOCTL_DB_*` variable drops a `url` taken from the config file, so
    /// the discrete fields it overrides are the ones used to connect.
    /// `DATABASE_URL` is applied last and wins over both.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        let db = &mut self.database;
        let mut field_override = false;

        if let Some(host) = vars.get(ENV_HOST) {
            db.host = host.clone();
            field_override = true;
        }
        if let Some(port) = vars.get(ENV_PORT) {
            db.port = port
                .parse()
                .map_err(|_| IsoError::config(format!("{} is not a port: {}", ENV_PORT, port)))?;
            field_override = true;
        }
        if let Some(user) = vars.get(ENV_USER) {
            db.user = user.clone();
            field_override = true;
        }
        if let Some(password) = vars.get(ENV_PASSWORD) {
            db.password = Some(password.clone());
            field_override = true;
        }
        if let Some(name) = vars.get(ENV_NAME) {
            db.name = name.clone();
            field_override = true;
        }

        if field_override && db.url.take().is_some() {
            debug!("ISOCTL_DB_* overrides replace the config file url");
        }
        if let Some(url) = vars.get(ENV_DATABASE_URL).filter(|v| !v.is_empty()) {
            db.url = Some(url.clone());
        }

        Ok(())
    }
}
