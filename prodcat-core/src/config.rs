//! Database configuration loading.
//!
//! Precedence for every key, highest to lowest:
//! 1. Environment variable (`DB_HOST`, `DB_USER`, ...)
//! 2. `config.toml` (current directory, then `~/.prodcat/config.toml`)
//! 3. Hardcoded default
//!
//! `.env` files are loaded into the process environment first, so values
//! from a local `.env` flow through the environment-variable branch.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

/// Load environment variables from .env files.
///
/// Checks the current directory first, then `~/.prodcat/.env`. dotenvy never
/// overwrites variables that are already set, so operator-provided
/// environment always wins over file contents.
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("loaded .env from current directory: {}", path.display());
        loaded_from.push(path);
    }

    if let Some(dir) = config_dir() {
        let env_file = dir.join(".env");
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => loaded_from.push(env_file),
                Err(err) => debug!("failed to load {}: {}", env_file.display(), err),
            }
        }
    }

    if loaded_from.is_empty() {
        info!("no .env file found, using environment variables only");
    } else {
        info!(
            "loaded environment from: {}",
            loaded_from
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

/// Get the prodcat config directory path (~/.prodcat)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".prodcat"))
}

/// Connection settings for the backing MySQL database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
    pub timezone: String,
    pub charset: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            user: "root".into(),
            password: String::new(),
            database: "railway".into(),
            port: 3306,
            timezone: "utc+5:30".into(),
            charset: "utf8mb4".into(),
        }
    }
}

/// `[database]` table of config.toml. Every key is optional; missing keys
/// fall through to the defaults above.
#[derive(Debug, Default, Deserialize)]
struct FileDbConfig {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
    port: Option<u16>,
    timezone: Option<String>,
    charset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<FileDbConfig>,
}

impl DbConfig {
    /// Load the database configuration from the environment and, if present,
    /// a config.toml file.
    pub fn load() -> Result<Self> {
        let file = match find_config_file() {
            Some(path) => read_file_config(&path)?,
            None => {
                debug!("no config.toml found, using environment and defaults");
                FileDbConfig::default()
            }
        };
        Self::resolve(file, |name| env::var(name).ok())
    }

    /// Merge the three config sources. `lookup` abstracts the process
    /// environment so precedence is testable without mutating global state.
    fn resolve(file: FileDbConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { value: raw })?,
            None => file.port.unwrap_or(defaults.port),
        };

        Ok(Self {
            host: lookup("DB_HOST").or(file.host).unwrap_or(defaults.host),
            user: lookup("DB_USER").or(file.user).unwrap_or(defaults.user),
            password: lookup("DB_PASS")
                .or(file.password)
                .unwrap_or(defaults.password),
            database: lookup("DB_NAME")
                .or(file.database)
                .unwrap_or(defaults.database),
            port,
            timezone: lookup("DB_TIMEZONE")
                .or(file.timezone)
                .unwrap_or(defaults.timezone),
            charset: lookup("DB_CHARSET")
                .or(file.charset)
                .unwrap_or(defaults.charset),
        })
    }
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("config.toml");
    if local.exists() {
        return Some(local);
    }
    config_dir()
        .map(|dir| dir.join("config.toml"))
        .filter(|path| path.exists())
}

fn read_file_config(path: &Path) -> Result<FileDbConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: FileConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("loaded database config from {}", path.display());
    Ok(parsed.database.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_match_contract() {
        let config = DbConfig::resolve(FileDbConfig::default(), no_env).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "");
        assert_eq!(config.database, "railway");
        assert_eq!(config.port, 3306);
        assert_eq!(config.timezone, "utc+5:30");
        assert_eq!(config.charset, "utf8mb4");
    }

    #[test]
    fn env_beats_file_and_default() {
        let file = FileDbConfig {
            host: Some("db.internal".into()),
            port: Some(3307),
            ..FileDbConfig::default()
        };
        let config = DbConfig::resolve(file, |name| match name {
            "DB_HOST" => Some("db.prod".into()),
            "DB_PORT" => Some("3310".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.host, "db.prod");
        assert_eq!(config.port, 3310);
        // untouched keys still fall through to defaults
        assert_eq!(config.user, "root");
    }

    #[test]
    fn file_beats_default() {
        let file = FileDbConfig {
            database: Some("catalog".into()),
            charset: Some("utf8".into()),
            ..FileDbConfig::default()
        };
        let config = DbConfig::resolve(file, no_env).unwrap();
        assert_eq!(config.database, "catalog");
        assert_eq!(config.charset, "utf8");
    }

    #[test]
    fn empty_env_password_is_respected() {
        // DB_PASS="" is a meaningful value, not an unset key
        let config = DbConfig::resolve(
            FileDbConfig {
                password: Some("secret".into()),
                ..FileDbConfig::default()
            },
            |name| (name == "DB_PASS").then(String::new),
        )
        .unwrap();
        assert_eq!(config.password, "");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = DbConfig::resolve(FileDbConfig::default(), |name| {
            (name == "DB_PORT").then(|| "not-a-port".into())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { value } if value == "not-a-port"));
    }

    #[test]
    fn reads_database_table_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[database]\nhost = \"10.0.0.5\"\nuser = \"catalog\"\nport = 3307"
        )
        .unwrap();

        let file = read_file_config(&path).unwrap();
        assert_eq!(file.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(file.user.as_deref(), Some("catalog"));
        assert_eq!(file.port, Some(3307));
        assert!(file.password.is_none());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database\nhost=").unwrap();

        let err = read_file_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
