//! # Hub Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BASKET_PORT=8765                                                   │
//! │     BASKET_STORAGE_BACKEND=file                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/basket/hub.toml (Linux)                                  │
//! │     ~/Library/Application Support/org.basket.basket/hub.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.0.0.0:8765, sqlite at ./basket.db                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8765
//!
//! [storage]
//! backend = "file"          # sqlite | file | memory
//! path = "/config/.storage"
//! domain = "shopping_list_manager"
//!
//! [seed]
//! data_dir = "./data"
//! country = "NZ"
//! import_on_empty = true
//!
//! [access]
//! admins = ["alice"]
//! ```

use std::path::{Path, PathBuf};

use basket_store::DEFAULT_DOMAIN;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Server Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// WebSocket port. 0 picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8765
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Which [`basket_store::BlobStore`] the hub runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One SQLite database file.
    #[default]
    Sqlite,
    /// A directory of JSON files, one per key.
    File,
    /// Nothing survives a restart.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            "file" | "json" => Ok(StorageBackend::File),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid(format!(
                "Unknown storage backend: '{}'. Valid options: sqlite, file, memory",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database file for `sqlite`, directory for `file`. Unused by `memory`.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Key prefix of every stored blob.
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./basket.db")
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            domain: default_domain(),
        }
    }
}

// =============================================================================
// Seed Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSettings {
    /// Directory holding `products_catalog_<cc>.json` and `categories*.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Country code used to pick seed files.
    #[serde(default)]
    pub country: Option<String>,

    /// Import the country catalog into the default list when it has no
    /// products at startup.
    #[serde(default)]
    pub import_on_empty: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for SeedSettings {
    fn default() -> Self {
        SeedSettings {
            data_dir: default_data_dir(),
            country: None,
            import_on_empty: false,
        }
    }
}

// =============================================================================
// Access Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessSettings {
    /// User ids that see every list, private ones included.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl AccessSettings {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|admin| admin == user_id)
    }
}

// =============================================================================
// Main Hub Configuration
// =============================================================================

/// Complete hub configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub seed: SeedSettings,

    #[serde(default)]
    pub access: AccessSettings,
}

impl HubConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (hub.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(path = %path.display(), "Loading hub config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(path = %path.display(), "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(path = %path.display(), "Hub config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind_addr must not be empty".into()));
        }

        if self.storage.domain.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.domain must not be empty".into()));
        }

        if self.storage.backend != StorageBackend::Memory && self.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "storage.path is required for the {} backend",
                self.storage.backend
            )));
        }

        if self.seed.import_on_empty && self.seed.country.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "seed.import_on_empty needs seed.country".into(),
            ));
        }

        Ok(())
    }

    /// Applies `BASKET_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = var("BASKET_BIND_ADDR") {
            debug!(bind_addr = %addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }

        if let Some(port) = var("BASKET_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid BASKET_PORT"),
            }
        }

        if let Some(backend) = var("BASKET_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding storage backend from environment");
                    self.storage.backend = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring invalid BASKET_STORAGE_BACKEND"),
            }
        }

        if let Some(path) = var("BASKET_STORAGE_PATH") {
            self.storage.path = PathBuf::from(path);
        }

        if let Some(domain) = var("BASKET_STORAGE_DOMAIN") {
            self.storage.domain = domain;
        }

        if let Some(dir) = var("BASKET_DATA_DIR") {
            self.seed.data_dir = PathBuf::from(dir);
        }

        if let Some(country) = var("BASKET_COUNTRY") {
            self.seed.country = Some(country);
        }

        if let Some(flag) = var("BASKET_IMPORT_ON_EMPTY") {
            self.seed.import_on_empty = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(admins) = var("BASKET_ADMINS") {
            self.access.admins = admins
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "basket", "basket")
            .map(|dirs| dirs.config_dir().join("hub.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8765");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.domain, "shopping_list_manager");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: HubConfig = toml::from_str(
            r#"
            [storage]
            backend = "file"
            path = "/config/.storage"

            [access]
            admins = ["alice"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8765);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.path, PathBuf::from("/config/.storage"));
        assert!(config.access.is_admin("alice"));
        assert!(!config.access.is_admin("bob"));
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("sqlite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("JSON".parse::<StorageBackend>().unwrap(), StorageBackend::File);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BASKET_PORT", "9000"),
            ("BASKET_STORAGE_BACKEND", "memory"),
            ("BASKET_COUNTRY", "NZ"),
            ("BASKET_IMPORT_ON_EMPTY", "true"),
            ("BASKET_ADMINS", "alice, bob,,"),
        ]
        .into_iter()
        .collect();

        let mut config = HubConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.seed.country.as_deref(), Some("NZ"));
        assert!(config.seed.import_on_empty);
        assert_eq!(config.access.admins, vec!["alice", "bob"]);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = HubConfig::default();
        config.apply_overrides(|name| match name {
            "BASKET_PORT" => Some("not-a-port".to_string()),
            "BASKET_STORAGE_BACKEND" => Some("redis".to_string()),
            _ => None,
        });

        assert_eq!(config.server.port, 8765);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_validation() {
        let mut config = HubConfig::default();

        config.storage.domain = " ".to_string();
        assert!(config.validate().is_err());

        config.storage.domain = "shopping_list_manager".to_string();
        config.seed.import_on_empty = true;
        assert!(config.validate().is_err());

        config.seed.country = Some("NZ".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hub.toml");

        let mut config = HubConfig::default();
        config.server.port = 9123;
        config.access.admins = vec!["alice".to_string()];
        config.save(Some(path.clone())).unwrap();

        let loaded = HubConfig::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 9123);
        assert_eq!(loaded.access.admins, vec!["alice"]);
    }
}
