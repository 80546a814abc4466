//! Server configuration from `HBNB_*` environment variables

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    File,
    Db,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::File => write!(f, "file"),
            StorageType::Db => write!(f, "db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// `HBNB_TYPE_STORAGE`: `file` or `db`
    pub type_storage: StorageType,
    pub api_host: String,
    pub api_port: u16,
    /// Snapshot path for the file backend
    pub file_path: PathBuf,
    /// Database path for the relational backend
    pub db_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Build settings from the process environment, or from `vars` when
    /// given (keys still carry the `HBNB_` prefix).
    pub fn load(vars: Option<config::Map<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("type_storage", "file")?
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 5000)?
            .set_default("file_path", "file.json")?
            .set_default("db_path", "hbnb.db")?
            .add_source(
                Environment::with_prefix("HBNB")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
