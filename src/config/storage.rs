//! Storage configuration types.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::ConfigError;

/// Backend discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum StorageType {
    #[default]
    Memory,
    Sqlite,
    Postgres,
    Elasticsearch,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Memory => "memory",
            StorageType::Sqlite => "sqlite",
            StorageType::Postgres => "postgres",
            StorageType::Elasticsearch => "elasticsearch",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "sqlite" => Ok(StorageType::Sqlite),
            "postgres" | "postgresql" => Ok(StorageType::Postgres),
            "elasticsearch" => Ok(StorageType::Elasticsearch),
            other => Err(ConfigError::UnknownDriver(other.to_string())),
        }
    }
}

impl TryFrom<String> for StorageType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to connect to.
    pub driver: StorageType,
    /// Connection URI. SQLite takes a path or `sqlite::memory:`.
    pub uri: String,
    /// Database / index-prefix name. Elasticsearch prefixes every index with it.
    pub database: String,
    /// Backend is used with transaction bracketing.
    pub transactions: bool,
    /// Claim new-order entries with a single delete-if-present operation.
    pub atomic_claim: bool,
    /// Connection pool size for pooled backends.
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageType::Memory,
            uri: String::new(),
            database: "tpcc".to_string(),
            transactions: false,
            atomic_claim: false,
            max_connections: 8,
        }
    }
}
