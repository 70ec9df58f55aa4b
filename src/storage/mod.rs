//! Storage implementations.
//!
//! Every backend implements [`Storage`]. The orchestrator only ever sees
//! `Arc<dyn Storage>`; which backend sits behind it is decided once by
//! [`connect`] from configuration.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{ConfigError, StorageConfig, StorageType};

mod adapter;
mod error;
pub mod helpers;
pub mod memory;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;

pub use adapter::Storage;
pub use error::{ErrorKind, Result, StorageError};
pub use memory::{MemoryStorage, TrxStats};

#[cfg(feature = "sqlite")]
pub use sql::sqlite::SqliteStorage;

#[cfg(feature = "postgres")]
pub use sql::postgres::PostgresStorage;

#[cfg(feature = "elasticsearch")]
pub use elasticsearch::ElasticsearchStorage;

/// Initialize storage based on configuration.
///
/// Drivers whose feature is not compiled in are rejected here rather than
/// on first use.
pub async fn connect(config: &StorageConfig) -> std::result::Result<Arc<dyn Storage>, ConfigError> {
    info!(
        driver = %config.driver,
        transactions = config.transactions,
        atomic_claim = config.atomic_claim,
        "Connecting storage"
    );

    ensure_enabled(config.driver)?;

    let connect_error = |e: StorageError| ConfigError::Connect {
        driver: config.driver,
        reason: e.to_string(),
    };

    match config.driver {
        StorageType::Memory => Ok(Arc::new(
            MemoryStorage::new()
                .with_transactions(config.transactions)
                .with_atomic_claim(config.atomic_claim),
        )),

        StorageType::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                let storage = sql::sqlite::connect(config).await.map_err(connect_error)?;
                Ok(Arc::new(storage))
            }

            #[cfg(not(feature = "sqlite"))]
            {
                let _ = connect_error;
                Err(feature_disabled(config.driver, "sqlite"))
            }
        }

        StorageType::Postgres => {
            #[cfg(feature = "postgres")]
            {
                let storage = sql::postgres::connect(config).await.map_err(connect_error)?;
                Ok(Arc::new(storage))
            }

            #[cfg(not(feature = "postgres"))]
            {
                let _ = connect_error;
                Err(feature_disabled(config.driver, "postgres"))
            }
        }

        StorageType::Elasticsearch => {
            #[cfg(feature = "elasticsearch")]
            {
                let storage = elasticsearch::connect(config).await.map_err(connect_error)?;
                Ok(Arc::new(storage))
            }

            #[cfg(not(feature = "elasticsearch"))]
            {
                let _ = connect_error;
                Err(feature_disabled(config.driver, "elasticsearch"))
            }
        }
    }
}

/// Reject a driver whose backend was not compiled in.
///
/// Startup code calls this before any connection retry loop: a missing
/// feature never fixes itself.
pub fn ensure_enabled(driver: StorageType) -> std::result::Result<(), ConfigError> {
    let (feature, enabled) = match driver {
        StorageType::Memory => return Ok(()),
        StorageType::Sqlite => ("sqlite", cfg!(feature = "sqlite")),
        StorageType::Postgres => ("postgres", cfg!(feature = "postgres")),
        StorageType::Elasticsearch => ("elasticsearch", cfg!(feature = "elasticsearch")),
    };
    if enabled {
        Ok(())
    } else {
        Err(feature_disabled(driver, feature))
    }
}

fn feature_disabled(driver: StorageType, feature: &'static str) -> ConfigError {
    error!(driver = %driver, feature, "Storage driver requires a feature that is not enabled");
    ConfigError::FeatureDisabled { driver, feature }
}
