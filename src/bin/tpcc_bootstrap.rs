//! tpcc-bootstrap: schema setup
//!
//! Connects to the configured backend and creates its tables and indexes.
//! Both steps are idempotent, so running it against an existing database is
//! safe.
//!
//! ## Configuration
//! - First argument: path to a YAML config file (optional)
//! - TPCC_CONFIG: path to a YAML config file (optional)
//! - TPCC__STORAGE__DRIVER, TPCC__STORAGE__URI, ...: overrides
//! - TPCC_LOG: log filter (default: info)

use tracing::info;

use tpcc_driver::config::Config;
use tpcc_driver::executor::Executor;
use tpcc_driver::storage;
use tpcc_driver::utils::bootstrap::{connect_with_retry, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = Config::load(path.as_deref())?;

    storage::ensure_enabled(config.storage.driver)?;
    let backend = config.storage.driver.to_string();
    let storage = connect_with_retry(&backend, || storage::connect(&config.storage)).await?;
    let executor = Executor::new(storage, config.executor);

    executor.create_schema().await?;
    executor.create_indexes().await?;

    info!(driver = %backend, database = %config.storage.database, "tpcc-bootstrap finished");
    Ok(())
}
