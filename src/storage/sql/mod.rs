//! Unified SQL storage implementation.
//!
//! This module provides one storage implementation for SQL-based backends
//! (PostgreSQL, SQLite). The implementation is parameterized by database type
//! using the `SqlDatabase` trait.

mod query;
mod rows;
pub mod schema;
mod storage;

pub use query::SqlDatabase;
pub use storage::SqlStorage;

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use sea_query::{LockBehavior, LockType, PostgresQueryBuilder};
    use sqlx::postgres::PgPoolOptions;
    use tracing::info;

    use crate::config::StorageConfig;
    use crate::storage::Result;

    /// PostgreSQL database marker type.
    pub struct Postgres;

    impl super::SqlDatabase for Postgres {
        type Db = sqlx::Postgres;

        const BEGIN: &'static str = "BEGIN";

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn lock_rows(stmt: &mut sea_query::SelectStatement) {
            stmt.lock(LockType::Update);
        }

        fn lock_unclaimed(stmt: &mut sea_query::SelectStatement) {
            stmt.lock_with_behavior(LockType::Update, LockBehavior::SkipLocked);
        }
    }

    /// PostgreSQL storage.
    pub type PostgresStorage = super::SqlStorage<Postgres>;

    /// Connect a pool to `config.uri`.
    pub async fn connect(config: &StorageConfig) -> Result<PostgresStorage> {
        info!(max_connections = config.max_connections, "Connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.uri)
            .await?;
        Ok(PostgresStorage::new(pool)
            .with_transactions(config.transactions)
            .with_atomic_claim(config.atomic_claim))
    }
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.

    use sea_query::SqliteQueryBuilder;
    use sqlx::sqlite::SqlitePoolOptions;
    use tracing::info;

    use crate::config::StorageConfig;
    use crate::storage::{Result, StorageError};

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Db = sqlx::Sqlite;

        // BEGIN IMMEDIATE acquires the write lock upfront, preventing deadlocks
        // when concurrent DEFERRED transactions race to upgrade from shared to exclusive.
        const BEGIN: &'static str = "BEGIN IMMEDIATE";

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        // Writers are serialized database-wide; there are no row locks.
        fn lock_rows(_stmt: &mut sea_query::SelectStatement) {}

        fn lock_unclaimed(_stmt: &mut sea_query::SelectStatement) {}
    }

    /// SQLite storage.
    pub type SqliteStorage = super::SqlStorage<Sqlite>;

    /// Open `config.uri`: a path, a `sqlite:` URL, or empty for a private
    /// in-memory database.
    ///
    /// An in-memory database lives in a single connection, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn connect(config: &StorageConfig) -> Result<SqliteStorage> {
        let in_memory = config.uri.is_empty() || config.uri.contains(":memory:");
        let url = if config.uri.is_empty() {
            "sqlite::memory:".to_string()
        } else if config.uri.starts_with("sqlite:") {
            config.uri.clone()
        } else {
            if let Some(parent) = std::path::Path::new(&config.uri).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Transport(e.to_string()))?;
            }
            format!("sqlite:{}?mode=rwc", config.uri)
        };
        info!(url = %url, "Opening SQLite");

        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };
        let pool = options.connect(&url).await?;
        Ok(SqliteStorage::new(pool)
            .with_transactions(config.transactions)
            .with_atomic_claim(config.atomic_claim))
    }
}
