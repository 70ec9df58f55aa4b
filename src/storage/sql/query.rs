//! SQL database abstraction trait.

/// Trait for SQL database backends.
///
/// This trait abstracts over different SQL databases (PostgreSQL, SQLite)
/// by providing the driver type, query building and the dialect details the
/// storage needs for transactions and row locking.
pub trait SqlDatabase: Send + Sync + 'static {
    /// The sqlx driver for this database.
    type Db: sqlx::Database;

    /// Statement that opens a transaction.
    const BEGIN: &'static str;

    /// Build a SQL query string from a sea-query SELECT statement.
    fn build_select(stmt: sea_query::SelectStatement) -> String;

    /// Build a SQL query string from a sea-query INSERT statement.
    fn build_insert(stmt: sea_query::InsertStatement) -> String;

    /// Build a SQL query string from a sea-query UPDATE statement.
    fn build_update(stmt: sea_query::UpdateStatement) -> String;

    /// Build a SQL query string from a sea-query DELETE statement.
    fn build_delete(stmt: sea_query::DeleteStatement) -> String;

    /// Lock the selected rows until the enclosing transaction ends.
    fn lock_rows(stmt: &mut sea_query::SelectStatement);

    /// Lock the selected rows, skipping rows another transaction holds.
    fn lock_unclaimed(stmt: &mut sea_query::SelectStatement);
}
