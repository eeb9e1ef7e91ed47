//! The database boundary.

use crate::error::QbResult;
use crate::row::Row;
use crate::value::Value;
use std::future::Future;

/// Runs compiled statements against a database.
///
/// SQL arrives with the grammar's placeholder token (`?` or `%s`) and the
/// bindings in placeholder order. Implementations are responsible for
/// adapting both to their driver.
pub trait Executor: Send + Sync {
    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, bindings: &[Value]) -> impl Future<Output = QbResult<u64>> + Send;

    /// Run a query and return its rows.
    fn fetch(&self, sql: &str, bindings: &[Value])
    -> impl Future<Output = QbResult<Vec<Row>>> + Send;

    /// Key generated by the most recent insert on this connection.
    fn last_insert_id(&self) -> impl Future<Output = QbResult<Value>> + Send;

    fn begin_transaction(&self) -> impl Future<Output = QbResult<()>> + Send;

    fn commit(&self) -> impl Future<Output = QbResult<()>> + Send;

    fn rollback(&self) -> impl Future<Output = QbResult<()>> + Send;
}
