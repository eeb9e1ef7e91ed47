//! Connection: builder factory plus an instrumented [`Executor`].
//!
//! A [`Connection`] owns an executor and the grammar chosen by its
//! [`ConnectionConfig`]. Builders created from it compile for that dialect,
//! and statements run through it are timed, logged and have driver errors
//! wrapped as [`QueryFailed`](crate::error::QbError::QueryFailed).
//!
//! ```ignore
//! use sqlweave::prelude::*;
//!
//! let config = ConnectionConfig::new(Dialect::Postgres).table_prefix("app_");
//! let conn = Connection::new(PgExecutor::new(client), config);
//! conn.enable_query_log();
//!
//! let rows = conn.table("users").where_eq("active", true).get(&conn).await?;
//! for entry in conn.query_log() {
//!     println!("{} ({:.2} ms)", entry.sql, entry.elapsed_ms());
//! }
//! ```

mod log;

pub use log::{QueryLog, QueryLogEntry, QueryType};

use crate::error::QbResult;
use crate::executor::Executor;
use crate::expression::Expression;
use crate::grammar::{Dialect, Grammar};
use crate::ident::Ident;
use crate::query::Builder;
use crate::row::Row;
use crate::value::Value;
use serde::{Deserialize, Deserializer};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for [`Connection`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// SQL dialect to compile for.
    pub dialect: Dialect,
    /// Prefix applied to every table name.
    pub table_prefix: String,
    /// Whether the query log starts enabled.
    pub query_log: bool,
    /// Statements slower than this are logged as warnings.
    #[serde(rename = "slow_query_threshold_ms", deserialize_with = "deserialize_millis")]
    pub slow_query_threshold: Option<Duration>,
    /// Maximum SQL length in log events; longer statements are truncated.
    pub max_logged_sql_length: Option<usize>,
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

impl ConnectionConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn query_log(mut self, enabled: bool) -> Self {
        self.query_log = enabled;
        self
    }

    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn max_logged_sql_length(mut self, len: usize) -> Self {
        self.max_logged_sql_length = Some(len);
        self
    }
}

#[cfg(feature = "tracing")]
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// An executor bound to a dialect, with timing, logging and error context.
#[derive(Debug)]
pub struct Connection<E> {
    executor: E,
    grammar: Arc<dyn Grammar>,
    config: ConnectionConfig,
    log: QueryLog,
}

impl<E: Executor> Connection<E> {
    pub fn new(executor: E, config: ConnectionConfig) -> Self {
        let grammar = config.dialect.grammar(config.table_prefix.clone());
        Self::with_grammar(executor, grammar, config)
    }

    /// Use a custom grammar instead of the one named by `config.dialect`.
    pub fn with_grammar(executor: E, grammar: Arc<dyn Grammar>, config: ConnectionConfig) -> Self {
        let log = QueryLog::new(config.query_log);
        Self {
            executor,
            grammar,
            config,
            log,
        }
    }

    pub fn grammar(&self) -> &Arc<dyn Grammar> {
        &self.grammar
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    // ==================== Builders ====================

    /// An empty builder for this connection's dialect.
    pub fn query(&self) -> Builder {
        Builder::new(Arc::clone(&self.grammar))
    }

    /// A builder targeting `table`.
    pub fn table(&self, table: impl Into<Ident>) -> Builder {
        self.query().table(table)
    }

    pub fn raw(&self, sql: impl Into<String>) -> Expression {
        Expression::new(sql)
    }

    // ==================== Query log ====================

    pub fn enable_query_log(&self) {
        self.log.enable();
    }

    pub fn disable_query_log(&self) {
        self.log.disable();
    }

    pub fn logging_queries(&self) -> bool {
        self.log.is_enabled()
    }

    /// Statements logged since the log was last flushed.
    pub fn query_log(&self) -> Vec<QueryLogEntry> {
        self.log.entries()
    }

    pub fn flush_query_log(&self) {
        self.log.flush();
    }

    // ==================== Transactions ====================

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    pub async fn transaction<T, F>(&self, f: F) -> QbResult<T>
    where
        F: AsyncFnOnce(&Self) -> QbResult<T>,
    {
        self.begin_transaction().await?;
        match f(self).await {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(_rollback_err) = self.rollback().await {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        target: "sqlweave.sql",
                        error = %_rollback_err,
                        "rollback failed"
                    );
                }
                Err(err)
            }
        }
    }

    // ==================== Instrumentation ====================

    async fn run<T, Fut>(&self, sql: &str, bindings: &[Value], fut: Fut) -> QbResult<T>
    where
        Fut: Future<Output = QbResult<T>>,
    {
        let start = Instant::now();
        match fut.await {
            Ok(value) => {
                let entry = QueryLogEntry::new(sql, bindings.to_vec(), start.elapsed());
                #[cfg(feature = "tracing")]
                self.emit_success(&entry);
                self.log.record(entry);
                Ok(value)
            }
            Err(err) => {
                let err = err.into_query_failed(sql, bindings);
                #[cfg(feature = "tracing")]
                self.emit_failure(sql, bindings.len(), &err);
                Err(err)
            }
        }
    }

    #[cfg(feature = "tracing")]
    fn truncate_sql(&self, sql: &str) -> String {
        match self.config.max_logged_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    #[cfg(feature = "tracing")]
    fn emit_success(&self, entry: &QueryLogEntry) {
        let sql = self.truncate_sql(&entry.sql);
        let elapsed_ms = entry.elapsed_ms();
        match self.config.slow_query_threshold {
            Some(threshold) if entry.elapsed >= threshold => tracing::warn!(
                target: "sqlweave.sql",
                query_type = ?entry.query_type,
                param_count = entry.bindings.len(),
                elapsed_ms,
                sql = %sql,
                "slow query"
            ),
            _ => tracing::debug!(
                target: "sqlweave.sql",
                query_type = ?entry.query_type,
                param_count = entry.bindings.len(),
                elapsed_ms,
                sql = %sql,
            ),
        }
    }

    #[cfg(feature = "tracing")]
    fn emit_failure(&self, sql: &str, param_count: usize, err: &crate::error::QbError) {
        tracing::error!(
            target: "sqlweave.sql",
            query_type = ?QueryType::from_sql(sql),
            param_count,
            sql = %self.truncate_sql(sql),
            error = %err,
        );
    }
}

impl<E: Executor> Executor for Connection<E> {
    fn execute(&self, sql: &str, bindings: &[Value]) -> impl Future<Output = QbResult<u64>> + Send {
        self.run(sql, bindings, self.executor.execute(sql, bindings))
    }

    fn fetch(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl Future<Output = QbResult<Vec<Row>>> + Send {
        self.run(sql, bindings, self.executor.fetch(sql, bindings))
    }

    fn last_insert_id(&self) -> impl Future<Output = QbResult<Value>> + Send {
        self.executor.last_insert_id()
    }

    fn begin_transaction(&self) -> impl Future<Output = QbResult<()>> + Send {
        self.run("begin", &[], self.executor.begin_transaction())
    }

    fn commit(&self) -> impl Future<Output = QbResult<()>> + Send {
        self.run("commit", &[], self.executor.commit())
    }

    fn rollback(&self) -> impl Future<Output = QbResult<()>> + Send {
        self.run("rollback", &[], self.executor.rollback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{"dialect": "postgres", "table_prefix": "tb_", "slow_query_threshold_ms": 250}"#,
        )
        .unwrap();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(config.table_prefix, "tb_");
        assert!(!config.query_log);
        assert_eq!(config.slow_query_threshold, Some(Duration::from_millis(250)));
        assert_eq!(config.max_logged_sql_length, None);
    }

    #[test]
    fn config_builder() {
        let config = ConnectionConfig::new(Dialect::MySql)
            .table_prefix("app_")
            .query_log(true)
            .max_logged_sql_length(64);
        assert_eq!(config.dialect, Dialect::MySql);
        assert_eq!(config.table_prefix, "app_");
        assert!(config.query_log);
        assert_eq!(config.max_logged_sql_length, Some(64));
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("select 'é'", 9), "select '");
        assert_eq!(truncate_sql_bytes("select 1", 100), "select 1");
    }
}
