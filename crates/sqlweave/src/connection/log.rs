//! In-memory query log.

use crate::value::Value;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// The type of SQL statement, detected from its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl QueryType {
    /// Detect the statement type. Leading whitespace and parentheses (wrapped unions) are skipped.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        let keyword = trimmed
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default();
        if keyword.eq_ignore_ascii_case("select") {
            Self::Select
        } else if keyword.eq_ignore_ascii_case("insert") {
            Self::Insert
        } else if keyword.eq_ignore_ascii_case("update") {
            Self::Update
        } else if keyword.eq_ignore_ascii_case("delete") {
            Self::Delete
        } else {
            Self::Other
        }
    }
}

/// A statement that ran successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryLogEntry {
    pub sql: String,
    pub bindings: Vec<Value>,
    pub elapsed: Duration,
    pub query_type: QueryType,
}

impl QueryLogEntry {
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>, elapsed: Duration) -> Self {
        let sql = sql.into();
        let query_type = QueryType::from_sql(&sql);
        Self {
            sql,
            bindings,
            elapsed,
            query_type,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Thread-safe log of executed statements, off unless enabled.
#[derive(Debug, Default)]
pub struct QueryLog {
    enabled: AtomicBool,
    entries: Mutex<Vec<QueryLogEntry>>,
}

impl QueryLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Record an entry if logging is enabled.
    pub fn record(&self, entry: QueryLogEntry) {
        if self.is_enabled() {
            self.lock().push(entry);
        }
    }

    /// Snapshot of the logged entries, oldest first.
    pub fn entries(&self) -> Vec<QueryLogEntry> {
        self.lock().clone()
    }

    /// Remove every logged entry.
    pub fn flush(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueryLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_query_type() {
        assert_eq!(QueryType::from_sql("select * from t"), QueryType::Select);
        assert_eq!(QueryType::from_sql("(select 1) union (select 2)"), QueryType::Select);
        assert_eq!(QueryType::from_sql("  INSERT into t"), QueryType::Insert);
        assert_eq!(QueryType::from_sql("update t set a = ?"), QueryType::Update);
        assert_eq!(QueryType::from_sql("delete from t"), QueryType::Delete);
        assert_eq!(QueryType::from_sql("truncate t"), QueryType::Other);
    }

    #[test]
    fn records_only_when_enabled() {
        let log = QueryLog::new(false);
        log.record(QueryLogEntry::new("select 1", vec![], Duration::from_millis(1)));
        assert!(log.is_empty());

        log.enable();
        log.record(QueryLogEntry::new("select 1", vec![], Duration::from_millis(2)));
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].query_type, QueryType::Select);

        log.flush();
        assert!(log.is_empty());
    }
}
