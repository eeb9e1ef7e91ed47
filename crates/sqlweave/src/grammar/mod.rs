//! SQL grammars.
//!
//! A [`Grammar`] turns a [`Builder`] into dialect-specific SQL. The shared
//! rendering lives in [`compiler`]; each dialect overrides only what differs:
//!
//! | | [`AnsiGrammar`] | [`MySqlGrammar`] | [`PostgresGrammar`] |
//! |---|---|---|---|
//! | identifiers | `"x"` | `` `x` `` | `"x"` |
//! | placeholder | `?` | `%s` | `%s` |
//! | insert or ignore | unsupported | `insert ignore` | `on conflict do nothing` |
//! | generated key | driver | driver | `returning` |
//! | unions | bare | parenthesized | parenthesized |

pub mod compiler;

mod base;
mod mysql;
mod postgres;


pub use base::AnsiGrammar;
pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;

use crate::error::{QbError, QbResult};
use crate::query::{Builder, Lock};
use crate::value::{Record, Value};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Ansi,
    MySql,
    #[serde(alias = "postgresql", alias = "pgsql")]
    Postgres,
}

impl Dialect {
    /// Build the grammar for this dialect.
    pub fn grammar(self, table_prefix: impl Into<String>) -> Arc<dyn Grammar> {
        match self {
            Self::Ansi => Arc::new(AnsiGrammar::new(table_prefix)),
            Self::MySql => Arc::new(MySqlGrammar::new(table_prefix)),
            Self::Postgres => Arc::new(PostgresGrammar::new(table_prefix)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ansi => "ansi",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = QbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ansi" => Ok(Self::Ansi),
            "mysql" => Ok(Self::MySql),
            "postgres" | "postgresql" | "pgsql" => Ok(Self::Postgres),
            other => Err(QbError::invalid_argument(format!("Unknown dialect: {other}"))),
        }
    }
}

/// Renders builder state into SQL for one dialect.
///
/// Every method has a default built on [`compiler`]; dialects override the
/// pieces that differ. Grammars are immutable and shared across builders.
pub trait Grammar: fmt::Debug + Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Prefix prepended to every table name and table alias.
    fn table_prefix(&self) -> &str;

    /// Operators accepted on top of the common set.
    fn operators(&self) -> &[&'static str] {
        &[]
    }

    /// Positional placeholder emitted for each bound value.
    fn parameter_token(&self) -> &str {
        "?"
    }

    /// Quote a single identifier segment.
    fn quote_identifier(&self, name: &str) -> String {
        compiler::quote(name, '"')
    }

    /// Render a `column->path->key` JSON selector.
    fn wrap_json_selector(&self, value: &str) -> String {
        compiler::wrap_json_arrows(self, value)
    }

    /// Wrap a single segment: `*` stays bare, JSON selectors are expanded,
    /// anything else is quoted.
    fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return value.to_string();
        }
        if value.contains("->") {
            return self.wrap_json_selector(value);
        }
        self.quote_identifier(value)
    }

    /// Whether union branches are parenthesized.
    fn wraps_union_branches(&self) -> bool {
        false
    }

    /// Whether INSERT can return generated keys with `RETURNING`.
    fn supports_returning(&self) -> bool {
        false
    }

    fn compile_select(&self, query: &Builder) -> String {
        compiler::compile_select(self, query)
    }

    /// Only raw lock clauses are understood by default.
    fn compile_lock(&self, _query: &Builder, lock: &Lock) -> String {
        match lock {
            Lock::Raw(sql) => sql.clone(),
            Lock::Update | Lock::Shared => String::new(),
        }
    }

    fn compile_insert(&self, query: &Builder, rows: &[Record]) -> QbResult<String> {
        compiler::compile_insert(self, query, rows)
    }

    fn compile_insert_get_id(
        &self,
        query: &Builder,
        record: &Record,
        _sequence: Option<&str>,
    ) -> QbResult<String> {
        self.compile_insert(query, std::slice::from_ref(record))
    }

    fn compile_insert_or_ignore(&self, _query: &Builder, _rows: &[Record]) -> QbResult<String> {
        Err(QbError::unsupported(format!(
            "insert or ignore is not supported by the {} grammar",
            self.dialect()
        )))
    }

    fn compile_update(&self, query: &Builder, record: &Record) -> QbResult<String> {
        compiler::compile_update(self, query, record)
    }

    /// Bindings of an UPDATE in placeholder order.
    fn prepare_bindings_for_update(&self, query: &Builder, record: &Record) -> Vec<Value> {
        compiler::update_bindings(query, record)
    }

    fn compile_delete(&self, query: &Builder) -> QbResult<String> {
        compiler::compile_delete(self, query)
    }

    /// Bindings of a DELETE in placeholder order.
    fn prepare_bindings_for_delete(&self, query: &Builder) -> Vec<Value> {
        compiler::delete_bindings(query)
    }

    fn compile_exists(&self, query: &Builder) -> String {
        format!(
            "select exists({}) as {}",
            self.compile_select(query),
            self.wrap_value("exists")
        )
    }

    fn compile_truncate(&self, query: &Builder) -> QbResult<String> {
        Ok(format!("truncate table {}", compiler::target_table(self, query)?))
    }
}
