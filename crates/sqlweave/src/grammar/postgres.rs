use super::compiler::{self, concatenate};
use super::{Dialect, Grammar};
use crate::error::QbResult;
use crate::query::{BindingKind, Builder, Lock};
use crate::value::{Record, Value, align_rows};

const OPERATORS: &[&str] = &[
    "=", "<", ">", "<=", ">=", "<>", "!=", "like", "not like", "between", "ilike", "not ilike",
    "~", "&", "|", "#", "<<", ">>", "<<=", ">>=", "&&", "@>", "<@", "?", "?|", "?&", "||", "-",
    "#-", "is distinct from", "is not distinct from",
];

/// PostgreSQL grammar: `RETURNING`, `ON CONFLICT`, `UPDATE ... FROM` and `DELETE ... USING`.
#[derive(Debug, Clone, Default)]
pub struct PostgresGrammar {
    table_prefix: String,
}

impl PostgresGrammar {
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
        }
    }
}

impl Grammar for PostgresGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    fn operators(&self) -> &[&'static str] {
        OPERATORS
    }

    fn parameter_token(&self) -> &str {
        "%s"
    }

    fn wraps_union_branches(&self) -> bool {
        true
    }

    fn supports_returning(&self) -> bool {
        true
    }

    /// Aggregates over a union run against the whole union as a derived table.
    fn compile_select(&self, query: &Builder) -> String {
        match &query.aggregate {
            Some(aggregate) if !query.unions.is_empty() => {
                let mut inner = query.clone();
                inner.aggregate = None;
                format!(
                    "{} from ({}) as {}",
                    compiler::compile_aggregate(self, query, aggregate),
                    compiler::compile_select(self, &inner),
                    self.wrap_value("temp_table")
                )
            }
            _ => compiler::compile_select(self, query),
        }
    }

    fn compile_lock(&self, _query: &Builder, lock: &Lock) -> String {
        match lock {
            Lock::Update => "for update".to_string(),
            Lock::Shared => "for share".to_string(),
            Lock::Raw(sql) => sql.clone(),
        }
    }

    fn compile_insert(&self, query: &Builder, rows: &[Record]) -> QbResult<String> {
        let (columns, _) = align_rows(rows)?;
        if columns.is_empty() {
            let table = compiler::target_table(self, query)?;
            return Ok(format!("insert into {table} default values"));
        }
        compiler::compile_insert(self, query, rows)
    }

    fn compile_insert_get_id(
        &self,
        query: &Builder,
        record: &Record,
        sequence: Option<&str>,
    ) -> QbResult<String> {
        let sql = self.compile_insert(query, std::slice::from_ref(record))?;
        let column = compiler::wrap_str(self, sequence.unwrap_or("id"), false);
        Ok(format!("{sql} returning {column}"))
    }

    fn compile_insert_or_ignore(&self, query: &Builder, rows: &[Record]) -> QbResult<String> {
        Ok(format!("{} on conflict do nothing", self.compile_insert(query, rows)?))
    }

    /// Joined tables move to `from`; their predicates lead the WHERE clause.
    fn compile_update(&self, query: &Builder, record: &Record) -> QbResult<String> {
        let table = compiler::target_table(self, query)?;
        compiler::require_columns(record)?;
        let from = if query.joins.is_empty() {
            String::new()
        } else {
            format!("from {}", compiler::compile_join_tables(self, &query.joins))
        };
        Ok(concatenate([
            format!("update {table}"),
            format!("set {}", compiler::compile_update_columns(self, record)),
            from,
            compiler::compile_wheres_with_joins(self, query),
        ]))
    }

    fn prepare_bindings_for_update(&self, query: &Builder, record: &Record) -> Vec<Value> {
        let mut bindings: Vec<Value> = record.values().cloned().collect();
        bindings.extend(query.bindings.flatten_only(&[BindingKind::Join, BindingKind::Where]));
        bindings
    }

    fn compile_delete(&self, query: &Builder) -> QbResult<String> {
        if query.joins.is_empty() {
            return compiler::compile_delete(self, query);
        }
        let table = compiler::target_table(self, query)?;
        Ok(concatenate([
            format!("delete from {table}"),
            format!("using {}", compiler::compile_join_tables(self, &query.joins)),
            compiler::compile_wheres_with_joins(self, query),
        ]))
    }

    fn prepare_bindings_for_delete(&self, query: &Builder) -> Vec<Value> {
        query
            .bindings
            .flatten_only(&[BindingKind::Join, BindingKind::Where])
    }

    fn compile_truncate(&self, query: &Builder) -> QbResult<String> {
        Ok(format!(
            "truncate {} restart identity",
            compiler::target_table(self, query)?
        ))
    }
}
