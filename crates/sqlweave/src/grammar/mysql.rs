use super::compiler::{self, concatenate};
use super::{Dialect, Grammar};
use crate::error::QbResult;
use crate::ident::Ident;
use crate::query::{BindingKind, Builder, Lock};
use crate::value::{Record, Value};

/// MySQL grammar: backtick identifiers, `%s` placeholders, parenthesized unions.
#[derive(Debug, Clone, Default)]
pub struct MySqlGrammar {
    table_prefix: String,
}

impl MySqlGrammar {
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
        }
    }

    /// The name a multi-table DELETE removes from: the table alias, or the table itself.
    fn delete_target(&self, table: &Ident) -> String {
        match table {
            Ident::Name(name) => match compiler::split_alias(name) {
                Some((_, alias)) => self.wrap_value(&format!("{}{alias}", self.table_prefix)),
                None => compiler::wrap_table(self, table),
            },
            Ident::Raw(expr) => expr.value().to_string(),
        }
    }
}

impl Grammar for MySqlGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    fn parameter_token(&self) -> &str {
        "%s"
    }

    fn quote_identifier(&self, name: &str) -> String {
        compiler::quote(name, '`')
    }

    /// `` `col`->'$."a"."b"' ``
    fn wrap_json_selector(&self, value: &str) -> String {
        let mut path = value.split("->");
        let field = self.quote_identifier(path.next().unwrap_or_default().trim());
        let target = path
            .map(|attr| format!("\"{}\"", escape_path_key(attr.trim())))
            .collect::<Vec<_>>()
            .join(".");
        format!("{field}->'$.{target}'")
    }

    fn wraps_union_branches(&self) -> bool {
        true
    }

    fn compile_lock(&self, _query: &Builder, lock: &Lock) -> String {
        match lock {
            Lock::Update => "for update".to_string(),
            Lock::Shared => "lock in share mode".to_string(),
            Lock::Raw(sql) => sql.clone(),
        }
    }

    fn compile_insert_or_ignore(&self, query: &Builder, rows: &[Record]) -> QbResult<String> {
        let sql = self.compile_insert(query, rows)?;
        Ok(sql.replacen("insert", "insert ignore", 1))
    }

    /// Join predicates stay in their `on` clauses; single-table updates honor order and limit.
    fn compile_update(&self, query: &Builder, record: &Record) -> QbResult<String> {
        let sql = compiler::compile_update(self, query, record)?;
        if !query.joins.is_empty() {
            return Ok(sql);
        }
        Ok(concatenate([
            sql,
            compiler::compile_orders(self, &query.orders),
            compiler::compile_limit(query.limit),
        ]))
    }

    fn prepare_bindings_for_update(&self, query: &Builder, record: &Record) -> Vec<Value> {
        let mut bindings = compiler::update_bindings(query, record);
        if query.joins.is_empty() {
            bindings.extend(query.bindings.get(BindingKind::Order).iter().cloned());
        }
        bindings
    }

    fn compile_delete(&self, query: &Builder) -> QbResult<String> {
        let table = compiler::target_table(self, query)?;
        let wheres = compiler::compile_wheres(self, query);
        match &query.from {
            Some(from) if !query.joins.is_empty() => Ok(concatenate([
                format!("delete {} from {table}", self.delete_target(from)),
                compiler::compile_joins(self, &query.joins),
                wheres,
            ])),
            _ => Ok(concatenate([
                format!("delete from {table}"),
                wheres,
                compiler::compile_orders(self, &query.orders),
                compiler::compile_limit(query.limit),
            ])),
        }
    }

    fn prepare_bindings_for_delete(&self, query: &Builder) -> Vec<Value> {
        let kinds: &[BindingKind] = if query.joins.is_empty() {
            &[BindingKind::Where, BindingKind::Order]
        } else {
            &[BindingKind::Join, BindingKind::Where]
        };
        query.bindings.flatten_only(kinds)
    }
}

/// Escape a JSON path key for a double-quoted path step, then for the
/// single-quoted SQL literal holding the path.
fn escape_path_key(key: &str) -> String {
    let path_key = key.replace('\\', "\\\\").replace('"', "\\\"");
    path_key.replace('\\', "\\\\").replace('\'', "''")
}
