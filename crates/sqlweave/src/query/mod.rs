//! Fluent query builder.
//!
//! A [`Builder`] accumulates clause state (columns, joins, predicates,
//! grouping, ordering, unions, locking) together with the values bound to
//! each clause. Nothing is rendered until a [`Grammar`] compiles it, so the
//! same builder can be compiled for different dialects.
//!
//! ```ignore
//! use sqlweave::prelude::*;
//!
//! let grammar = Dialect::Postgres.grammar("");
//! let built = Builder::new(grammar)
//!     .table("users")
//!     .select(["id", "name"])
//!     .where_("votes", ">", 100)
//!     .or_where_eq("name", "John")
//!     .order_by("name", "desc")
//!     .limit(10)
//!     .build_select()?;
//! ```

mod bindings;
mod execute;
mod join;
mod predicate;
mod wheres;

#[cfg(test)]
mod tests;

pub use bindings::{BindingKind, Bindings};
pub use join::{JoinClause, JoinKind};
pub use predicate::{Connector, Predicate};

use crate::error::{QbError, QbResult};
use crate::expression::Expression;
use crate::grammar::Grammar;
use crate::ident::{Ident, idents};
use crate::value::{Record, Value, align_rows};
use std::sync::Arc;

/// Comparison operators every dialect accepts.
pub(crate) const OPERATORS: &[&str] = &[
    "=", "<", ">", "<=", ">=", "<>", "!=", "<=>", "like", "like binary", "not like", "ilike",
    "&", "|", "^", "<<", ">>", "rlike", "regexp", "not regexp", "~", "~*", "!~", "!~*",
    "similar to", "not similar to", "~~*", "!~~*",
];

/// A compiled statement: SQL text plus its bind values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl BuiltQuery {
    pub fn new(sql: String, bindings: Vec<Value>) -> Self {
        Self { sql, bindings }
    }
}

/// Aggregate function applied in place of the column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub function: String,
    pub columns: Vec<Ident>,
}

/// An ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    Column { column: Ident, direction: Direction },
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// `asc` (any case) is ascending; anything else sorts descending.
    pub fn parse(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Row locking mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lock {
    /// Exclusive lock (`for update`).
    Update,
    /// Shared lock (`for share` / `lock in share mode`).
    Shared,
    /// Dialect-specific lock clause, emitted verbatim.
    Raw(String),
}

impl From<bool> for Lock {
    fn from(value: bool) -> Self {
        if value { Self::Update } else { Self::Shared }
    }
}

impl From<&str> for Lock {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<String> for Lock {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

/// A query appended with UNION / UNION ALL.
#[derive(Debug, Clone)]
pub struct Union {
    pub query: Box<Builder>,
    pub all: bool,
}

/// Clause model for a single query, subquery or join.
#[derive(Clone, Debug)]
pub struct Builder {
    pub(crate) grammar: Arc<dyn Grammar>,
    pub(crate) aggregate: Option<Aggregate>,
    pub(crate) columns: Vec<Ident>,
    pub(crate) distinct: bool,
    pub(crate) from: Option<Ident>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) wheres: Vec<Predicate>,
    pub(crate) groups: Vec<Ident>,
    pub(crate) havings: Vec<Predicate>,
    pub(crate) orders: Vec<Order>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) unions: Vec<Union>,
    pub(crate) union_orders: Vec<Order>,
    pub(crate) union_limit: Option<u64>,
    pub(crate) union_offset: Option<u64>,
    pub(crate) lock: Option<Lock>,
    pub(crate) bindings: Bindings,
    /// First construction error, reported when the query is built.
    pub(crate) build_error: Option<QbError>,
}

impl Builder {
    /// Create an empty builder compiled by `grammar`.
    pub fn new(grammar: Arc<dyn Grammar>) -> Self {
        Self {
            grammar,
            aggregate: None,
            columns: Vec::new(),
            distinct: false,
            from: None,
            joins: Vec::new(),
            wheres: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            unions: Vec::new(),
            union_orders: Vec::new(),
            union_limit: None,
            union_offset: None,
            lock: None,
            bindings: Bindings::new(),
            build_error: None,
        }
    }

    /// A fresh builder sharing this builder's grammar.
    pub fn new_query(&self) -> Builder {
        Builder::new(Arc::clone(&self.grammar))
    }

    /// A fresh builder for a subquery.
    pub fn for_sub_query(&self) -> Builder {
        self.new_query()
    }

    /// A fresh builder over the same table, used to collect a nested predicate group.
    pub fn for_nested_where(&self) -> Builder {
        let mut query = self.new_query();
        query.from = self.from.clone();
        query
    }

    pub fn grammar(&self) -> &Arc<dyn Grammar> {
        &self.grammar
    }

    // ==================== FROM / SELECT ====================

    /// Set the table the query targets.
    pub fn table(mut self, table: impl Into<Ident>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Replace the selected columns.
    pub fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        self.columns = idents(columns);
        self
    }

    /// Append selected columns.
    pub fn add_select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        self.columns.extend(idents(columns));
        self
    }

    /// Append a raw select expression with its bindings.
    pub fn select_raw<I, V>(mut self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.columns.push(Ident::Raw(Expression::new(sql)));
        self.bindings
            .extend(BindingKind::Select, bindings.into_iter().map(Into::into));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== Bindings ====================

    /// Append values to a binding category.
    pub fn add_binding<I, V>(mut self, values: I, kind: BindingKind) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.bindings
            .extend(kind, values.into_iter().map(Into::into));
        self
    }

    /// Append values to a binding category named by string.
    ///
    /// An unknown category is recorded as an `InvalidArgument` build error.
    pub fn add_binding_named<I, V>(self, values: I, kind: &str) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        match kind.parse::<BindingKind>() {
            Ok(kind) => self.add_binding(values, kind),
            Err(err) => self.with_error(err),
        }
    }

    /// All bind values in SELECT placeholder order.
    pub fn get_bindings(&self) -> Vec<Value> {
        self.bindings.flatten()
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    // ==================== GROUP / ORDER / LIMIT ====================

    pub fn group_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        self.groups.extend(idents(columns));
        self
    }

    /// Add an ORDER BY column. Once a union exists, orders apply to the union.
    pub fn order_by(mut self, column: impl Into<Ident>, direction: &str) -> Self {
        let order = Order::Column {
            column: column.into(),
            direction: Direction::parse(direction),
        };
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    pub fn order_by_desc(self, column: impl Into<Ident>) -> Self {
        self.order_by(column, "desc")
    }

    /// Add a raw ORDER BY fragment with its bindings.
    pub fn order_by_raw<I, V>(mut self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let order = Order::Raw(sql.to_string());
        let values = bindings.into_iter().map(Into::into);
        if self.unions.is_empty() {
            self.orders.push(order);
            self.bindings.extend(BindingKind::Order, values);
        } else {
            self.union_orders.push(order);
            self.bindings.extend_union_order(values);
        }
        self
    }

    /// Set LIMIT. Negative values are ignored.
    pub fn limit(mut self, value: i64) -> Self {
        let Ok(value) = u64::try_from(value) else {
            return self;
        };
        if self.unions.is_empty() {
            self.limit = Some(value);
        } else {
            self.union_limit = Some(value);
        }
        self
    }

    /// Set OFFSET. Negative values are clamped to zero.
    pub fn offset(mut self, value: i64) -> Self {
        let value = value.max(0) as u64;
        if self.unions.is_empty() {
            self.offset = Some(value);
        } else {
            self.union_offset = Some(value);
        }
        self
    }

    /// Alias for [`Builder::limit`].
    pub fn take(self, value: i64) -> Self {
        self.limit(value)
    }

    /// Alias for [`Builder::offset`].
    pub fn skip(self, value: i64) -> Self {
        self.offset(value)
    }

    /// Page-based pagination (1-based `page`).
    pub fn for_page(self, page: i64, per_page: i64) -> Self {
        self.skip((page - 1).saturating_mul(per_page)).take(per_page)
    }

    // ==================== UNION / LOCK ====================

    pub fn union(self, query: Builder) -> Self {
        self.push_union(query, false)
    }

    pub fn union_all(self, query: Builder) -> Self {
        self.push_union(query, true)
    }

    /// Union with a query built by `f` from a fresh builder.
    pub fn union_with<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.new_query());
        self.push_union(query, false)
    }

    pub fn union_all_with<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.new_query());
        self.push_union(query, true)
    }

    fn push_union(mut self, query: Builder, all: bool) -> Self {
        self.absorb_error(&query);
        self.bindings
            .extend(BindingKind::Union, query.get_bindings());
        self.unions.push(Union {
            query: Box::new(query),
            all,
        });
        self
    }

    /// Lock the selected rows: `true` for update, `false` for shared, or a raw clause.
    pub fn lock(mut self, lock: impl Into<Lock>) -> Self {
        self.lock = Some(lock.into());
        self
    }

    pub fn lock_for_update(self) -> Self {
        self.lock(Lock::Update)
    }

    pub fn shared_lock(self) -> Self {
        self.lock(Lock::Shared)
    }

    // ==================== Conditional building ====================

    /// Apply `f` only when `condition` holds.
    pub fn when<F>(self, condition: bool, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        if condition { f(self) } else { self }
    }

    /// Apply `then` when `condition` holds, `otherwise` when it does not.
    pub fn when_else<F, G>(self, condition: bool, then: F, otherwise: G) -> Self
    where
        F: FnOnce(Builder) -> Builder,
        G: FnOnce(Builder) -> Builder,
    {
        if condition { then(self) } else { otherwise(self) }
    }

    /// Apply `f` with the contained value when `value` is `Some`.
    pub fn when_some<T, F>(self, value: Option<T>, f: F) -> Self
    where
        F: FnOnce(Builder, T) -> Builder,
    {
        match value {
            Some(v) => f(self, v),
            None => self,
        }
    }

    // ==================== Aggregates ====================

    /// A copy of this query that selects `function(columns)` instead of its column list.
    pub(crate) fn aggregate_view(&self, function: &str, columns: Vec<Ident>) -> Builder {
        let mut view = self.clone();
        view.columns.clear();
        view.bindings.clear(BindingKind::Select);
        view.aggregate = Some(Aggregate {
            function: function.to_string(),
            columns: if columns.is_empty() {
                vec![Ident::from("*")]
            } else {
                columns
            },
        });
        if !view.groups.is_empty() {
            view.orders.clear();
            view.bindings.clear(BindingKind::Order);
        }
        view
    }

    // ==================== Errors ====================

    pub(crate) fn with_error(mut self, err: QbError) -> Self {
        self.record_error(err);
        self
    }

    pub(crate) fn record_error(&mut self, err: QbError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    /// Inherit a nested builder's construction error.
    pub(crate) fn absorb_error(&mut self, other: &Builder) {
        if let Some(err) = &other.build_error {
            self.record_error(err.clone());
        }
    }

    /// Report the first construction error, if any.
    pub fn validate(&self) -> QbResult<()> {
        match &self.build_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    // ==================== Compilation ====================

    /// Render the SELECT statement (for debugging; see [`Builder::build_select`]).
    pub fn to_sql(&self) -> String {
        self.grammar.compile_select(self)
    }

    pub fn build_select(&self) -> QbResult<BuiltQuery> {
        self.validate()?;
        Ok(BuiltQuery::new(self.to_sql(), self.get_bindings()))
    }

    /// `select exists(<this query>) as "exists"`.
    pub fn build_exists(&self) -> QbResult<BuiltQuery> {
        self.validate()?;
        Ok(BuiltQuery::new(
            self.grammar.compile_exists(self),
            self.get_bindings(),
        ))
    }

    /// INSERT one or more rows. Every row must have the first row's columns.
    pub fn build_insert(&self, rows: &[Record]) -> QbResult<BuiltQuery> {
        self.validate()?;
        let sql = self.grammar.compile_insert(self, rows)?;
        Ok(BuiltQuery::new(sql, insert_bindings(rows)?))
    }

    /// INSERT a row and return its generated key.
    ///
    /// `sequence` names the key column (`id` by default) on dialects with `RETURNING`.
    pub fn build_insert_get_id(
        &self,
        record: &Record,
        sequence: Option<&str>,
    ) -> QbResult<BuiltQuery> {
        self.validate()?;
        let sql = self
            .grammar
            .compile_insert_get_id(self, record, sequence)?;
        Ok(BuiltQuery::new(sql, record.values().cloned().collect()))
    }

    /// INSERT rows, skipping rows that conflict with existing ones.
    pub fn build_insert_or_ignore(&self, rows: &[Record]) -> QbResult<BuiltQuery> {
        self.validate()?;
        let sql = self.grammar.compile_insert_or_ignore(self, rows)?;
        Ok(BuiltQuery::new(sql, insert_bindings(rows)?))
    }

    pub fn build_update(&self, record: &Record) -> QbResult<BuiltQuery> {
        self.validate()?;
        let sql = self.grammar.compile_update(self, record)?;
        Ok(BuiltQuery::new(
            sql,
            self.grammar.prepare_bindings_for_update(self, record),
        ))
    }

    pub fn build_delete(&self) -> QbResult<BuiltQuery> {
        self.validate()?;
        let sql = self.grammar.compile_delete(self)?;
        Ok(BuiltQuery::new(
            sql,
            self.grammar.prepare_bindings_for_delete(self),
        ))
    }

    pub fn build_truncate(&self) -> QbResult<BuiltQuery> {
        self.validate()?;
        Ok(BuiltQuery::new(self.grammar.compile_truncate(self)?, Vec::new()))
    }
}

fn insert_bindings(rows: &[Record]) -> QbResult<Vec<Value>> {
    let (_, aligned) = align_rows(rows)?;
    Ok(aligned
        .into_iter()
        .flatten()
        .filter_map(|operand| operand.as_value().cloned())
        .collect())
}
