//! JOIN clauses.

use super::{BindingKind, Builder, Connector};
use crate::grammar::Grammar;
use crate::ident::Ident;
use crate::value::{Operand, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Cross => "cross",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A joined table and its `on` predicates.
///
/// The predicates live in an inner [`Builder`], so joins support the same
/// predicate shapes as WHERE.
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: Ident,
    pub(crate) query: Builder,
}

impl JoinClause {
    pub fn new(kind: JoinKind, table: impl Into<Ident>, grammar: Arc<dyn Grammar>) -> Self {
        Self {
            kind,
            table: table.into(),
            query: Builder::new(grammar),
        }
    }

    fn fork(&self) -> Self {
        Self {
            kind: self.kind,
            table: self.table.clone(),
            query: self.query.new_query(),
        }
    }

    /// The join's predicate tree.
    pub fn query(&self) -> &Builder {
        &self.query
    }

    /// `on first <operator> second`.
    pub fn on(mut self, first: impl Into<Ident>, operator: &str, second: impl Into<Ident>) -> Self {
        self.query = self
            .query
            .add_where_column(first.into(), operator, second.into(), Connector::And);
        self
    }

    pub fn or_on(mut self, first: impl Into<Ident>, operator: &str, second: impl Into<Ident>) -> Self {
        self.query = self
            .query
            .add_where_column(first.into(), operator, second.into(), Connector::Or);
        self
    }

    /// A parenthesized group of join predicates built by `f`.
    pub fn on_group<F>(self, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.add_group(f, Connector::And)
    }

    pub fn or_on_group<F>(self, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.add_group(f, Connector::Or)
    }

    fn add_group<F>(mut self, f: F, connector: Connector) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        let nested = f(self.fork());
        self.query = self.query.add_nested_where_query(nested.query, connector);
        self
    }

    /// `on column <operator> value`, binding the value.
    pub fn where_(mut self, column: impl Into<Ident>, operator: &str, value: impl Into<Operand>) -> Self {
        self.query = self.query.where_(column, operator, value);
        self
    }

    pub fn or_where(mut self, column: impl Into<Ident>, operator: &str, value: impl Into<Operand>) -> Self {
        self.query = self.query.or_where(column, operator, value);
        self
    }

    pub fn where_null(mut self, column: impl Into<Ident>) -> Self {
        self.query = self.query.where_null(column);
        self
    }

    pub fn where_not_null(mut self, column: impl Into<Ident>) -> Self {
        self.query = self.query.where_not_null(column);
        self
    }

    pub fn where_in<I, V>(mut self, column: impl Into<Ident>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        self.query = self.query.where_in(column, values);
        self
    }

    pub fn where_raw<I, V>(mut self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.query = self.query.where_raw(sql, bindings);
        self
    }

    /// Bind values of the join's predicates, in render order.
    pub fn get_bindings(&self) -> Vec<Value> {
        self.query.get_bindings()
    }
}

impl Builder {
    fn push_join(mut self, join: JoinClause) -> Self {
        self.absorb_error(&join.query);
        self.bindings
            .extend(BindingKind::Join, join.get_bindings());
        self.joins.push(join);
        self
    }

    fn join_on(
        self,
        kind: JoinKind,
        table: Ident,
        first: Ident,
        operator: &str,
        second: Ident,
    ) -> Self {
        let join = JoinClause::new(kind, table, Arc::clone(&self.grammar)).on(first, operator, second);
        self.push_join(join)
    }

    fn join_where_value(
        self,
        kind: JoinKind,
        table: Ident,
        first: Ident,
        operator: &str,
        value: Operand,
    ) -> Self {
        let join = JoinClause::new(kind, table, Arc::clone(&self.grammar)).where_(first, operator, value);
        self.push_join(join)
    }

    fn join_callback<F>(self, kind: JoinKind, table: Ident, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        let join = f(JoinClause::new(kind, table, Arc::clone(&self.grammar)));
        self.push_join(join)
    }

    /// `inner join table on first <operator> second`.
    pub fn join(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Self {
        self.join_on(JoinKind::Inner, table.into(), first.into(), operator, second.into())
    }

    /// Inner join whose predicates are built by `f`.
    pub fn join_with<F>(self, table: impl Into<Ident>, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_callback(JoinKind::Inner, table.into(), f)
    }

    /// `inner join table on first <operator> ?`, binding `value`.
    pub fn join_where(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.join_where_value(JoinKind::Inner, table.into(), first.into(), operator, value.into())
    }

    pub fn left_join(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Self {
        self.join_on(JoinKind::Left, table.into(), first.into(), operator, second.into())
    }

    pub fn left_join_with<F>(self, table: impl Into<Ident>, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_callback(JoinKind::Left, table.into(), f)
    }

    pub fn left_join_where(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.join_where_value(JoinKind::Left, table.into(), first.into(), operator, value.into())
    }

    pub fn right_join(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Self {
        self.join_on(JoinKind::Right, table.into(), first.into(), operator, second.into())
    }

    pub fn right_join_with<F>(self, table: impl Into<Ident>, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_callback(JoinKind::Right, table.into(), f)
    }

    pub fn right_join_where(
        self,
        table: impl Into<Ident>,
        first: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.join_where_value(JoinKind::Right, table.into(), first.into(), operator, value.into())
    }

    /// `cross join table`.
    pub fn cross_join(self, table: impl Into<Ident>) -> Self {
        let join = JoinClause::new(JoinKind::Cross, table, Arc::clone(&self.grammar));
        self.push_join(join)
    }

    /// Cross join with predicates built by `f`.
    pub fn cross_join_with<F>(self, table: impl Into<Ident>, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_callback(JoinKind::Cross, table.into(), f)
    }
}
