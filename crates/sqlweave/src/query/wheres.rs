//! WHERE and HAVING clauses.

use super::{BindingKind, Builder, Connector, OPERATORS, Predicate};
use crate::error::QbError;
use crate::expression::Expression;
use crate::ident::Ident;
use crate::value::{Operand, Value};

/// Operators that may be compared against NULL.
const NULL_SAFE_OPERATORS: &[&str] = &["=", "<>", "!="];

fn contains(operators: &[&str], operator: &str) -> bool {
    operators.iter().any(|op| *op == operator)
}

impl Builder {
    /// Whether `operator` is known to the builder or to the active dialect.
    pub(crate) fn is_known_operator(&self, operator: &str) -> bool {
        let operator = operator.to_ascii_lowercase();
        contains(OPERATORS, &operator) || contains(self.grammar.operators(), &operator)
    }

    /// Resolve an operator/value pair.
    ///
    /// `None` means the pair is illegal (a comparison operator against NULL).
    /// Unknown operators are treated as the value of an equality test.
    fn prepare_value_and_operator(&self, operator: &str, value: Operand) -> Option<(String, Operand)> {
        let lowered = operator.to_ascii_lowercase();
        if value.is_null()
            && contains(OPERATORS, &lowered)
            && !contains(NULL_SAFE_OPERATORS, &lowered)
        {
            return None;
        }
        if self.is_known_operator(operator) {
            Some((operator.to_string(), value))
        } else {
            Some(("=".to_string(), Operand::Value(Value::Text(operator.to_string()))))
        }
    }

    pub(crate) fn add_where(
        mut self,
        column: Ident,
        operator: &str,
        value: Operand,
        connector: Connector,
    ) -> Self {
        let Some((operator, mut value)) = self.prepare_value_and_operator(operator, value) else {
            return self.with_error(QbError::invalid_argument(format!(
                "Illegal operator and value combination: {} {operator} NULL",
                column.as_str()
            )));
        };

        if value.is_null() {
            return self.add_where_null(column, connector, operator != "=");
        }

        if column.is_json_selector()
            && let Operand::Value(Value::Bool(b)) = value
        {
            value = Operand::Expr(Expression::new(if b { "true" } else { "false" }));
        }

        if let Operand::Value(v) = &value {
            self.bindings.push(BindingKind::Where, v.clone());
        }
        self.wheres.push(Predicate::Basic {
            column,
            operator,
            value,
            connector,
        });
        self
    }

    // ==================== Basic ====================

    /// `column <operator> value`.
    ///
    /// A NULL value turns `=` into `is null` and any other null-safe
    /// operator into `is not null`; comparing NULL with `<`, `like`, ... is an error.
    pub fn where_(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.add_where(column.into(), operator, value.into(), Connector::And)
    }

    pub fn or_where(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.add_where(column.into(), operator, value.into(), Connector::Or)
    }

    /// `column = value`.
    pub fn where_eq(self, column: impl Into<Ident>, value: impl Into<Operand>) -> Self {
        self.where_(column, "=", value)
    }

    pub fn or_where_eq(self, column: impl Into<Ident>, value: impl Into<Operand>) -> Self {
        self.or_where(column, "=", value)
    }

    /// A parenthesized AND group of `(column, operator, value)` conditions.
    pub fn where_all<I, C, O, V>(self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (C, O, V)>,
        C: Into<Ident>,
        O: AsRef<str>,
        V: Into<Operand>,
    {
        self.add_condition_group(conditions, Connector::And)
    }

    pub fn or_where_all<I, C, O, V>(self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (C, O, V)>,
        C: Into<Ident>,
        O: AsRef<str>,
        V: Into<Operand>,
    {
        self.add_condition_group(conditions, Connector::Or)
    }

    fn add_condition_group<I, C, O, V>(self, conditions: I, connector: Connector) -> Self
    where
        I: IntoIterator<Item = (C, O, V)>,
        C: Into<Ident>,
        O: AsRef<str>,
        V: Into<Operand>,
    {
        let nested = conditions
            .into_iter()
            .fold(self.for_nested_where(), |q, (column, operator, value)| {
                q.where_(column, operator.as_ref(), value)
            });
        self.add_nested_where_query(nested, connector)
    }

    /// A parenthesized group of `column = value` pairs joined by AND.
    pub fn where_map<I, C, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<Ident>,
        V: Into<Operand>,
    {
        self.add_map_group(pairs, Connector::And)
    }

    /// A parenthesized group of `column = value` pairs joined by OR.
    pub fn or_where_map<I, C, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<Ident>,
        V: Into<Operand>,
    {
        self.add_map_group(pairs, Connector::Or)
    }

    fn add_map_group<I, C, V>(self, pairs: I, connector: Connector) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<Ident>,
        V: Into<Operand>,
    {
        let nested = pairs
            .into_iter()
            .fold(self.for_nested_where(), |q, (column, value)| {
                q.add_where(column.into(), "=", value.into(), connector)
            });
        self.add_nested_where_query(nested, connector)
    }

    // ==================== Nested ====================

    /// A parenthesized group built by `f`.
    pub fn where_group<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let nested = f(self.for_nested_where());
        self.add_nested_where_query(nested, Connector::And)
    }

    pub fn or_where_group<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let nested = f(self.for_nested_where());
        self.add_nested_where_query(nested, Connector::Or)
    }

    /// Append `query`'s predicates as a parenthesized group.
    ///
    /// A builder without predicates adds nothing.
    pub fn add_nested_where_query(mut self, query: Builder, connector: Connector) -> Self {
        self.absorb_error(&query);
        if !query.wheres.is_empty() {
            self.bindings.extend(
                BindingKind::Where,
                query.bindings.get(BindingKind::Where).iter().cloned(),
            );
            self.wheres.push(Predicate::Nested {
                query: Box::new(query),
                connector,
            });
        }
        self
    }

    /// `column <operator> (subquery)`, the subquery built by `f`.
    pub fn where_sub<F>(self, column: impl Into<Ident>, operator: &str, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_sub(column.into(), operator, query, Connector::And)
    }

    pub fn or_where_sub<F>(self, column: impl Into<Ident>, operator: &str, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_sub(column.into(), operator, query, Connector::Or)
    }

    fn add_where_sub(
        mut self,
        column: Ident,
        operator: &str,
        query: Builder,
        connector: Connector,
    ) -> Self {
        self.absorb_error(&query);
        self.bindings
            .extend(BindingKind::Where, query.get_bindings());
        self.wheres.push(Predicate::Sub {
            column,
            operator: operator.to_string(),
            query: Box::new(query),
            connector,
        });
        self
    }

    // ==================== Column comparison ====================

    /// `first <operator> second`, comparing two columns.
    ///
    /// An unknown operator is taken as the second column of an equality test.
    pub fn where_column(
        self,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Self {
        self.add_where_column(first.into(), operator, second.into(), Connector::And)
    }

    pub fn or_where_column(
        self,
        first: impl Into<Ident>,
        operator: &str,
        second: impl Into<Ident>,
    ) -> Self {
        self.add_where_column(first.into(), operator, second.into(), Connector::Or)
    }

    /// A parenthesized AND group of column comparisons.
    pub fn where_columns<I, A, O, B>(self, comparisons: I) -> Self
    where
        I: IntoIterator<Item = (A, O, B)>,
        A: Into<Ident>,
        O: AsRef<str>,
        B: Into<Ident>,
    {
        let nested = comparisons
            .into_iter()
            .fold(self.for_nested_where(), |q, (first, operator, second)| {
                q.where_column(first, operator.as_ref(), second)
            });
        self.add_nested_where_query(nested, Connector::And)
    }

    pub(crate) fn add_where_column(
        mut self,
        first: Ident,
        operator: &str,
        second: Ident,
        connector: Connector,
    ) -> Self {
        let (operator, second) = if self.is_known_operator(operator) {
            (operator.to_string(), second)
        } else {
            ("=".to_string(), Ident::from(operator))
        };
        self.wheres.push(Predicate::Column {
            first,
            operator,
            second,
            connector,
        });
        self
    }

    // ==================== Raw ====================

    pub fn where_raw<I, V>(self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_where_raw(sql, bindings, Connector::And)
    }

    pub fn or_where_raw<I, V>(self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_where_raw(sql, bindings, Connector::Or)
    }

    fn add_where_raw<I, V>(mut self, sql: &str, bindings: I, connector: Connector) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.wheres.push(Predicate::Raw {
            sql: sql.to_string(),
            connector,
        });
        self.bindings
            .extend(BindingKind::Where, bindings.into_iter().map(Into::into));
        self
    }

    // ==================== IN ====================

    /// `column in (values...)`. An empty list never matches.
    pub fn where_in<I, V>(self, column: impl Into<Ident>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        self.add_where_in(column.into(), values, Connector::And, false)
    }

    pub fn or_where_in<I, V>(self, column: impl Into<Ident>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        self.add_where_in(column.into(), values, Connector::Or, false)
    }

    /// `column not in (values...)`. An empty list always matches.
    pub fn where_not_in<I, V>(self, column: impl Into<Ident>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        self.add_where_in(column.into(), values, Connector::And, true)
    }

    pub fn or_where_not_in<I, V>(self, column: impl Into<Ident>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        self.add_where_in(column.into(), values, Connector::Or, true)
    }

    pub(crate) fn add_where_in<I, V>(
        mut self,
        column: Ident,
        values: I,
        connector: Connector,
        negated: bool,
    ) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let values: Vec<Operand> = values.into_iter().map(Into::into).collect();
        self.bindings.extend(
            BindingKind::Where,
            values.iter().filter_map(|v| v.as_value().cloned()),
        );
        self.wheres.push(Predicate::In {
            column,
            values,
            negated,
            connector,
        });
        self
    }

    /// `column in (subquery)`, the subquery built by `f`.
    pub fn where_in_sub<F>(self, column: impl Into<Ident>, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_in_sub(column.into(), query, Connector::And, false)
    }

    pub fn or_where_in_sub<F>(self, column: impl Into<Ident>, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_in_sub(column.into(), query, Connector::Or, false)
    }

    pub fn where_not_in_sub<F>(self, column: impl Into<Ident>, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_in_sub(column.into(), query, Connector::And, true)
    }

    pub fn or_where_not_in_sub<F>(self, column: impl Into<Ident>, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_in_sub(column.into(), query, Connector::Or, true)
    }

    /// `column in (query)` for an already-built query.
    pub fn where_in_query(self, column: impl Into<Ident>, query: Builder) -> Self {
        self.add_where_in_sub(column.into(), query, Connector::And, false)
    }

    pub fn where_not_in_query(self, column: impl Into<Ident>, query: Builder) -> Self {
        self.add_where_in_sub(column.into(), query, Connector::And, true)
    }

    fn add_where_in_sub(
        mut self,
        column: Ident,
        query: Builder,
        connector: Connector,
        negated: bool,
    ) -> Self {
        self.absorb_error(&query);
        self.bindings
            .extend(BindingKind::Where, query.get_bindings());
        self.wheres.push(Predicate::InSub {
            column,
            query: Box::new(query),
            negated,
            connector,
        });
        self
    }

    // ==================== NULL ====================

    pub fn where_null(self, column: impl Into<Ident>) -> Self {
        self.add_where_null(column.into(), Connector::And, false)
    }

    pub fn or_where_null(self, column: impl Into<Ident>) -> Self {
        self.add_where_null(column.into(), Connector::Or, false)
    }

    pub fn where_not_null(self, column: impl Into<Ident>) -> Self {
        self.add_where_null(column.into(), Connector::And, true)
    }

    pub fn or_where_not_null(self, column: impl Into<Ident>) -> Self {
        self.add_where_null(column.into(), Connector::Or, true)
    }

    pub(crate) fn add_where_null(mut self, column: Ident, connector: Connector, negated: bool) -> Self {
        self.wheres.push(Predicate::Null {
            column,
            negated,
            connector,
        });
        self
    }

    // ==================== BETWEEN ====================

    pub fn where_between(
        self,
        column: impl Into<Ident>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        self.add_where_between(column.into(), [from.into(), to.into()], Connector::And, false)
    }

    pub fn or_where_between(
        self,
        column: impl Into<Ident>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        self.add_where_between(column.into(), [from.into(), to.into()], Connector::Or, false)
    }

    pub fn where_not_between(
        self,
        column: impl Into<Ident>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        self.add_where_between(column.into(), [from.into(), to.into()], Connector::And, true)
    }

    pub fn or_where_not_between(
        self,
        column: impl Into<Ident>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        self.add_where_between(column.into(), [from.into(), to.into()], Connector::Or, true)
    }

    fn add_where_between(
        mut self,
        column: Ident,
        range: [Value; 2],
        connector: Connector,
        negated: bool,
    ) -> Self {
        self.wheres.push(Predicate::Between {
            column,
            negated,
            connector,
        });
        self.bindings.extend(BindingKind::Where, range);
        self
    }

    // ==================== EXISTS ====================

    /// `exists (subquery)`, the subquery built by `f`.
    pub fn where_exists<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_exists_query(query, Connector::And, false)
    }

    pub fn or_where_exists<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_exists_query(query, Connector::Or, false)
    }

    pub fn where_not_exists<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_exists_query(query, Connector::And, true)
    }

    pub fn or_where_not_exists<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        let query = f(self.for_sub_query());
        self.add_where_exists_query(query, Connector::Or, true)
    }

    /// Append `[not] exists (query)` for an already-built query.
    pub fn add_where_exists_query(
        mut self,
        query: Builder,
        connector: Connector,
        negated: bool,
    ) -> Self {
        self.absorb_error(&query);
        self.bindings
            .extend(BindingKind::Where, query.get_bindings());
        self.wheres.push(Predicate::Exists {
            query: Box::new(query),
            negated,
            connector,
        });
        self
    }

    // ==================== HAVING ====================

    pub fn having(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.add_having(column.into(), operator, value.into(), Connector::And)
    }

    pub fn or_having(
        self,
        column: impl Into<Ident>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Self {
        self.add_having(column.into(), operator, value.into(), Connector::Or)
    }

    fn add_having(
        mut self,
        column: Ident,
        operator: &str,
        value: Operand,
        connector: Connector,
    ) -> Self {
        let Some((operator, value)) = self.prepare_value_and_operator(operator, value) else {
            return self.with_error(QbError::invalid_argument(format!(
                "Illegal operator and value combination: {} {operator} NULL",
                column.as_str()
            )));
        };
        if let Operand::Value(v) = &value {
            self.bindings.push(BindingKind::Having, v.clone());
        }
        self.havings.push(Predicate::Basic {
            column,
            operator,
            value,
            connector,
        });
        self
    }

    pub fn having_raw<I, V>(self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_having_raw(sql, bindings, Connector::And)
    }

    pub fn or_having_raw<I, V>(self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_having_raw(sql, bindings, Connector::Or)
    }

    fn add_having_raw<I, V>(mut self, sql: &str, bindings: I, connector: Connector) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.havings.push(Predicate::Raw {
            sql: sql.to_string(),
            connector,
        });
        self.bindings
            .extend(BindingKind::Having, bindings.into_iter().map(Into::into));
        self
    }
}
