//! Shared SQL rendering.
//!
//! These functions implement the default behavior of [`Grammar`]. They take
//! the grammar as a parameter so dialect hooks (quoting, placeholders, lock
//! clauses, nested `compile_select` calls) are honored at every level.

use super::Grammar;
use crate::error::{QbError, QbResult};
use crate::ident::Ident;
use crate::query::{Aggregate, BindingKind, Builder, JoinClause, Order, Predicate};
use crate::value::{Operand, Record, Value, align_rows};
use regex::Regex;
use std::sync::LazyLock;

static ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+as\s+").expect("alias pattern is valid"));

// ==================== Identifiers ====================

/// Surround `name` with `quote`, doubling embedded quote characters.
pub fn quote(name: &str, quote: char) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for c in name.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}

/// Split `target as alias` (case-insensitive `as`).
pub fn split_alias(value: &str) -> Option<(&str, &str)> {
    ALIAS
        .find(value)
        .map(|m| (&value[..m.start()], &value[m.end()..]))
}

/// Wrap a column specifier.
pub fn wrap<G: Grammar + ?Sized>(g: &G, ident: &Ident) -> String {
    match ident {
        Ident::Raw(expr) => expr.value().to_string(),
        Ident::Name(name) => wrap_str(g, name, false),
    }
}

/// Wrap a dotted, possibly aliased name. With `prefix_alias` the alias gets the table prefix.
pub fn wrap_str<G: Grammar + ?Sized>(g: &G, value: &str, prefix_alias: bool) -> String {
    if let Some((target, alias)) = split_alias(value) {
        let alias = if prefix_alias {
            format!("{}{alias}", g.table_prefix())
        } else {
            alias.to_string()
        };
        return format!("{} as {}", wrap_str(g, target, false), g.wrap_value(&alias));
    }
    wrap_segments(g, value)
}

/// Wrap `a.b.c`; the leading segment of a qualified name is a table and gets the prefix.
pub fn wrap_segments<G: Grammar + ?Sized>(g: &G, value: &str) -> String {
    let segments: Vec<&str> = value.split('.').collect();
    let qualified = segments.len() > 1;
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if i == 0 && qualified {
                wrap_str(g, &format!("{}{segment}", g.table_prefix()), true)
            } else {
                g.wrap_value(segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Wrap a table specifier, applying the table prefix to the table and its alias.
pub fn wrap_table<G: Grammar + ?Sized>(g: &G, table: &Ident) -> String {
    match table {
        Ident::Raw(expr) => expr.value().to_string(),
        Ident::Name(name) => wrap_str(g, &format!("{}{name}", g.table_prefix()), true),
    }
}

/// `"col"->'a'->>'b'`: every step but the last yields JSON, the last yields text.
pub fn wrap_json_arrows<G: Grammar + ?Sized>(g: &G, value: &str) -> String {
    let Some((field, path)) = value.split_once("->") else {
        return g.quote_identifier(value);
    };
    let mut attributes: Vec<String> = path
        .split("->")
        .map(|attr| format!("'{}'", attr.trim().replace('\'', "''")))
        .collect();
    let field = g.quote_identifier(field.trim());
    match attributes.pop() {
        Some(last) if attributes.is_empty() => format!("{field}->>{last}"),
        Some(last) => format!("{field}->{}->>{last}", attributes.join("->")),
        None => field,
    }
}

pub fn columnize<G: Grammar + ?Sized>(g: &G, columns: &[Ident]) -> String {
    columns
        .iter()
        .map(|c| wrap(g, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Placeholder for a bound value; expressions are inlined.
pub fn parameter<G: Grammar + ?Sized>(g: &G, operand: &Operand) -> String {
    match operand {
        Operand::Value(_) => g.parameter_token().to_string(),
        Operand::Expr(expr) => expr.value().to_string(),
    }
}

pub fn parameterize<'a, G, I>(g: &G, operands: I) -> String
where
    G: Grammar + ?Sized,
    I: IntoIterator<Item = &'a Operand>,
{
    operands
        .into_iter()
        .map(|o| parameter(g, o))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Join non-empty parts with single spaces.
pub fn concatenate<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip one leading `and ` / `or ` (any case).
pub fn remove_leading_boolean(sql: &str) -> &str {
    for prefix in ["and ", "or "] {
        if let Some(head) = sql.get(..prefix.len())
            && head.eq_ignore_ascii_case(prefix)
        {
            return &sql[prefix.len()..];
        }
    }
    sql
}

/// The wrapped target table; statements other than SELECT require one.
pub fn target_table<G: Grammar + ?Sized>(g: &G, query: &Builder) -> QbResult<String> {
    query
        .from
        .as_ref()
        .map(|table| wrap_table(g, table))
        .ok_or_else(|| QbError::invalid_argument("query has no target table"))
}

// ==================== SELECT ====================

pub fn compile_select<G: Grammar + ?Sized>(g: &G, query: &Builder) -> String {
    let sql = concatenate(compile_components(g, query));
    if query.unions.is_empty() || !g.wraps_union_branches() {
        return sql;
    }
    concatenate([format!("({sql})"), compile_unions(g, query)])
}

/// Clause fragments in their fixed order; empty strings for absent clauses.
pub fn compile_components<G: Grammar + ?Sized>(g: &G, query: &Builder) -> Vec<String> {
    let aggregate = query.aggregate.as_ref();
    vec![
        aggregate
            .map(|a| compile_aggregate(g, query, a))
            .unwrap_or_default(),
        if aggregate.is_none() {
            compile_columns(g, query)
        } else {
            String::new()
        },
        compile_from(g, query),
        compile_joins(g, &query.joins),
        compile_wheres(g, query),
        compile_groups(g, query),
        compile_havings(g, query),
        compile_orders(g, &query.orders),
        compile_limit(query.limit),
        compile_offset(query.offset),
        if g.wraps_union_branches() {
            String::new()
        } else {
            compile_unions(g, query)
        },
        query
            .lock
            .as_ref()
            .map(|lock| g.compile_lock(query, lock))
            .unwrap_or_default(),
    ]
}

pub fn compile_aggregate<G: Grammar + ?Sized>(
    g: &G,
    query: &Builder,
    aggregate: &Aggregate,
) -> String {
    let mut column = columnize(g, &aggregate.columns);
    if query.distinct && column != "*" {
        column = format!("distinct {column}");
    }
    format!("select {}({column}) as aggregate", aggregate.function)
}

/// `select [distinct] columns`; an empty column list selects `*`.
pub fn compile_columns<G: Grammar + ?Sized>(g: &G, query: &Builder) -> String {
    let select = if query.distinct { "select distinct" } else { "select" };
    if query.columns.is_empty() {
        format!("{select} *")
    } else {
        format!("{select} {}", columnize(g, &query.columns))
    }
}

pub fn compile_from<G: Grammar + ?Sized>(g: &G, query: &Builder) -> String {
    query
        .from
        .as_ref()
        .map(|table| format!("from {}", wrap_table(g, table)))
        .unwrap_or_default()
}

pub fn compile_joins<G: Grammar + ?Sized>(g: &G, joins: &[JoinClause]) -> String {
    joins
        .iter()
        .map(|join| compile_join(g, join))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn compile_join<G: Grammar + ?Sized>(g: &G, join: &JoinClause) -> String {
    let table = wrap_table(g, &join.table);
    let wheres = &join.query().wheres;
    if wheres.is_empty() {
        format!("{} join {table}", join.kind)
    } else {
        format!(
            "{} join {table} on {}",
            join.kind,
            compile_predicates(g, wheres)
        )
    }
}

pub fn compile_wheres<G: Grammar + ?Sized>(g: &G, query: &Builder) -> String {
    if query.wheres.is_empty() {
        return String::new();
    }
    format!("where {}", compile_predicates(g, &query.wheres))
}

/// Render predicates joined by their connectors, without the leading one.
pub fn compile_predicates<'a, G, I>(g: &G, predicates: I) -> String
where
    G: Grammar + ?Sized,
    I: IntoIterator<Item = &'a Predicate>,
{
    let sql = predicates
        .into_iter()
        .map(|p| format!("{} {}", p.connector(), compile_predicate(g, p)))
        .collect::<Vec<_>>()
        .join(" ");
    remove_leading_boolean(&sql).to_string()
}

pub fn compile_predicate<G: Grammar + ?Sized>(g: &G, predicate: &Predicate) -> String {
    let not = |negated: bool| if negated { "not " } else { "" };
    match predicate {
        Predicate::Basic {
            column,
            operator,
            value,
            ..
        } => format!("{} {operator} {}", wrap(g, column), parameter(g, value)),
        Predicate::In {
            values, negated, ..
        } if values.is_empty() => {
            let sql = if *negated { "1 = 1" } else { "0 = 1" };
            sql.to_string()
        }
        Predicate::In {
            column,
            values,
            negated,
            ..
        } => format!(
            "{} {}in ({})",
            wrap(g, column),
            not(*negated),
            parameterize(g, values)
        ),
        Predicate::InSub {
            column,
            query,
            negated,
            ..
        } => format!(
            "{} {}in ({})",
            wrap(g, column),
            not(*negated),
            g.compile_select(query)
        ),
        Predicate::Null {
            column, negated, ..
        } => format!("{} is {}null", wrap(g, column), not(*negated)),
        Predicate::Between {
            column, negated, ..
        } => {
            let token = g.parameter_token();
            format!(
                "{} {}between {token} and {token}",
                wrap(g, column),
                not(*negated)
            )
        }
        Predicate::Column {
            first,
            operator,
            second,
            ..
        } => format!("{} {operator} {}", wrap(g, first), wrap(g, second)),
        Predicate::Nested { query, .. } => format!("({})", compile_predicates(g, &query.wheres)),
        Predicate::Sub {
            column,
            operator,
            query,
            ..
        } => format!("{} {operator} ({})", wrap(g, column), g.compile_select(query)),
        Predicate::Exists { query, negated, .. } => {
            format!("{}exists ({})", not(*negated), g.compile_select(query))
        }
        Predicate::Raw { sql, .. } => sql.clone(),
    }
}

pub fn compile_groups<G: Grammar + ?Sized>(g: &G, query: &Builder) -> String {
    if query.groups.is_empty() {
        return String::new();
    }
    format!("group by {}", columnize(g, &query.groups))
}

pub fn compile_havings<G: Grammar + ?Sized>(g: &G, query: &Builder) -> String {
    if query.havings.is_empty() {
        return String::new();
    }
    format!("having {}", compile_predicates(g, &query.havings))
}

pub fn compile_orders<G: Grammar + ?Sized>(g: &G, orders: &[Order]) -> String {
    if orders.is_empty() {
        return String::new();
    }
    let items = orders
        .iter()
        .map(|order| match order {
            Order::Column { column, direction } => {
                format!("{} {}", wrap(g, column), direction.as_str())
            }
            Order::Raw(sql) => sql.clone(),
        })
        .collect::<Vec<_>>();
    format!("order by {}", items.join(", "))
}

/// Zero limits are omitted.
pub fn compile_limit(limit: Option<u64>) -> String {
    match limit {
        Some(n) if n > 0 => format!("limit {n}"),
        _ => String::new(),
    }
}

/// Zero offsets are omitted.
pub fn compile_offset(offset: Option<u64>) -> String {
    match offset {
        Some(n) if n > 0 => format!("offset {n}"),
        _ => String::new(),
    }
}

/// Union branches followed by the union-level order, limit and offset.
pub fn compile_unions<G: Grammar + ?Sized>(g: &G, query: &Builder) -> String {
    if query.unions.is_empty() {
        return String::new();
    }
    let mut parts: Vec<String> = query
        .unions
        .iter()
        .map(|union| {
            let keyword = if union.all { "union all" } else { "union" };
            let sql = g.compile_select(&union.query);
            if g.wraps_union_branches() {
                format!("{keyword} ({sql})")
            } else {
                format!("{keyword} {sql}")
            }
        })
        .collect();
    parts.push(compile_orders(g, &query.union_orders));
    parts.push(compile_limit(query.union_limit));
    parts.push(compile_offset(query.union_offset));
    concatenate(parts)
}

// ==================== INSERT ====================

/// `insert into t (cols) values (...), (...)`; rows are aligned to the first row's columns.
pub fn compile_insert<G: Grammar + ?Sized>(
    g: &G,
    query: &Builder,
    rows: &[Record],
) -> QbResult<String> {
    let table = target_table(g, query)?;
    let (columns, cells) = align_rows(rows)?;
    if columns.is_empty() {
        return Err(QbError::invalid_argument(format!(
            "insert into {table} requires at least one column"
        )));
    }
    let columns = columns
        .iter()
        .map(|c| wrap_str(g, c, false))
        .collect::<Vec<_>>()
        .join(", ");
    let values = cells
        .iter()
        .map(|row| format!("({})", parameterize(g, row.iter().copied())))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("insert into {table} ({columns}) values {values}"))
}

// ==================== UPDATE ====================

/// `"a" = ?, "b" = NOW()`
pub fn compile_update_columns<G: Grammar + ?Sized>(g: &G, record: &Record) -> String {
    record
        .iter()
        .map(|(column, value)| format!("{} = {}", wrap_str(g, column, false), parameter(g, value)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn require_columns(record: &Record) -> QbResult<()> {
    if record.is_empty() {
        return Err(QbError::invalid_argument(
            "update requires at least one column",
        ));
    }
    Ok(())
}

/// `update t [joins] set ... [where ...]`
pub fn compile_update<G: Grammar + ?Sized>(
    g: &G,
    query: &Builder,
    record: &Record,
) -> QbResult<String> {
    let table = target_table(g, query)?;
    require_columns(record)?;
    Ok(concatenate([
        format!("update {table}"),
        compile_joins(g, &query.joins),
        format!("set {}", compile_update_columns(g, record)),
        compile_wheres(g, query),
    ]))
}

/// Join, then SET, then WHERE bindings.
pub fn update_bindings(query: &Builder, record: &Record) -> Vec<Value> {
    let mut bindings = query.bindings.get(BindingKind::Join).to_vec();
    bindings.extend(record.values().cloned());
    bindings.extend(query.bindings.get(BindingKind::Where).iter().cloned());
    bindings
}

// ==================== DELETE ====================

/// `delete from t [where ...]`
pub fn compile_delete<G: Grammar + ?Sized>(g: &G, query: &Builder) -> QbResult<String> {
    let table = target_table(g, query)?;
    Ok(concatenate([
        format!("delete from {table}"),
        compile_wheres(g, query),
    ]))
}

pub fn delete_bindings(query: &Builder) -> Vec<Value> {
    query.bindings.get(BindingKind::Where).to_vec()
}

// ==================== Join folding ====================

/// Comma-separated joined tables, for `update ... from` / `delete ... using`.
pub fn compile_join_tables<G: Grammar + ?Sized>(g: &G, joins: &[JoinClause]) -> String {
    joins
        .iter()
        .map(|join| wrap_table(g, &join.table))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A WHERE clause holding every join's predicates followed by the query's own.
///
/// With more than one group, each group is parenthesized and the groups are
/// joined with `and`, so an `or` never escapes its own group.
pub fn compile_wheres_with_joins<G: Grammar + ?Sized>(g: &G, query: &Builder) -> String {
    let groups: Vec<String> = query
        .joins
        .iter()
        .map(|join| &join.query().wheres)
        .chain(std::iter::once(&query.wheres))
        .filter(|wheres| !wheres.is_empty())
        .map(|wheres| compile_predicates(g, wheres))
        .collect();
    match groups.as_slice() {
        [] => String::new(),
        [only] => format!("where {only}"),
        _ => format!(
            "where {}",
            groups
                .iter()
                .map(|group| format!("({group})"))
                .collect::<Vec<_>>()
                .join(" and ")
        ),
    }
}
