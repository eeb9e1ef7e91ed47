//! WHERE / HAVING / ON predicate nodes.

use super::Builder;
use crate::ident::Ident;
use crate::value::Operand;
use std::fmt;

/// Boolean connector joining a predicate to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filter node.
///
/// Every variant carries its connector; the connector of the first node in a
/// list is dropped when the list is rendered.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `column <op> value`
    Basic {
        column: Ident,
        operator: String,
        value: Operand,
        connector: Connector,
    },
    /// `column [not] in (values...)`
    In {
        column: Ident,
        values: Vec<Operand>,
        negated: bool,
        connector: Connector,
    },
    /// `column [not] in (subquery)`
    InSub {
        column: Ident,
        query: Box<Builder>,
        negated: bool,
        connector: Connector,
    },
    /// `column is [not] null`
    Null {
        column: Ident,
        negated: bool,
        connector: Connector,
    },
    /// `column [not] between ? and ?`; both values live in the bindings.
    Between {
        column: Ident,
        negated: bool,
        connector: Connector,
    },
    /// `first <op> second`, both sides identifiers.
    Column {
        first: Ident,
        operator: String,
        second: Ident,
        connector: Connector,
    },
    /// Parenthesized group holding the nested builder's predicates.
    Nested {
        query: Box<Builder>,
        connector: Connector,
    },
    /// `column <op> (subquery)`
    Sub {
        column: Ident,
        operator: String,
        query: Box<Builder>,
        connector: Connector,
    },
    /// `[not] exists (subquery)`
    Exists {
        query: Box<Builder>,
        negated: bool,
        connector: Connector,
    },
    /// Raw SQL.
    Raw { sql: String, connector: Connector },
}

impl Predicate {
    pub fn connector(&self) -> Connector {
        match self {
            Self::Basic { connector, .. }
            | Self::In { connector, .. }
            | Self::InSub { connector, .. }
            | Self::Null { connector, .. }
            | Self::Between { connector, .. }
            | Self::Column { connector, .. }
            | Self::Nested { connector, .. }
            | Self::Sub { connector, .. }
            | Self::Exists { connector, .. }
            | Self::Raw { connector, .. } => *connector,
        }
    }
}
