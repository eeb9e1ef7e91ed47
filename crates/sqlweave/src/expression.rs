//! Raw SQL fragments.

use std::fmt;

/// A raw SQL fragment that is emitted verbatim.
///
/// Expressions are never quoted and never parameterized, so they can carry
/// function calls (`NOW()`), arithmetic (`votes + 1`) or any other SQL the
/// builder has no structured form for.
///
/// Only build expressions from trusted input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression(String);

impl Expression {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// The wrapped SQL text.
    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Shorthand for [`Expression::new`].
pub fn raw(sql: impl Into<String>) -> Expression {
    Expression::new(sql)
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Expression {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_fragment() {
        assert_eq!(raw("NOW()"), Expression::new(String::from("NOW()")));
        assert_ne!(raw("NOW()"), raw("now()"));
        assert_eq!(raw("count(*)").to_string(), "count(*)");
    }
}
