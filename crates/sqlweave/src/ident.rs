//! Column and table specifiers.
//!
//! An [`Ident`] is either a plain name that the grammar quotes (and prefixes,
//! for tables), or a raw [`Expression`] that is emitted untouched.
//!
//! Names accept the usual shapes:
//! - `name`
//! - `table.column` / `schema.table.column`
//! - `column as alias` (case-insensitive `as`)
//! - `data->meta->kind` (JSON selector, rendered per dialect)
//! - `*` / `table.*`

use crate::expression::Expression;

/// A column or table specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ident {
    /// A name that will be quoted by the grammar.
    Name(String),
    /// A raw fragment that is emitted verbatim.
    Raw(Expression),
}

impl Ident {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Whether this is a raw expression.
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// Whether this is a name containing a JSON selector (`->`).
    pub fn is_json_selector(&self) -> bool {
        matches!(self, Self::Name(n) if n.contains("->"))
    }

    /// The unquoted text (the raw SQL for expressions).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name(n) => n,
            Self::Raw(e) => e.value(),
        }
    }
}

impl From<&str> for Ident {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for Ident {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<&String> for Ident {
    fn from(value: &String) -> Self {
        Self::Name(value.clone())
    }
}

impl From<Expression> for Ident {
    fn from(value: Expression) -> Self {
        Self::Raw(value)
    }
}

impl From<&Ident> for Ident {
    fn from(value: &Ident) -> Self {
        value.clone()
    }
}

/// Convert a list of column specifiers into idents.
pub(crate) fn idents<I, C>(columns: I) -> Vec<Ident>
where
    I: IntoIterator<Item = C>,
    C: Into<Ident>,
{
    columns.into_iter().map(Into::into).collect()
}
