use super::{Dialect, Grammar};

/// Dialect-neutral grammar: double-quoted identifiers and `?` placeholders.
#[derive(Debug, Clone, Default)]
pub struct AnsiGrammar {
    table_prefix: String,
}

impl AnsiGrammar {
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
        }
    }
}

impl Grammar for AnsiGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::Ansi
    }

    fn table_prefix(&self) -> &str {
        &self.table_prefix
    }
}
