//! Convenient imports for typical `sqlweave` usage.
//!
//! ```ignore
//! use sqlweave::prelude::*;
//! ```

pub use crate::{
    Builder, BuiltQuery, Connection, ConnectionConfig, Dialect, Executor, Expression, Grammar,
    Ident, Operand, QbError, QbResult, Record, Row, Value, raw,
};

#[cfg(feature = "postgres")]
pub use crate::PgExecutor;
