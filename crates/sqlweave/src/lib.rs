//! # sqlweave
//!
//! A dialect-aware SQL query builder and compiler.
//!
//! ## Features
//!
//! - **Fluent builder**: columns, joins, nested predicates, grouping, ordering, unions and locks
//! - **Dialect grammars**: one builder compiles to ANSI, MySQL or PostgreSQL SQL
//! - **Parameterized output**: values are always bound, in placeholder order
//! - **Pluggable execution**: run builders through any [`Executor`]
//! - **Query log**: opt-in, per-connection record of executed statements
//!
//! ## Building queries
//!
//! ```ignore
//! use sqlweave::prelude::*;
//!
//! let grammar = Dialect::MySql.grammar("");
//!
//! // SELECT
//! let built = Builder::new(grammar.clone())
//!     .table("users")
//!     .where_("votes", ">", 100)
//!     .where_group(|q| q.where_eq("name", "Abigail").or_where("votes", ">", 50))
//!     .build_select()?;
//! // select * from `users` where `votes` > %s and (`name` = %s or `votes` > %s)
//!
//! // UPDATE
//! let record = Record::new().set("votes", 1).set("updated_at", raw("NOW()"));
//! let built = Builder::new(grammar)
//!     .table("users")
//!     .where_eq("id", 1)
//!     .build_update(&record)?;
//! ```
//!
//! ## Running queries
//!
//! ```ignore
//! let conn = Connection::new(PgExecutor::new(client), ConnectionConfig::new(Dialect::Postgres));
//!
//! let users = conn.table("users").where_eq("active", true).get(&conn).await?;
//! let total = conn.table("orders").sum("amount", &conn).await?;
//! let id = conn
//!     .table("users")
//!     .insert_get_id(&Record::new().set("email", "a@example.com"), None, &conn)
//!     .await?;
//! ```

pub mod connection;
pub mod error;
pub mod executor;
pub mod expression;
pub mod grammar;
pub mod ident;
pub mod prelude;
pub mod query;
pub mod row;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use connection::{Connection, ConnectionConfig, QueryLogEntry, QueryType};
pub use error::{QbError, QbResult};
pub use executor::Executor;
pub use expression::{Expression, raw};
pub use grammar::{AnsiGrammar, Dialect, Grammar, MySqlGrammar, PostgresGrammar};
pub use ident::Ident;
pub use query::{BindingKind, Builder, BuiltQuery, Connector, JoinClause, JoinKind, Lock};
pub use row::Row;
pub use value::{Operand, Record, Value};

#[cfg(feature = "postgres")]
pub use postgres::PgExecutor;
