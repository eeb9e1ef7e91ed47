//! Running builders through an [`Executor`].

use super::Builder;
use crate::error::{QbError, QbResult};
use crate::executor::Executor;
use crate::ident::{Ident, idents};
use crate::row::Row;
use crate::value::{Record, Value};

impl Builder {
    // ==================== Reads ====================

    /// Run the SELECT and return every row.
    pub async fn get(&self, conn: &impl Executor) -> QbResult<Vec<Row>> {
        let built = self.build_select()?;
        conn.fetch(&built.sql, &built.bindings).await
    }

    /// Run the SELECT with `limit 1` and return the first row, if any.
    pub async fn first(&self, conn: &impl Executor) -> QbResult<Option<Row>> {
        let rows = self.clone().take(1).get(conn).await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch the row whose `id` equals `id`.
    pub async fn find(&self, id: impl Into<Value>, conn: &impl Executor) -> QbResult<Option<Row>> {
        let id: Value = id.into();
        self.clone().where_eq("id", id).first(conn).await
    }

    /// Whether the query matches any row.
    pub async fn exists(&self, conn: &impl Executor) -> QbResult<bool> {
        let built = self.build_exists()?;
        let rows = conn.fetch(&built.sql, &built.bindings).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("exists").or_else(|| row.get_index(0)))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    // ==================== Aggregates ====================

    /// Run `function(columns)` over the query and return the `aggregate` column
    /// of the first row (`Null` when no row comes back).
    pub async fn aggregate<I, C>(
        &self,
        function: &str,
        columns: I,
        conn: &impl Executor,
    ) -> QbResult<Value>
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        let view = self.aggregate_view(function, idents(columns));
        let rows = view.get(conn).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.take("aggregate"))
            .unwrap_or(Value::Null))
    }

    pub async fn count(&self, conn: &impl Executor) -> QbResult<Value> {
        self.aggregate("count", ["*"], conn).await
    }

    pub async fn count_columns<I, C>(&self, columns: I, conn: &impl Executor) -> QbResult<Value>
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        self.aggregate("count", columns, conn).await
    }

    pub async fn min(&self, column: impl Into<Ident>, conn: &impl Executor) -> QbResult<Value> {
        let column: Ident = column.into();
        self.aggregate("min", [column], conn).await
    }

    pub async fn max(&self, column: impl Into<Ident>, conn: &impl Executor) -> QbResult<Value> {
        let column: Ident = column.into();
        self.aggregate("max", [column], conn).await
    }

    /// Like the other aggregates, but an empty or NULL sum is `0`.
    pub async fn sum(&self, column: impl Into<Ident>, conn: &impl Executor) -> QbResult<Value> {
        let column: Ident = column.into();
        let value = self.aggregate("sum", [column], conn).await?;
        Ok(if value.is_null() { Value::Int(0) } else { value })
    }

    pub async fn avg(&self, column: impl Into<Ident>, conn: &impl Executor) -> QbResult<Value> {
        let column: Ident = column.into();
        self.aggregate("avg", [column], conn).await
    }

    // ==================== Writes ====================

    /// Insert rows and return the affected row count. No rows is a no-op.
    pub async fn insert(&self, rows: &[Record], conn: &impl Executor) -> QbResult<u64> {
        if rows.is_empty() {
            self.validate()?;
            return Ok(0);
        }
        let built = self.build_insert(rows)?;
        conn.execute(&built.sql, &built.bindings).await
    }

    /// Insert a row and return its generated key.
    ///
    /// Dialects with `RETURNING` read the key column (`sequence`, or `id`)
    /// from the statement; others ask the executor for the last insert id.
    pub async fn insert_get_id(
        &self,
        record: &Record,
        sequence: Option<&str>,
        conn: &impl Executor,
    ) -> QbResult<Value> {
        let built = self.build_insert_get_id(record, sequence)?;
        if !self.grammar.supports_returning() {
            conn.execute(&built.sql, &built.bindings).await?;
            return conn.last_insert_id().await;
        }

        let column = sequence.unwrap_or("id");
        let rows = conn.fetch(&built.sql, &built.bindings).await?;
        let mut row = rows.into_iter().next().ok_or_else(|| {
            QbError::query_failed(built.sql.clone(), built.bindings.clone(), "insert returned no row")
        })?;
        row.take(column)
            .ok_or_else(|| QbError::decode(column, "column not found in returned row"))
    }

    pub async fn insert_or_ignore(&self, rows: &[Record], conn: &impl Executor) -> QbResult<u64> {
        if rows.is_empty() {
            self.validate()?;
            return Ok(0);
        }
        let built = self.build_insert_or_ignore(rows)?;
        conn.execute(&built.sql, &built.bindings).await
    }

    /// Update the matched rows and return the affected row count.
    pub async fn update(&self, record: &Record, conn: &impl Executor) -> QbResult<u64> {
        let built = self.build_update(record)?;
        conn.execute(&built.sql, &built.bindings).await
    }

    /// Delete the matched rows and return the affected row count.
    pub async fn delete(&self, conn: &impl Executor) -> QbResult<u64> {
        let built = self.build_delete()?;
        conn.execute(&built.sql, &built.bindings).await
    }

    pub async fn truncate(&self, conn: &impl Executor) -> QbResult<u64> {
        let built = self.build_truncate()?;
        conn.execute(&built.sql, &built.bindings).await
    }
}
