//! [`Executor`] backed by `tokio-postgres`.
//!
//! Compiled SQL uses `%s` placeholders; they are renumbered to `$1, $2, ...`
//! before the statement is sent. [`Value`] implements [`ToSql`] by converting
//! itself to the parameter type the server inferred.

use crate::error::{QbError, QbResult};
use crate::executor::Executor;
use crate::row::Row;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::error::Error;
use tokio_postgres::Client;
use tokio_postgres::types::{IsNull, ToSql, Type};
use uuid::Uuid;

/// Runs statements on a single `tokio_postgres::Client` session.
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_inner(self) -> Client {
        self.client
    }
}

impl std::fmt::Debug for PgExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgExecutor").finish_non_exhaustive()
    }
}

/// Rewrite `%s` placeholders to `$n` and unescape `%%`.
///
/// Text inside single-quoted literals and double-quoted identifiers is left
/// untouched.
pub fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;
    let mut index = 0;
    while let Some(c) = chars.next() {
        if c == '\'' || c == '"' {
            match quote {
                None => quote = Some(c),
                Some(open) if open == c => quote = None,
                Some(_) => {}
            }
            out.push(c);
            continue;
        }
        if c != '%' || quote.is_some() {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }
    out
}

fn params(bindings: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    bindings.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Executor for PgExecutor {
    async fn execute(&self, sql: &str, bindings: &[Value]) -> QbResult<u64> {
        let sql = rewrite_placeholders(sql);
        Ok(self.client.execute(sql.as_str(), &params(bindings)).await?)
    }

    async fn fetch(&self, sql: &str, bindings: &[Value]) -> QbResult<Vec<Row>> {
        let sql = rewrite_placeholders(sql);
        let rows = self.client.query(sql.as_str(), &params(bindings)).await?;
        rows.iter().map(decode_row).collect()
    }

    /// The value most recently produced by a sequence in this session.
    async fn last_insert_id(&self) -> QbResult<Value> {
        let rows = self.fetch("select lastval() as id", &[]).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.take("id"))
            .unwrap_or(Value::Null))
    }

    async fn begin_transaction(&self) -> QbResult<()> {
        Ok(self.client.batch_execute("begin").await?)
    }

    async fn commit(&self) -> QbResult<()> {
        Ok(self.client.batch_execute("commit").await?)
    }

    async fn rollback(&self) -> QbResult<()> {
        Ok(self.client.batch_execute("rollback").await?)
    }
}

// ==================== Decoding ====================

fn decode_row(row: &tokio_postgres::Row) -> QbResult<Row> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_cell(row, index, column.type_())
            .map_err(|e| QbError::decode(column.name(), e.to_string()))?;
        out.push(column.name(), value);
    }
    Ok(out)
}

fn decode_cell(
    row: &tokio_postgres::Row,
    index: usize,
    ty: &Type,
) -> Result<Value, Box<dyn Error + Sync + Send>> {
    let value: Value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(index)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(index)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.into(),
        Type::OID => row.try_get::<_, Option<u32>>(index)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(index)?.into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(index)?.into()
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index)?.into(),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<serde_json::Value>>(index)?.into(),
        Type::UUID => row.try_get::<_, Option<Uuid>>(index)?.into(),
        Type::TIMESTAMP => row.try_get::<_, Option<NaiveDateTime>>(index)?.into(),
        Type::TIMESTAMPTZ => row.try_get::<_, Option<DateTime<Utc>>>(index)?.into(),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(index)?
            .map(|d| d.and_time(NaiveTime::MIN))
            .into(),
        _ => return Err(format!("unsupported column type {ty}").into()),
    };
    Ok(value)
}

// ==================== Encoding ====================

fn mismatch(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot bind {} value to parameter of type {ty}", value.type_name()).into()
}

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ if is_text(ty) => b.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Int(v) => match *ty {
                Type::INT8 => v.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::OID => u32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::BOOL => (*v != 0).to_sql(ty, out),
                _ if is_text(ty) => v.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT8 => v.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ if is_text(ty) => v.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Text(s) => match *ty {
                Type::UUID => Uuid::parse_str(s)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                }
                _ if is_text(ty) => s.as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Bytes(b) => match *ty {
                Type::BYTEA => b.as_slice().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Json(j) => match *ty {
                Type::JSON | Type::JSONB => j.to_sql(ty, out),
                _ if is_text(ty) => j.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Uuid(u) => match *ty {
                Type::UUID => u.to_sql(ty, out),
                _ if is_text(ty) => u.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Timestamp(t) => match *ty {
                Type::TIMESTAMP => t.to_sql(ty, out),
                Type::TIMESTAMPTZ => t.and_utc().to_sql(ty, out),
                Type::DATE => t.date().to_sql(ty, out),
                _ if is_text(ty) => t.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_placeholders_in_order() {
        assert_eq!(
            rewrite_placeholders(r#"select * from "t" where "a" = %s and "b" in (%s, %s)"#),
            r#"select * from "t" where "a" = $1 and "b" in ($2, $3)"#
        );
    }

    #[test]
    fn keeps_literals_and_unescapes_percent() {
        assert_eq!(
            rewrite_placeholders("select '%s' where a like %s || '%%' and b %% 2 = 0"),
            "select '%s' where a like $1 || '%%' and b % 2 = 0"
        );
    }

    #[test]
    fn keeps_quoted_identifiers() {
        assert_eq!(
            rewrite_placeholders(r#"select "a%s", 'it''s %s' from "t" where "b" = %s"#),
            r#"select "a%s", 'it''s %s' from "t" where "b" = $1"#
        );
    }

    #[test]
    fn int_binds_to_narrower_columns() {
        let mut out = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(&out[..], &7_i32.to_be_bytes());

        let mut out = BytesMut::new();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn null_binds_as_null() {
        let mut out = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::INT8, &mut out).unwrap(),
            IsNull::Yes
        ));
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let mut out = BytesMut::new();
        let Err(err) = Value::Bytes(vec![1]).to_sql(&Type::INT4, &mut out) else {
            panic!("bytes should not bind to int4");
        };
        assert!(err.to_string().contains("cannot bind bytes"));
    }
}
