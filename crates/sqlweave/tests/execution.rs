//! Execution through a recording executor: aggregates, writes, logging and transactions.

use sqlweave::prelude::*;
use sqlweave::QueryType;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Records every call and replays canned results.
#[derive(Default)]
struct MockExecutor {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    rows: Mutex<VecDeque<Vec<Row>>>,
    fail_with: Mutex<Option<QbError>>,
    last_id: Mutex<Option<Value>>,
}

impl MockExecutor {
    fn with_rows(rows: Vec<Vec<Row>>) -> Self {
        let mock = Self::default();
        *mock.rows.lock().unwrap() = rows.into();
        mock
    }

    fn failing(err: QbError) -> Self {
        let mock = Self::default();
        *mock.fail_with.lock().unwrap() = Some(err);
        mock
    }

    fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    fn statements(&self) -> Vec<String> {
        self.calls().into_iter().map(|(sql, _)| sql).collect()
    }

    fn record(&self, sql: &str, bindings: &[Value]) -> QbResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), bindings.to_vec()));
        match self.fail_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Executor for MockExecutor {
    async fn execute(&self, sql: &str, bindings: &[Value]) -> QbResult<u64> {
        self.record(sql, bindings)?;
        Ok(1)
    }

    async fn fetch(&self, sql: &str, bindings: &[Value]) -> QbResult<Vec<Row>> {
        self.record(sql, bindings)?;
        Ok(self.rows.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn last_insert_id(&self) -> QbResult<Value> {
        Ok(self.last_id.lock().unwrap().clone().unwrap_or(Value::Null))
    }

    async fn begin_transaction(&self) -> QbResult<()> {
        self.record("begin", &[])
    }

    async fn commit(&self) -> QbResult<()> {
        self.record("commit", &[])
    }

    async fn rollback(&self) -> QbResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(("rollback".to_string(), Vec::new()));
        Ok(())
    }
}

fn connect(dialect: Dialect, mock: MockExecutor) -> Connection<MockExecutor> {
    Connection::new(mock, ConnectionConfig::new(dialect))
}

fn aggregate_row(value: impl Into<Value>) -> Vec<Row> {
    vec![Row::new().with("aggregate", value)]
}

// ==================== Reads ====================

#[tokio::test]
async fn get_sends_compiled_select() {
    let mock = MockExecutor::with_rows(vec![vec![
        Row::new().with("id", 1).with("name", "a"),
        Row::new().with("id", 2).with("name", "b"),
    ]]);
    let conn = connect(Dialect::Postgres, mock);

    let rows = conn
        .table("users")
        .where_("votes", ">", 10)
        .get(&conn)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get("name"), Some(&Value::Text("b".into())));
    assert_eq!(
        conn.executor().calls(),
        vec![(
            r#"select * from "users" where "votes" > %s"#.to_string(),
            vec![Value::Int(10)]
        )]
    );
}

#[tokio::test]
async fn first_and_find_limit_to_one_row() {
    let mock = MockExecutor::with_rows(vec![vec![Row::new().with("id", 5)], Vec::new()]);
    let conn = connect(Dialect::Ansi, mock);

    let first = conn.table("users").first(&conn).await.unwrap();
    assert_eq!(first.and_then(|r| r.get("id").cloned()), Some(Value::Int(5)));

    let missing = conn.table("users").find(9, &conn).await.unwrap();
    assert!(missing.is_none());

    assert_eq!(
        conn.executor().statements(),
        [
            r#"select * from "users" limit 1"#,
            r#"select * from "users" where "id" = ? limit 1"#,
        ]
    );
}

#[tokio::test]
async fn exists_reads_the_flag() {
    let mock = MockExecutor::with_rows(vec![vec![Row::new().with("exists", true)], Vec::new()]);
    let conn = connect(Dialect::Ansi, mock);

    assert!(conn.table("users").where_eq("id", 1).exists(&conn).await.unwrap());
    assert!(!conn.table("users").exists(&conn).await.unwrap());
}

// ==================== Aggregates ====================

#[tokio::test]
async fn count_compiles_aggregate_and_reads_value() {
    let conn = connect(Dialect::Ansi, MockExecutor::with_rows(vec![aggregate_row(42)]));

    let count = conn
        .table("users")
        .select(["id", "name"])
        .where_eq("active", true)
        .count(&conn)
        .await
        .unwrap();

    assert_eq!(count, Value::Int(42));
    assert_eq!(
        conn.executor().calls(),
        vec![(
            r#"select count(*) as aggregate from "users" where "active" = ?"#.to_string(),
            vec![Value::Bool(true)]
        )]
    );
}

#[tokio::test]
async fn sum_over_no_rows_is_zero() {
    let conn = connect(Dialect::Ansi, MockExecutor::with_rows(vec![aggregate_row(Value::Null)]));
    let sum = conn.table("orders").sum("amount", &conn).await.unwrap();
    assert_eq!(sum, Value::Int(0));
    assert_eq!(
        conn.executor().statements(),
        [r#"select sum("amount") as aggregate from "orders""#]
    );
}

#[tokio::test]
async fn max_over_no_rows_is_null() {
    let conn = connect(Dialect::Ansi, MockExecutor::default());
    let max = conn.table("orders").max("amount", &conn).await.unwrap();
    assert!(max.is_null());
}

#[tokio::test]
async fn aggregates_leave_the_builder_untouched() {
    let conn = connect(
        Dialect::MySql,
        MockExecutor::with_rows(vec![aggregate_row(1.5), Vec::new()]),
    );
    let query = conn
        .table("orders")
        .select_raw("amount * %s as total", [2])
        .where_eq("paid", true);

    let avg = query.avg("amount", &conn).await.unwrap();
    assert_eq!(avg, Value::Float(1.5));
    query.get(&conn).await.unwrap();

    let calls = conn.executor().calls();
    assert_eq!(
        calls[0],
        (
            "select avg(`amount`) as aggregate from `orders` where `paid` = %s".to_string(),
            vec![Value::Bool(true)]
        )
    );
    assert_eq!(
        calls[1],
        (
            "select amount * %s as total from `orders` where `paid` = %s".to_string(),
            vec![Value::Int(2), Value::Bool(true)]
        )
    );
}

// ==================== Writes ====================

#[tokio::test]
async fn insert_without_rows_is_a_no_op() {
    let conn = connect(Dialect::Ansi, MockExecutor::default());
    let affected = conn.table("users").insert(&[], &conn).await.unwrap();
    assert_eq!(affected, 0);
    assert!(conn.executor().calls().is_empty());
}

#[tokio::test]
async fn insert_get_id_reads_returning_column() {
    let mock = MockExecutor::with_rows(vec![vec![Row::new().with("id", 17)]]);
    let conn = connect(Dialect::Postgres, mock);

    let id = conn
        .table("users")
        .insert_get_id(&Record::new().set("email", "a@example.com"), None, &conn)
        .await
        .unwrap();

    assert_eq!(id, Value::Int(17));
    assert_eq!(
        conn.executor().statements(),
        [r#"insert into "users" ("email") values (%s) returning "id""#]
    );
}

#[tokio::test]
async fn insert_get_id_asks_executor_without_returning() {
    let mock = MockExecutor::default();
    *mock.last_id.lock().unwrap() = Some(Value::Int(99));
    let conn = connect(Dialect::MySql, mock);

    let id = conn
        .table("users")
        .insert_get_id(&Record::new().set("email", "a@example.com"), None, &conn)
        .await
        .unwrap();

    assert_eq!(id, Value::Int(99));
    assert_eq!(
        conn.executor().statements(),
        ["insert into `users` (`email`) values (%s)"]
    );
}

#[tokio::test]
async fn update_and_delete_send_dialect_bindings() {
    let conn = connect(Dialect::Postgres, MockExecutor::default());
    let record = Record::new().set("votes", 0);

    conn.table("users")
        .where_eq("id", 3)
        .update(&record, &conn)
        .await
        .unwrap();
    conn.table("users")
        .where_in("id", [4, 5])
        .delete(&conn)
        .await
        .unwrap();
    conn.table("users").truncate(&conn).await.unwrap();

    assert_eq!(
        conn.executor().calls(),
        vec![
            (
                r#"update "users" set "votes" = %s where "id" = %s"#.to_string(),
                vec![Value::Int(0), Value::Int(3)]
            ),
            (
                r#"delete from "users" where "id" in (%s, %s)"#.to_string(),
                vec![Value::Int(4), Value::Int(5)]
            ),
            (r#"truncate "users" restart identity"#.to_string(), Vec::new()),
        ]
    );
}

#[tokio::test]
async fn build_errors_never_reach_the_executor() {
    let conn = connect(Dialect::Ansi, MockExecutor::default());
    let err = conn
        .table("users")
        .where_("votes", ">", Value::Null)
        .get(&conn)
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let err = conn
        .table("users")
        .insert_or_ignore(&[Record::new().set("a", 1)], &conn)
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
    assert!(conn.executor().calls().is_empty());
}

// ==================== Errors and logging ====================

#[tokio::test]
async fn driver_errors_carry_the_statement() {
    let conn = connect(
        Dialect::Ansi,
        MockExecutor::failing(QbError::Other("relation does not exist".into())),
    );
    let err = conn.table("missing").where_eq("id", 1).get(&conn).await.unwrap_err();
    match err {
        QbError::QueryFailed {
            sql,
            bindings,
            message,
        } => {
            assert_eq!(sql, r#"select * from "missing" where "id" = ?"#);
            assert_eq!(bindings, vec![Value::Int(1)]);
            assert_eq!(message, "relation does not exist");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn query_log_records_successful_statements_only() {
    let conn = connect(Dialect::Ansi, MockExecutor::default());
    conn.table("users").get(&conn).await.unwrap();
    assert!(conn.query_log().is_empty());

    conn.enable_query_log();
    assert!(conn.logging_queries());
    conn.table("users").where_eq("id", 1).get(&conn).await.unwrap();
    conn.table("users").where_eq("id", 1).delete(&conn).await.unwrap();

    let log = conn.query_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].sql, r#"select * from "users" where "id" = ?"#);
    assert_eq!(log[0].bindings, vec![Value::Int(1)]);
    assert_eq!(log[0].query_type, QueryType::Select);
    assert_eq!(log[1].query_type, QueryType::Delete);

    conn.flush_query_log();
    assert!(conn.query_log().is_empty());
    conn.disable_query_log();
    assert!(!conn.logging_queries());
}

#[tokio::test]
async fn failed_statements_are_not_logged() {
    let conn = Connection::new(
        MockExecutor::failing(QbError::Connection("closed".into())),
        ConnectionConfig::new(Dialect::Ansi).query_log(true),
    );
    assert!(conn.table("users").get(&conn).await.is_err());
    assert!(conn.query_log().is_empty());
}

// ==================== Transactions ====================

#[tokio::test]
async fn transaction_commits_on_success() {
    let conn = connect(Dialect::Ansi, MockExecutor::default());
    let affected = conn
        .transaction(async |tx| {
            tx.table("users")
                .where_eq("id", 1)
                .update(&Record::new().set("votes", 2), tx)
                .await
        })
        .await
        .unwrap();
    assert_eq!(affected, 1);
    assert_eq!(
        conn.executor().statements(),
        [
            "begin",
            r#"update "users" set "votes" = ? where "id" = ?"#,
            "commit"
        ]
    );
}

#[tokio::test]
async fn transaction_rolls_back_on_error() {
    let conn = connect(Dialect::Ansi, MockExecutor::default());
    let result: QbResult<u64> = conn
        .transaction(async |tx| {
            tx.table("users")
                .where_("votes", "<", Value::Null)
                .delete(tx)
                .await
        })
        .await;
    assert!(result.unwrap_err().is_invalid_argument());
    assert_eq!(conn.executor().statements(), ["begin", "rollback"]);
}

#[tokio::test]
async fn table_prefix_comes_from_config() {
    let conn = Connection::new(
        MockExecutor::default(),
        ConnectionConfig::new(Dialect::MySql).table_prefix("app_"),
    );
    conn.table("users").get(&conn).await.unwrap();
    assert_eq!(conn.executor().statements(), ["select * from `app_users`"]);
}
