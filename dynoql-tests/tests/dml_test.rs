/// Item statement integration tests
///
/// Exercises INSERT/SELECT/UPDATE/DELETE through a connection backed by the
/// scripted mock store.

use dynoql_api::{ExecStatus, Value};
use dynoql_core::{AttributeValue, Error, StoreError};
use dynoql_test_utils::{item, MockStore};

#[tokio::test]
async fn test_insert_reports_one_row() -> anyhow::Result<()> {
    let store = MockStore::new();
    let conn = store.connection();

    let res = conn
        .execute(
            r#"INSERT INTO "users" VALUE {'id': ?, 'name': ?}"#,
            &[Value::from("u1"), Value::from("Alice")],
        )
        .await?;

    assert_eq!(res.status(), ExecStatus::Done);
    assert_eq!(res.rows_affected()?, 1);

    let calls = store.statement_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].statement, r#"INSERT INTO "users" VALUE {'id': ?, 'name': ?}"#);
    assert_eq!(
        calls[0].parameters,
        vec![AttributeValue::string("u1"), AttributeValue::string("Alice")]
    );
    Ok(())
}

#[tokio::test]
async fn test_update_adds_returning_and_counts_items() -> anyhow::Result<()> {
    let store = MockStore::new();
    store.push_page(vec![item(&[("id", AttributeValue::string("u1"))])], None);
    let conn = store.connection();

    let res = conn
        .execute(r#"UPDATE "users" SET age=? WHERE id=?"#, &[Value::from(30), Value::from("u1")])
        .await?;
    assert_eq!(res.rows_affected()?, 1);

    let calls = store.statement_calls();
    assert_eq!(calls[0].statement, r#"UPDATE "users" SET age=? WHERE id=? RETURNING ALL OLD *"#);
    assert_eq!(
        calls[0].parameters,
        vec![AttributeValue::number(30), AttributeValue::string("u1")]
    );
    Ok(())
}

#[tokio::test]
async fn test_explicit_returning_kept() -> anyhow::Result<()> {
    let store = MockStore::new();
    let conn = store.connection();

    conn.execute(r#"DELETE FROM "users" WHERE id=1 RETURNING ALL OLD *"#, &[])
        .await?;
    assert_eq!(
        store.statement_calls()[0].statement,
        r#"DELETE FROM "users" WHERE id=1 RETURNING ALL OLD *"#
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_condition_is_zero_rows() -> anyhow::Result<()> {
    let store = MockStore::new();
    for _ in 0..3 {
        store.push_statement_error(StoreError::ConditionalCheckFailed(
            "The conditional request failed".to_string(),
        ));
    }
    let conn = store.connection();

    let res = conn
        .execute(r#"DELETE FROM "users" WHERE id='missing'"#, &[])
        .await?;
    assert_eq!(res.rows_affected()?, 0);

    let mut rows = conn
        .query(r#"UPDATE "users" SET a=1 WHERE id='missing'"#, &[])
        .await?;
    assert_eq!(rows.remaining()?, 0);
    assert!(rows.next_row()?.is_none());

    let mut rows = conn
        .query(r#"DELETE FROM "users" WHERE id='missing'"#, &[])
        .await?;
    assert_eq!(rows.remaining()?, 0);
    assert_eq!(store.statement_calls().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_delete_matching_nothing() -> anyhow::Result<()> {
    let store = MockStore::new();
    let conn = store.connection();

    let res = conn.execute(r#"DELETE FROM "users" WHERE id=?"#, &[Value::from("none")]).await?;
    assert_eq!(res.rows_affected()?, 0);

    let mut rows = conn.query(r#"DELETE FROM "users" WHERE id=?"#, &[Value::from("none")]).await?;
    assert_eq!(rows.remaining()?, 0);
    Ok(())
}

#[tokio::test]
async fn test_insert_condition_failure_surfaces() {
    let store = MockStore::new();
    store.push_statement_error(StoreError::ConditionalCheckFailed("duplicate".to_string()));
    let conn = store.connection();

    let err = conn
        .execute(r#"INSERT INTO "users" VALUE {'id': 'u1'}"#, &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_error(),
        Some(StoreError::ConditionalCheckFailed(_))
    ));
}

#[tokio::test]
async fn test_update_query_returns_old_items() -> anyhow::Result<()> {
    let store = MockStore::new();
    store.push_page(
        vec![item(&[
            ("id", AttributeValue::string("u1")),
            ("age", AttributeValue::number(29)),
        ])],
        None,
    );
    let conn = store.connection();

    let mut rows = conn
        .query(r#"UPDATE "users" SET age=30 WHERE id='u1'"#, &[])
        .await?;
    assert_eq!(rows.column_names()?, vec!["age", "id"]);
    let row = rows.next_row()?.unwrap();
    assert_eq!(row, vec![Some(Value::Int(29)), Some(Value::from("u1"))]);
    assert!(rows.next_row()?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_select_columns_are_union_of_items() -> anyhow::Result<()> {
    let store = MockStore::new();
    store.push_page(
        vec![
            item(&[
                ("id", AttributeValue::string("a")),
                ("score", AttributeValue::number(5)),
            ]),
            item(&[
                ("id", AttributeValue::string("b")),
                ("active", AttributeValue::Bool(true)),
            ]),
        ],
        None,
    );
    let conn = store.connection();

    let mut rows = conn.query(r#"SELECT * FROM "users""#, &[]).await?;
    let columns = rows.columns()?.to_vec();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["active", "id", "score"]);
    assert_eq!(columns[0].type_name, "BOOL");
    assert_eq!(columns[2].type_name, "N");

    let first = rows.next_row()?.unwrap();
    assert_eq!(first, vec![None, Some(Value::from("a")), Some(Value::Int(5))]);
    let second = rows.next_row()?.unwrap();
    assert_eq!(second, vec![Some(Value::Bool(true)), Some(Value::from("b")), None]);
    Ok(())
}

#[tokio::test]
async fn test_select_with_consistent_read() -> anyhow::Result<()> {
    let store = MockStore::new();
    let conn = store.connection();

    conn.query(r#"SELECT * FROM "users" WHERE id=? WITH consistent_read=true"#, &[Value::from("u1")])
        .await?;

    let calls = store.statement_calls();
    assert_eq!(calls[0].statement, r#"SELECT * FROM "users" WHERE id=?"#);
    assert_eq!(calls[0].consistent_read, Some(true));
    Ok(())
}

#[tokio::test]
async fn test_mode_mismatch() {
    let store = MockStore::new();
    let conn = store.connection();

    let err = conn
        .query(r#"INSERT INTO "users" VALUE {'id': 'u1'}"#, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported(ref m) if m.contains("please use Exec")));

    let err = conn.execute(r#"SELECT * FROM "users""#, &[]).await.unwrap_err();
    assert!(matches!(err, Error::Unsupported(ref m) if m.contains("please use Query")));

    // Neither request reached the store
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_parameter_count_checked() {
    let store = MockStore::new();
    let conn = store.connection();

    let stmt = conn
        .prepare(r#"SELECT * FROM "users" WHERE id=? AND age>?"#)
        .unwrap();
    assert_eq!(stmt.num_input(), 2);

    let err = stmt.query(&[Value::from("u1")]).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_prepared_statement_reused() -> anyhow::Result<()> {
    let store = MockStore::new();
    let conn = store.connection();

    let stmt = conn.prepare(r#"INSERT INTO "users" VALUE {'id': ?}"#)?;
    for id in ["a", "b", "c"] {
        assert_eq!(stmt.execute(&[Value::from(id)]).await?.rows_affected()?, 1);
    }

    let ids: Vec<AttributeValue> = store
        .statement_calls()
        .into_iter()
        .flat_map(|c| c.parameters)
        .collect();
    assert_eq!(
        ids,
        vec![
            AttributeValue::string("a"),
            AttributeValue::string("b"),
            AttributeValue::string("c"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_marshal_failure_names_position() {
    let store = MockStore::new();
    let conn = store.connection();

    let mixed = Value::Set(vec![Value::from("a"), Value::from(1)]);
    let err = conn
        .execute(r#"INSERT INTO "t" VALUE {'id': ?, 'tags': ?}"#, &[Value::from("x"), mixed])
        .await
        .unwrap_err();
    match err {
        Error::Marshal { position, .. } => assert_eq!(position, 2),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_store_error_passes_through() {
    let store = MockStore::new();
    store.push_statement_error(StoreError::Throttled("slow down".to_string()));
    let conn = store.connection();

    let err = conn.query(r#"SELECT * FROM "t""#, &[]).await.unwrap_err();
    assert_eq!(err.code(), "STORE_ERROR");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unrecognized_statement() {
    let store = MockStore::new();
    let conn = store.connection();

    let err = conn.execute("MERGE INTO t", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Syntax(_)));
}
