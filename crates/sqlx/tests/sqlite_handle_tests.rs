use dbstudio_core::{
    ActionGateway, ActionRequest, ActionResponse, DatabaseHandle, Dialect, Error, Param,
    RawGateway,
};
use dbstudio_sqlx::{ConnectionConfig, SqlxHandle};
use serde_json::json;
use std::sync::Arc;

async fn memory() -> Arc<SqlxHandle> {
    Arc::new(SqlxHandle::sqlite_in_memory().await.unwrap())
}

#[tokio::test]
async fn in_memory_database_persists_across_statements() {
    let handle = memory().await;
    assert_eq!(handle.dialect(), Dialect::Sqlite);

    let outcome = handle
        .prepare("CREATE TABLE t(a INT)")
        .run(&[])
        .await
        .unwrap();
    assert!(outcome.success);

    let rows = handle.prepare("SELECT * FROM t").all(&[]).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn rows_decode_by_storage_class_in_column_order() {
    let handle = memory().await;
    handle
        .execute("CREATE TABLE t(id INTEGER, score REAL, label TEXT, data BLOB, note)", &[])
        .await
        .unwrap();
    let inserted = handle
        .execute(
            "INSERT INTO t VALUES (?, ?, ?, X'68690A', ?)",
            &[
                Param::Int(1),
                Param::Float(2.5),
                Param::Text("one".into()),
                Param::Null,
            ],
        )
        .await
        .unwrap();
    assert_eq!(inserted.rows_affected, 1);

    let rows = handle.fetch_all("SELECT * FROM t", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["id", "score", "label", "data", "note"]);
    assert_eq!(
        serde_json::Value::Object(rows[0].clone()),
        json!({"id": 1, "score": 2.5, "label": "one", "data": "aGkK", "note": null})
    );
}

#[tokio::test]
async fn positional_params_bind_in_order() {
    let handle = memory().await;
    let rows = handle
        .fetch_all(
            "SELECT ? AS a, ? AS b, ? AS c",
            &[Param::Int(5), Param::Bool(true), Param::Text("x".into())],
        )
        .await
        .unwrap();
    assert_eq!(
        serde_json::Value::Object(rows[0].clone()),
        json!({"a": 5, "b": 1, "c": "x"})
    );
}

#[tokio::test]
async fn backend_errors_keep_their_message() {
    let handle = memory().await;
    let err = handle
        .fetch_all("SELECT * FROM missing", &[])
        .await
        .unwrap_err();
    assert!(err.message.contains("no such table"), "{}", err.message);

    let raw = RawGateway::new(handle);
    let err = raw.execute_write(Some("NOT SQL"), &[]).await.unwrap_err();
    assert!(matches!(err, Error::Backend(_)));
}

#[tokio::test]
async fn introspection_against_sqlite() {
    let handle = memory().await;
    let actions = ActionGateway::new(Arc::clone(&handle));

    let res = actions
        .dispatch(ActionRequest {
            action: Some("getTables".into()),
            table: None,
        })
        .await
        .unwrap();
    assert_eq!(res, ActionResponse::Tables { tables: vec![] });

    handle
        .execute("CREATE TABLE t(a INTEGER, b TEXT NOT NULL, c)", &[])
        .await
        .unwrap();

    assert_eq!(actions.get_tables().await.unwrap(), vec!["t".to_string()]);

    let cols = actions.get_table_info("t").await.unwrap();
    let summary: Vec<(&str, &str, bool)> = cols
        .iter()
        .map(|c| (c.name.as_str(), c.data_type.as_str(), c.nullable))
        .collect();
    assert_eq!(
        summary,
        vec![("a", "INTEGER", true), ("b", "TEXT", false), ("c", "TEXT", true)]
    );
}

#[tokio::test]
async fn quoted_table_names_are_described() {
    let handle = memory().await;
    handle
        .execute(r#"CREATE TABLE "it's" (x INT NOT NULL)"#, &[])
        .await
        .unwrap();
    let actions = ActionGateway::new(handle);
    let cols = actions.get_table_info("it's").await.unwrap();
    assert_eq!(cols.len(), 1);
    assert!(!cols[0].nullable);
}

#[tokio::test]
async fn file_database_is_created() {
    let path = std::env::temp_dir().join(format!("dbstudio-test-{}.sqlite", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let handle = SqlxHandle::connect(&ConnectionConfig::Sqlite {
        path: Some(path.clone()),
    })
    .await
    .unwrap();
    handle.execute("CREATE TABLE t(a INT)", &[]).await.unwrap();
    handle.close().await;
    assert!(path.exists());
    let _ = std::fs::remove_file(&path);
}
