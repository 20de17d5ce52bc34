use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use dbstudio_server::{ServerConfig, router};
use dbstudio_sqlx::SqlxHandle;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

async fn app_with(config: ServerConfig) -> Router {
    let handle = Arc::new(SqlxHandle::sqlite_in_memory().await.unwrap());
    router(handle, &config)
}

async fn app() -> Router {
    app_with(ServerConfig::default()).await
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec();
    Reply {
        status,
        headers,
        body,
    }
}

fn assert_cors(headers: &HeaderMap) {
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn preflight_short_circuits_on_any_path() {
    let app = app().await;
    for path in ["/raw", "/actions", "/whatever/deep"] {
        let res = send(&app, Method::OPTIONS, path, None).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert!(res.body.is_empty());
        assert_cors(&res.headers);
    }
}

#[tokio::test]
async fn unmatched_path_is_json_404() {
    let app = app().await;
    let res = send(&app, Method::GET, "/nope", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json(), json!({"error": "Not found"}));
    assert_cors(&res.headers);
}

#[tokio::test]
async fn write_then_read() {
    let app = app().await;
    let res = send(
        &app,
        Method::POST,
        "/raw",
        Some(json!({"sql": "CREATE TABLE t(a INT)"})),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"success": true}));
    assert_cors(&res.headers);

    let res = send(&app, Method::GET, "/raw?sql=SELECT%20*%20FROM%20t", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"rows": []}));
    assert_cors(&res.headers);
}

#[tokio::test]
async fn post_params_bind_positionally() {
    let app = app().await;
    send(
        &app,
        Method::POST,
        "/raw",
        Some(json!({"sql": "CREATE TABLE t(a INT, b TEXT)"})),
    )
    .await;
    let res = send(
        &app,
        Method::POST,
        "/raw",
        Some(json!({"sql": "INSERT INTO t VALUES (?, ?)", "params": [1, "x"]})),
    )
    .await;
    assert_eq!(res.json(), json!({"success": true}));
    let res = send(
        &app,
        Method::POST,
        "/raw/exec",
        Some(json!({"sql": "INSERT INTO t(a) VALUES (?)", "params": 2})),
    )
    .await;
    assert_eq!(res.json(), json!({"success": true}));

    let res = send(&app, Method::GET, "/raw?sql=SELECT%20a%2C%20b%20FROM%20t", None).await;
    assert_eq!(
        res.json(),
        json!({"rows": [{"a": 1, "b": "x"}, {"a": 2, "b": null}]})
    );
}

#[tokio::test]
async fn query_params_accept_scalar_or_sequence() {
    let app = app().await;

    let res = send(&app, Method::GET, "/raw?sql=SELECT%20%3F%20AS%20v&params=5", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"rows": [{"v": 5}]}));

    let res = send(
        &app,
        Method::GET,
        "/raw?sql=SELECT%20%3F%20AS%20a%2C%20%3F%20AS%20b&params=%5B5%2C6%5D",
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"rows": [{"a": 5, "b": 6}]}));

    let res = send(
        &app,
        Method::GET,
        "/raw?sql=SELECT%20%3F%20AS%20a%2C%20%3F%20AS%20b&params=5&params=six",
        None,
    )
    .await;
    assert_eq!(res.json(), json!({"rows": [{"a": 5, "b": "six"}]}));
}

#[tokio::test]
async fn missing_sql_is_400() {
    let app = app().await;
    let res = send(&app, Method::GET, "/raw", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json(), json!({"error": "SQL query is required"}));

    let res = send(&app, Method::POST, "/raw", Some(json!({"sql": ""}))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_cors(&res.headers);

    let res = send(&app, Method::POST, "/raw", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = app().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/actions")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn backend_failure_is_500_with_message() {
    let app = app().await;
    let res = send(
        &app,
        Method::GET,
        "/raw?sql=SELECT%20*%20FROM%20missing",
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json();
    assert!(body["error"].as_str().unwrap().contains("no such table"));
    assert_cors(&res.headers);
}

#[tokio::test]
async fn wrong_methods_are_405() {
    let app = app().await;
    let res = send(&app, Method::GET, "/actions", None).await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.json(), json!({"error": "Method not allowed"}));

    let res = send(&app, Method::PUT, "/raw", None).await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_cors(&res.headers);
}

#[tokio::test]
async fn trailing_slash_reaches_the_gateways() {
    let app = app().await;
    let res = send(&app, Method::GET, "/raw/?sql=SELECT%201%20AS%20one", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"rows": [{"one": 1}]}));

    let res = send(
        &app,
        Method::POST,
        "/actions/",
        Some(json!({"action": "getTables"})),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"tables": []}));

    let res = send(&app, Method::GET, "/actions/", None).await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn head_does_not_run_sql() {
    let app = app().await;
    let res = send(
        &app,
        Method::HEAD,
        "/raw?sql=CREATE%20TABLE%20h(a%20INT)",
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_cors(&res.headers);

    let res = send(
        &app,
        Method::POST,
        "/actions",
        Some(json!({"action": "getTables"})),
    )
    .await;
    assert_eq!(res.json(), json!({"tables": []}));
}

#[tokio::test]
async fn actions_list_and_describe() {
    let app = app().await;
    let res = send(
        &app,
        Method::POST,
        "/actions",
        Some(json!({"action": "getTables"})),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"tables": []}));

    send(
        &app,
        Method::POST,
        "/raw",
        Some(json!({"sql": "CREATE TABLE t(a INTEGER, b TEXT NOT NULL)"})),
    )
    .await;

    let res = send(
        &app,
        Method::POST,
        "/actions",
        Some(json!({"action": "getTables"})),
    )
    .await;
    assert_eq!(res.json(), json!({"tables": ["t"]}));

    let res = send(
        &app,
        Method::POST,
        "/actions",
        Some(json!({"action": "getTableInfo", "table": "t"})),
    )
    .await;
    assert_eq!(
        res.json(),
        json!({"columns": [
            {"name": "a", "type": "INTEGER", "nullable": true},
            {"name": "b", "type": "TEXT", "nullable": false},
        ]})
    );
}

#[tokio::test]
async fn action_validation_errors() {
    let app = app().await;
    let cases = [
        (json!({}), "Action is required"),
        (json!({"action": "getTableInfo"}), "Table name is required"),
        (json!({"action": "getTableInfo", "table": ""}), "Table name is required"),
        (json!({"action": "getTableInfo", "table": "ghost"}), "Unknown table: ghost"),
        (json!({"action": "bogus"}), "Unknown action: bogus"),
    ];
    for (body, message) in cases {
        let res = send(&app, Method::POST, "/actions", Some(body)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.json(), json!({"error": message}));
    }
}

fn ui_fixture() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dbstudio-ui-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("assets")).unwrap();
    std::fs::write(dir.join("index.html"), "<!doctype html><title>db</title>").unwrap();
    std::fs::write(dir.join("assets/app.js"), "console.log(1)").unwrap();
    dir
}

#[tokio::test]
async fn ui_files_are_served_when_enabled() {
    let dir = ui_fixture();
    let app = app_with(ServerConfig::default().set_ui_dir(&dir)).await;

    let res = send(&app, Method::GET, "/", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers["content-type"], "text/html; charset=utf-8");
    assert_eq!(res.body, b"<!doctype html><title>db</title>");
    assert_cors(&res.headers);

    let res = send(&app, Method::GET, "/assets/app.js", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers["content-type"], "text/javascript; charset=utf-8");

    let res = send(&app, Method::GET, "/assets/missing.js", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json(), json!({"error": "Not found"}));

    let res = send(&app, Method::POST, "/index.html", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // API routes still win over the catch-all.
    let res = send(&app, Method::GET, "/raw?sql=SELECT%201%20AS%20one", None).await;
    assert_eq!(res.json(), json!({"rows": [{"one": 1}]}));
}

#[tokio::test]
async fn ui_is_off_by_default() {
    let app = app().await;
    let res = send(&app, Method::GET, "/", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
