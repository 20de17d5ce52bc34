use crate::config::ServerConfig;
use crate::cors;
use crate::error::{ApiError, json_error, not_found};
use crate::fs::UiRoot;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get, post};
use axum::{Json, Router, middleware};
use dbstudio_core::{
    ActionGateway, ActionRequest, ActionResponse, DatabaseHandle, Error, RawGateway, RawQuery,
    RowsResponse, SuccessResponse,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::error;

pub struct AppState<H> {
    raw: RawGateway<H>,
    actions: ActionGateway<H>,
    ui: Option<Arc<UiRoot>>,
}

impl<H> Clone for AppState<H> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            actions: self.actions.clone(),
            ui: self.ui.clone(),
        }
    }
}

/// Build the request handler for `handle`.
///
/// `/raw` and `/actions` (and anything below them) go to their gateways.
/// With a UI directory configured, other GETs are served from it.
pub fn router<H: DatabaseHandle>(handle: Arc<H>, config: &ServerConfig) -> Router {
    let state = AppState {
        raw: RawGateway::new(Arc::clone(&handle)),
        actions: ActionGateway::new(handle),
        ui: config.ui_root().map(Arc::new),
    };

    // HEAD would otherwise fall through to the GET handler and run the SQL.
    let raw: MethodRouter<AppState<H>> = get(raw_read::<H>)
        .head(method_not_allowed)
        .post(raw_write::<H>)
        .fallback(method_not_allowed);
    let actions: MethodRouter<AppState<H>> = post(run_action::<H>).fallback(method_not_allowed);

    // `{*rest}` needs a non-empty tail, so the bare trailing slash is its own route.
    Router::new()
        .route("/raw", raw.clone())
        .route("/raw/", raw.clone())
        .route("/raw/{*rest}", raw)
        .route("/actions", actions.clone())
        .route("/actions/", actions.clone())
        .route("/actions/{*rest}", actions)
        .fallback(fallback::<H>)
        .with_state(state)
        .layer(middleware::from_fn(cors::cors))
}

// An empty body reads as `{}` so a bare POST reports the missing field.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::invalid_request(format!("Invalid JSON body: {e}")))
}

async fn raw_read<H: DatabaseHandle>(
    State(state): State<AppState<H>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<RowsResponse>, ApiError> {
    let Query(pairs) = query.map_err(|e| Error::invalid_request(e.body_text()))?;
    let (sql, params) =
        RawQuery::from_query_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .into_parts();
    Ok(Json(state.raw.execute_read(sql.as_deref(), &params).await?))
}

async fn raw_write<H: DatabaseHandle>(
    State(state): State<AppState<H>>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let (sql, params) = parse_body::<RawQuery>(&body)?.into_parts();
    Ok(Json(state.raw.execute_write(sql.as_deref(), &params).await?))
}

async fn run_action<H: DatabaseHandle>(
    State(state): State<AppState<H>>,
    body: Bytes,
) -> Result<Json<ActionResponse>, ApiError> {
    let req = parse_body::<ActionRequest>(&body)?;
    Ok(Json(state.actions.dispatch(req).await?))
}

async fn method_not_allowed() -> ApiError {
    ApiError(Error::MethodNotAllowed)
}

async fn fallback<H: DatabaseHandle>(
    State(state): State<AppState<H>>,
    method: Method,
    uri: Uri,
) -> Response {
    let Some(ui) = state.ui.as_ref() else {
        return not_found();
    };
    if method != Method::GET && method != Method::HEAD {
        return not_found();
    }
    match ui.read(uri.path()).await {
        Ok(Some(file)) => ([(CONTENT_TYPE, file.content_type)], file.bytes).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            error!(path = uri.path(), error = %e, "failed to read ui file");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file")
        }
    }
}
