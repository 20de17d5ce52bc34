use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dbstudio_core::{BackendError, Error};
use serde_json::json;
use tracing::{error, warn};

/// Core error carried to the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::MalformedRow { .. } | Error::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        let mut body = json!({ "error": self.0.to_string() });
        if let Error::Backend(BackendError {
            code: Some(code), ..
        }) = &self.0
        {
            body["code"] = json!(code);
        }
        (status, Json(body)).into_response()
    }
}

pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not found")
}
