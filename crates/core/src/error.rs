use crate::dialect::Dialect;
use thiserror::Error;

/// A failure reported by the database itself, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    /// Driver error code when the backend reports one (SQLSTATE for PostgreSQL).
    pub code: Option<String>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed caller input. Raised before any database access.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// An introspection row lacked a field the normalizer relies on.
    #[error("malformed {dialect} introspection row: missing or invalid field `{field}`")]
    MalformedRow {
        dialect: Dialect,
        field: &'static str,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Error {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }

    /// True for errors caused by the caller rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::MethodNotAllowed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
