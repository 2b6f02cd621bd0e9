use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// One failed input check, reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub param: String,
    pub msg: String,
}

impl FieldError {
    pub fn new(param: &str, msg: &str) -> Self {
        Self {
            param: param.to_string(),
            msg: msg.to_string(),
        }
    }
}

/// Every failure a handler can surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Failures raised by the user and ticket stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("an admin account already exists")]
    AdminExists,
    #[error("owner does not exist")]
    MissingOwner,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(errors) => ErrorBody {
                msg: "Validation failed".into(),
                errors: Some(errors),
            },
            AppError::InvalidCredentials => ErrorBody {
                msg: "Invalid credentials".into(),
                errors: None,
            },
            AppError::Conflict(msg)
            | AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => ErrorBody { msg, errors: None },
            AppError::Unexpected(e) => {
                // internal detail stays in the logs
                error!(error = ?e, "unexpected error");
                ErrorBody {
                    msg: "Server error".into(),
                    errors: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::Conflict("User already exists".into()),
            StoreError::AdminExists => AppError::Conflict(
                "An admin already exists; only one admin is allowed".into(),
            ),
            StoreError::MissingOwner => AppError::Unauthenticated("User no longer exists".into()),
            StoreError::Database(e) => AppError::Unexpected(e.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldError::new("body", &rejection.body_text())])
    }
}
