use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure a handler or the route guard can surface to a client.
///
/// The Display string is the client-facing message; internal detail stays in
/// the `Internal` source chain and is only logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    /// Password failed the composition policy; message aggregates every rule.
    #[error("{0}")]
    InvalidPassword(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Email and/or username already registered. Rendered as a per-field
    /// `errors` map rather than a flat message.
    #[error("User already exists")]
    DuplicateUser {
        email_taken: bool,
        username_taken: bool,
    },

    /// Login failure. The message is identical whether the email is unknown
    /// or the password is wrong, so a caller cannot probe for registered
    /// emails; only the status code differs.
    #[error("Username or password is incorrect")]
    InvalidCredentials { known_email: bool },

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Cannot {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::InvalidPassword(_)
            | ApiError::PasswordMismatch => StatusCode::BAD_REQUEST,
            ApiError::DuplicateUser { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidCredentials { known_email } => {
                if *known_email {
                    StatusCode::UNAUTHORIZED
                } else {
                    StatusCode::NOT_FOUND
                }
            }
            ApiError::InvalidToken | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::UserNotFound | ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::DuplicateUser {
                email_taken,
                username_taken,
            } => {
                let mut errors = serde_json::Map::new();
                if *email_taken {
                    errors.insert("email".into(), json!(["has already been taken"]));
                }
                if *username_taken {
                    errors.insert("username".into(), json!(["has already been taken"]));
                }
                json!({ "success": false, "errors": errors })
            }
            _ => json!({ "success": false, "message": self.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            error!(error = ?e, "internal error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}
