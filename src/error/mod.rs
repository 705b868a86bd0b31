use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::error::Error as StdError;

use crate::auth_stores::StoreError;

#[derive(Debug)]
pub enum AppError {
    // Authentication and authorization
    InvalidCredentials(String),
    Unauthorized(String),
    InvalidToken(String),
    TokenExpired(String),
    Forbidden(String),
    // Everything else
    Internal(String),
    Configuration(String),
    Database(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    code: u16,
    message: String,
    error_type: String,
}

impl AppError {
    /// Stable machine-readable identifier sent to clients as `error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials(_) => "invalid_credentials",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::TokenExpired(_) => "token_expired",
            AppError::Forbidden(_) => "forbidden",
            AppError::Internal(_) => "internal_error",
            AppError::Configuration(_) => "configuration_error",
            AppError::Database(_) => "database_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
        }
    }

    /// Message that is safe to hand to a client. Server-side failures are
    /// collapsed to a generic text so store and signing details stay in logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) | AppError::Configuration(_) | AppError::Database(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidCredentials(e) => write!(f, "Invalid credentials: {}", e),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {}", e),
            AppError::InvalidToken(e) => write!(f, "Invalid token: {}", e),
            AppError::TokenExpired(e) => write!(f, "Token expired: {}", e),
            AppError::Forbidden(e) => write!(f, "Forbidden: {}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::BadRequest(e) => write!(f, "Bad request: {}", e),
            AppError::NotFound(e) => write!(f, "Not found: {}", e),
            AppError::Conflict(e) => write!(f, "Conflict: {}", e),
        }
    }
}

impl StdError for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            log::error!("Request failed with {}: {}", status_code, self);
        }

        let error_response = ErrorResponse {
            code: status_code.as_u16(),
            message: self.public_message(),
            error_type: self.error_type().to_string(),
        };

        HttpResponse::build(status_code).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::TokenExpired(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate(msg) => AppError::Conflict(msg),
            other => AppError::Internal(format!("User store failure: {}", other)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON deserialization/serialization error: {}", error))
    }
}

// Define AppResult type alias for Result<T, AppError>
pub type AppResult<T> = Result<T, AppError>;
