// src/error.rs
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    InternalServerError(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
    AuthError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::DatabaseError(err) => write!(f, "Database Error: {}", err),
            ApiError::AuthError(msg) => write!(f, "Auth Error: {}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        if let ApiError::DatabaseError(err) = self {
            log::error!("Storage failure: {}", err);
        }

        let error_response = ErrorResponse {
            success: false,
            message: self.to_string(),
        };

        match self {
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(error_response),
            ApiError::Unauthorized(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::Forbidden(_) => HttpResponse::Forbidden().json(error_response),
            ApiError::ValidationError(_) => HttpResponse::UnprocessableEntity().json(error_response),
            ApiError::DatabaseError(_) => HttpResponse::InternalServerError().json(error_response),
            ApiError::AuthError(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::InternalServerError(_) => HttpResponse::InternalServerError().json(error_response),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

// Domain-specific constructors
impl ApiError {
    pub fn invalid_token(reason: &str) -> Self {
        ApiError::Forbidden(reason.to_string())
    }

    pub fn invalid_credentials() -> Self {
        ApiError::AuthError("Invalid username or password".to_string())
    }

    pub fn unknown_token(kind: &str, value: &str, allowed: &[&str]) -> Self {
        ApiError::ValidationError(format!(
            "Invalid {} '{}'. Valid values: {}",
            kind,
            value,
            allowed.join(", ")
        ))
    }

    pub fn validation_failed(field: &str, reason: &str) -> Self {
        ApiError::ValidationError(format!("Validation failed for field '{}': {}", field, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::invalid_token("Token expired").error_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::invalid_credentials().error_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::unknown_token("origin", "Internal", &["internal", "external"])
                .error_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::DatabaseError(sqlx::Error::PoolTimedOut).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unknown_token_message_lists_allowed_values() {
        let err = ApiError::unknown_token("parity", "prime", &["even", "odd"]);
        let message = err.to_string();
        assert!(message.contains("'prime'"));
        assert!(message.contains("even, odd"));
    }
}
