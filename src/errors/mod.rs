use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(FieldErrors),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal Server Error: {message}")]
    Internal {
        message: String,
        /// Underlying cause, only populated when the app runs in debug mode.
        detail: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    status: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl AppError {
    pub fn internal(message: impl Into<String>, detail: Option<String>) -> Self {
        AppError::Internal {
            message: message.into(),
            detail,
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    pub fn not_found(message: &str) -> Self {
        AppError::NotFound(message.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => ErrorResponse {
                status: "error",
                message: "Validation failed",
                errors: Some(errors),
                error: None,
            },
            AppError::Unauthenticated(msg) | AppError::Forbidden(msg) | AppError::NotFound(msg) => {
                ErrorResponse {
                    status: "error",
                    message: msg,
                    errors: None,
                    error: None,
                }
            }
            AppError::Internal { message, detail } => ErrorResponse {
                status: "error",
                message,
                errors: None,
                error: Some(detail.as_deref().unwrap_or("Internal server error")),
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
