use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Tier data is unusable for resolution (no floor tier, overlapping bands).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Listing customers from the source failed; aborts a sync run.
    #[error("Source enumeration error: {0}")]
    SourceEnumeration(String),

    /// A single customer's downstream write failed.
    #[error("Profile write error for {customer_id}: {message}")]
    ProfileWrite {
        customer_id: String,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::SourceEnumeration(_) => "SOURCE_ENUMERATION_ERROR",
            AppError::ProfileWrite { .. } => "PROFILE_WRITE_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ExternalApi(_) | AppError::Reqwest(_) => "EXTERNAL_API_ERROR",
            AppError::Internal(_) | AppError::SerdeJson(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_) => StatusCode::CONFLICT,
            AppError::SourceEnumeration(_)
            | AppError::ProfileWrite { .. }
            | AppError::ExternalApi(_)
            | AppError::Reqwest(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Validation(msg) => {
                log::warn!("Validation error: {msg}");
                msg.clone()
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::Configuration(msg) => {
                log::error!("Tier configuration error: {msg}");
                msg.clone()
            }
            AppError::SourceEnumeration(msg) => {
                log::error!("Customer source error: {msg}");
                msg.clone()
            }
            AppError::ProfileWrite {
                customer_id,
                message,
            } => {
                log::error!("Profile write failed for {customer_id}: {message}");
                format!("{customer_id}: {message}")
            }
            AppError::ExternalApi(msg) => {
                log::error!("External API error: {msg}");
                msg.clone()
            }
            AppError::Reqwest(err) => {
                log::error!("HTTP request error: {err}");
                "External API request failed".to_string()
            }
            AppError::Database(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
            _ => {
                log::error!("Internal error: {self}");
                "Internal server error".to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}
