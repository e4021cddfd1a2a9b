use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use fincache_core::errors::Error as CoreError;

use crate::models::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::BadRequest(e.to_string()),
            CoreError::UnknownSource(source) => {
                ApiError::BadRequest(format!("scraper not found for source: {source}"))
            }
            CoreError::NotFound(message) => ApiError::NotFound(message),
            // Assembly failures carry a message worth surfacing; the job-based
            // error narrative does not apply to the synchronous read path.
            CoreError::MissingExchangeRate(message) => ApiError::Internal(message),
            other => {
                tracing::error!(error = %other, "request failed");
                ApiError::Internal("internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ApiResponse {
            message: self.to_string(),
            data: String::new(),
        });
        (status, body).into_response()
    }
}
