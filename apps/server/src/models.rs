use axum::Json;
use serde::Serialize;

/// Envelope every JSON response is wrapped in.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            message: "ok".to_string(),
            data,
        })
    }
}
