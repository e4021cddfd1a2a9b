use axum::Json;
use serde::Serialize;

use crate::models::ApiResponse;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
}

pub async fn health() -> Json<ApiResponse<Health>> {
    ApiResponse::ok(Health {
        status: "ok".to_string(),
    })
}
