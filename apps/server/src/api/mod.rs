//! Route table and middleware stack.

mod health;
mod jobs;
mod prices;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::main_lib::AppState;
use crate::models::ApiResponse;

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/sources", get(prices::list_sources))
        .route("/api/v1/prices/{symbol}", get(prices::get_prices))
        .route("/api/v1/jobs", get(jobs::list_jobs))
        .route("/api/v1/jobs/{id}", get(jobs::get_job))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(Duration::from_secs(60)))
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}

/// Panics in handlers surface as a plain 500 with the standard envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = detail, "panic recovered");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse {
            message: "internal server error".to_string(),
            data: String::new(),
        }),
    )
        .into_response()
}
