use axum::{
    extract::OriginalUri,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{AppError, AppResult, Config};

mod anomaly;
mod attendance;
mod employees;
mod forecast;
mod health;
mod sensor;
mod stations;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    let cors = cors_layer(&config.client_origin);

    Router::new()
        .merge(stations::router())
        .merge(sensor::router())
        .merge(employees::router())
        .merge(attendance::router())
        .merge(anomaly::router())
        .merge(forecast::router())
        .merge(health::router())
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state((pool, config))
}

/// `*` allows any origin; anything else is used as the single allowed origin.
fn cors_layer(origin: &str) -> CorsLayer {
    // ---
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.parse::<HeaderValue>() {
        Ok(value) if origin != "*" => layer.allow_origin([value]),
        _ => layer.allow_origin(Any),
    }
}

/// Parse a record id taken from the path. A value that is not a UUID names
/// no record, so it is reported through `missing` like an unknown id.
fn record_id(raw: &str, missing: impl FnOnce() -> AppError) -> AppResult<Uuid> {
    // ---
    Uuid::parse_str(raw.trim()).map_err(|_| missing())
}

async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    // ---
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route not found", "path": uri.path() })),
    )
}
