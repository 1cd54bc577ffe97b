use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{normalize_identifier, AppError, AppResult, Anomaly, AnomalyQuery, Config, NewAnomaly};
use super::record_id;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/anomaly", get(list).post(create))
        .route("/anomaly/{id}/resolve", put(resolve))
}

fn not_found() -> AppError {
    AppError::NotFound("Anomaly not found".to_string())
}

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// `POST /anomaly` – store a flag raised by the external detector.
async fn create(
    State((pool, _config)): State<(PgPool, Config)>,
    payload: Result<Json<NewAnomaly>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Anomaly>)> {
    // ---
    let Json(flag) = payload?;
    flag.validate()?;

    let stored = sqlx::query_as::<_, Anomaly>(
        r#"
        INSERT INTO anomalies (
            id, station_id, station_name, fuel_type, reading_time,
            fuel_volume_l, volume_diff, anomaly_score, anomaly_flag, anomaly_types
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(normalize_identifier(&flag.station_id))
    .bind(&flag.station_name)
    .bind(&flag.fuel_type)
    .bind(flag.reading_time)
    .bind(flag.fuel_volume_l)
    .bind(flag.volume_diff)
    .bind(flag.anomaly_score)
    .bind(flag.anomaly_flag)
    .bind(&flag.anomaly_types)
    .fetch_one(&pool)
    .await?;

    info!(id = %stored.id, station_id = %stored.station_id, "Anomaly recorded");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /anomaly?status&station&limit` – newest reading first.
async fn list(
    State((pool, _config)): State<(PgPool, Config)>,
    query: Result<Query<AnomalyQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Anomaly>>> {
    // ---
    let Query(params) = query?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let station = params
        .station
        .as_deref()
        .map(normalize_identifier)
        .filter(|s| !s.is_empty());
    debug!(status = ?params.status, ?station, limit, "GET /anomaly");

    let anomalies = sqlx::query_as::<_, Anomaly>(
        r#"
        SELECT * FROM anomalies
        WHERE ($1::anomaly_status IS NULL OR status = $1)
          AND ($2::text IS NULL OR station_id = $2)
        ORDER BY reading_time DESC
        LIMIT $3
        "#,
    )
    .bind(params.status)
    .bind(station)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(anomalies))
}

/// `PUT /anomaly/{id}/resolve`
async fn resolve(
    State((pool, _config)): State<(PgPool, Config)>,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Anomaly>> {
    // ---
    let Path(id) = id?;
    let id = record_id(&id, not_found)?;
    let anomaly = sqlx::query_as::<_, Anomaly>(
        r#"
        UPDATE anomalies SET
            status      = 'resolved',
            resolved_at = COALESCE(resolved_at, now())
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(not_found)?;

    info!(%id, "Anomaly resolved");
    Ok(Json(anomaly))
}
