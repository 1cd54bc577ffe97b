use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::{AppResult, Config, NewSensorReading, RawSensorReading, SensorReading};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/sensor", get(latest).post(record))
}

/// Query parameters for `GET /sensor`
#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    limit: Option<i64>,
}

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// `POST /sensor` – convert a raw distance to litres and append it to the log.
async fn record(
    State((pool, config)): State<(PgPool, Config)>,
    payload: Result<Json<RawSensorReading>, JsonRejection>,
) -> AppResult<Json<SensorReading>> {
    // ---
    let Json(raw) = payload?;
    debug!("POST /sensor - reading {} cm", raw.reading);

    let transformed =
        raw.to_transformed(&config.tank, &config.sensor_type, &config.sensor_location);
    let stored = store_sensor_reading(&pool, &transformed).await?;

    info!(
        id = stored.id,
        reading_cm = stored.reading_cm,
        volume_litres = stored.volume_litres,
        "Sensor reading stored"
    );
    Ok(Json(stored))
}

/// `GET /sensor` – most recent readings, newest first.
async fn latest(
    State((pool, _config)): State<(PgPool, Config)>,
    query: Result<Query<LatestQuery>, QueryRejection>,
) -> AppResult<Json<Vec<SensorReading>>> {
    // ---
    let Query(params) = query?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let readings = fetch_latest_readings(&pool, limit).await?;
    debug!("GET /sensor - returning {} readings", readings.len());
    Ok(Json(readings))
}

// ---

async fn store_sensor_reading(
    pool: &PgPool,
    reading: &NewSensorReading,
) -> Result<SensorReading, sqlx::Error> {
    // ---
    sqlx::query_as::<_, SensorReading>(
        r#"
        INSERT INTO sensor_readings (reading_cm, volume_litres, sensor_type, location)
        VALUES ($1, $2, $3, $4)
        RETURNING id, reading_cm, volume_litres, sensor_type, location, captured_at
        "#,
    )
    .bind(reading.reading_cm)
    .bind(reading.volume_litres)
    .bind(&reading.sensor_type)
    .bind(&reading.location)
    .fetch_one(pool)
    .await
}

async fn fetch_latest_readings(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<SensorReading>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, SensorReading>(
        r#"
        SELECT id, reading_cm, volume_litres, sensor_type, location, captured_at
        FROM sensor_readings
        ORDER BY captured_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
