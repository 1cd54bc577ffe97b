// src/routes/stations.rs
//! Station registry endpoints.
//!
//! Identifier uniqueness is owned by the `idx_stations_identifier_upper`
//! unique index. Create and update never look the identifier up first; they
//! write and translate a unique violation into `409 Conflict`, so two
//! concurrent registrations of `st-001` and `ST-001` cannot both succeed.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::{types::Json as DbJson, PgPool};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    conflict_on_unique, AppError, AppResult, Config, NewStation, Page, PageRequest, Station,
    StationListQuery, StationPatch,
};
use super::record_id;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/station", get(list).post(create))
        .route("/station/{id}", get(fetch).put(update).delete(remove))
}

fn duplicate_message(identifier: &str) -> String {
    format!("Station with ID {identifier} already exists")
}

fn not_found() -> AppError {
    AppError::NotFound("Station not found".to_string())
}

/// `POST /station`
async fn create(
    State((pool, _config)): State<(PgPool, Config)>,
    payload: Result<Json<NewStation>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Station>)> {
    // ---
    let Json(station) = payload?;
    let station = station.normalized();
    station.validate()?;

    let station = insert_station(&pool, &station).await?;
    info!(id = %station.id, identifier = %station.identifier, "Station registered");
    Ok((StatusCode::CREATED, Json(station)))
}

/// `GET /station?page&limit&q`
async fn list(
    State((pool, _config)): State<(PgPool, Config)>,
    query: Result<Query<StationListQuery>, QueryRejection>,
) -> AppResult<Json<Page<Station>>> {
    // ---
    let Query(params) = query?;
    let request = PageRequest::new(params.page, params.limit);
    let pattern = params.search_pattern();
    debug!(?request, ?pattern, "GET /station");

    let (items, total) = tokio::try_join!(
        fetch_station_page(&pool, pattern.as_deref(), request),
        count_stations(&pool, pattern.as_deref()),
    )?;

    Ok(Json(Page::new(items, total, request)))
}

/// `GET /station/{id}`
async fn fetch(
    State((pool, _config)): State<(PgPool, Config)>,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Station>> {
    // ---
    let Path(id) = id?;
    let id = record_id(&id, not_found)?;
    find_station(&pool, id).await?.map(Json).ok_or_else(not_found)
}

/// `PUT /station/{id}` – partial update; absent fields are left untouched.
async fn update(
    State((pool, _config)): State<(PgPool, Config)>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<StationPatch>, JsonRejection>,
) -> AppResult<Json<Station>> {
    // ---
    let Path(id) = id?;
    let id = record_id(&id, not_found)?;
    let Json(patch) = payload?;
    let patch = patch.normalized();
    patch.validate()?;

    let station = update_station(&pool, id, &patch).await?.ok_or_else(not_found)?;
    info!(id = %station.id, identifier = %station.identifier, "Station updated");
    Ok(Json(station))
}

/// `DELETE /station/{id}`
async fn remove(
    State((pool, _config)): State<(PgPool, Config)>,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = id?;
    let id = record_id(&id, not_found)?;
    if !delete_station(&pool, id).await? {
        return Err(not_found());
    }
    info!(%id, "Station deleted");
    Ok(Json(json!({ "message": "Deleted successfully." })))
}

// ---

async fn insert_station(pool: &PgPool, station: &NewStation) -> AppResult<Station> {
    // ---
    let person = station
        .person
        .as_ref()
        .ok_or_else(|| AppError::Validation("Contact person is required".to_string()))?;

    sqlx::query_as::<_, Station>(
        r#"
        INSERT INTO stations (id, identifier, name, location, person, tanks)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&station.identifier)
    .bind(&station.name)
    .bind(&station.location)
    .bind(DbJson(person))
    .bind(DbJson(&station.tanks))
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, || duplicate_message(&station.identifier)))
}

async fn find_station(pool: &PgPool, id: Uuid) -> Result<Option<Station>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Station>("SELECT * FROM stations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Matches `pattern` (already `%`-wrapped) against every searchable field.
const SEARCH_FILTER: &str = r#"
    $1::text IS NULL
    OR identifier       ILIKE $1
    OR name             ILIKE $1
    OR location         ILIKE $1
    OR person->>'name'  ILIKE $1
    OR person->>'email' ILIKE $1
"#;

async fn fetch_station_page(
    pool: &PgPool,
    pattern: Option<&str>,
    request: PageRequest,
) -> Result<Vec<Station>, sqlx::Error> {
    // ---
    let sql = format!(
        "SELECT * FROM stations WHERE {SEARCH_FILTER} \
         ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
    );
    sqlx::query_as::<_, Station>(&sql)
        .bind(pattern)
        .bind(request.limit)
        .bind(request.offset())
        .fetch_all(pool)
        .await
}

async fn count_stations(pool: &PgPool, pattern: Option<&str>) -> Result<i64, sqlx::Error> {
    // ---
    let sql = format!("SELECT COUNT(*) FROM stations WHERE {SEARCH_FILTER}");
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(pattern)
        .fetch_one(pool)
        .await
}

async fn update_station(
    pool: &PgPool,
    id: Uuid,
    patch: &StationPatch,
) -> AppResult<Option<Station>> {
    // ---
    // A single statement: a colliding identifier aborts the whole update, so
    // the stored record keeps its old identifier.
    sqlx::query_as::<_, Station>(
        r#"
        UPDATE stations SET
            identifier = COALESCE($2, identifier),
            name       = COALESCE($3, name),
            location   = COALESCE($4, location),
            person     = COALESCE($5, person),
            tanks      = COALESCE($6, tanks),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(patch.identifier.as_deref())
    .bind(patch.name.as_deref())
    .bind(patch.location.as_deref())
    .bind(patch.person.as_ref().map(DbJson))
    .bind(patch.tanks.as_ref().map(DbJson))
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        conflict_on_unique(e, || {
            duplicate_message(patch.identifier.as_deref().unwrap_or_default())
        })
    })
}

async fn delete_station(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    // ---
    let result = sqlx::query("DELETE FROM stations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
