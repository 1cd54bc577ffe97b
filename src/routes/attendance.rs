// src/routes/attendance.rs
//! QR clock-in / clock-out endpoints.
//!
//! The "one open shift per employee" rule is the partial unique index
//! `idx_attendance_one_present`; a second concurrent clock-in fails at insert
//! time and is reported as `409 Conflict`. Clock-out is a single conditional
//! `UPDATE`, so it cannot close a record another request already closed.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    conflict_on_unique, is_foreign_key_violation, AppError, AppResult, Attendance, ClockIn,
    ClockOut, ClockStatus, Config,
};
use super::record_id;

// ---

fn employee_not_found() -> AppError {
    AppError::NotFound("Employee not found".to_string())
}

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/attendance/clock-in", post(clock_in))
        .route("/attendance/clock-out", post(clock_out))
        .route("/attendance/history/{employee_id}", get(history))
        .route("/attendance/status/{employee_id}", get(status))
}

async fn clock_in(
    State((pool, _config)): State<(PgPool, Config)>,
    payload: Result<Json<ClockIn>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Attendance>)> {
    // ---
    let Json(scan) = payload?;
    scan.validate()?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM employees WHERE id = $1)")
            .bind(scan.employee_id)
            .fetch_one(&pool)
            .await?;
    if !exists {
        return Err(employee_not_found());
    }

    let record = sqlx::query_as::<_, Attendance>(
        r#"
        INSERT INTO attendance (id, employee_id, station_id, check_in_time, status)
        VALUES ($1, $2, $3, now(), 'Present')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(scan.employee_id)
    .bind(scan.station_id.trim())
    .fetch_one(&pool)
    .await
    .map_err(clock_in_failure)?;

    info!(employee_id = %record.employee_id, station_id = %record.station_id, "Clocked in");
    Ok((StatusCode::CREATED, Json(record)))
}

/// The employee may have been deleted between the existence check and the
/// insert; the foreign key then reports it.
fn clock_in_failure(err: sqlx::Error) -> AppError {
    // ---
    if is_foreign_key_violation(&err) {
        employee_not_found()
    } else {
        conflict_on_unique(err, || "Employee is already clocked in".to_string())
    }
}

async fn clock_out(
    State((pool, _config)): State<(PgPool, Config)>,
    payload: Result<Json<ClockOut>, JsonRejection>,
) -> AppResult<Json<Attendance>> {
    // ---
    let Json(request) = payload?;

    let record = sqlx::query_as::<_, Attendance>(
        r#"
        UPDATE attendance SET
            check_out_time = now(),
            status         = 'Completed',
            updated_at     = now()
        WHERE employee_id = $1 AND status = 'Present'
        RETURNING *
        "#,
    )
    .bind(request.employee_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("No active check-in found for this employee".to_string()))?;

    info!(employee_id = %record.employee_id, "Clocked out");
    Ok(Json(record))
}

/// `GET /attendance/history/{employee_id}` – newest first.
async fn history(
    State((pool, _config)): State<(PgPool, Config)>,
    employee_id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Vec<Attendance>>> {
    // ---
    let Path(employee_id) = employee_id?;
    let employee_id = record_id(&employee_id, employee_not_found)?;
    let records = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE employee_id = $1 ORDER BY created_at DESC",
    )
    .bind(employee_id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(records))
}

async fn status(
    State((pool, _config)): State<(PgPool, Config)>,
    employee_id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<ClockStatus>> {
    // ---
    let Path(employee_id) = employee_id?;
    let employee_id = record_id(&employee_id, employee_not_found)?;
    let open = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE employee_id = $1 AND status = 'Present'",
    )
    .bind(employee_id)
    .fetch_optional(&pool)
    .await?;
    Ok(Json(ClockStatus::from(open)))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::error::tests::{foreign_key_violation, unique_violation};

    #[test]
    fn test_employee_deleted_during_clock_in_is_not_found() {
        // ---
        let err = clock_in_failure(foreign_key_violation());
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Employee not found"));
    }

    #[test]
    fn test_second_open_shift_is_conflict() {
        // ---
        let err = clock_in_failure(unique_violation());
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Employee is already clocked in"));
    }

    #[test]
    fn test_other_store_errors_stay_internal() {
        // ---
        let err = clock_in_failure(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
