use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    conflict_on_unique, AppError, AppResult, Config, Employee, EmployeePatch, NewEmployee,
};
use super::record_id;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/employees", get(list).post(create))
        .route("/employees/{id}", put(update).delete(remove))
}

fn duplicate_message(code: &str) -> String {
    format!("Employee with code {code} already exists")
}

fn not_found() -> AppError {
    AppError::NotFound("Employee not found".to_string())
}

async fn list(State((pool, _config)): State<(PgPool, Config)>) -> AppResult<Json<Vec<Employee>>> {
    // ---
    let employees =
        sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY created_at DESC")
            .fetch_all(&pool)
            .await?;
    Ok(Json(employees))
}

async fn create(
    State((pool, _config)): State<(PgPool, Config)>,
    payload: Result<Json<NewEmployee>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    // ---
    let Json(employee) = payload?;
    let employee = employee.normalized();
    employee.validate()?;

    let stored = sqlx::query_as::<_, Employee>(
        r#"
        INSERT INTO employees (
            id, employee_code, name, role, status, shift, join_date, color, avatar
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&employee.employee_code)
    .bind(&employee.name)
    .bind(&employee.role)
    .bind(employee.status)
    .bind(&employee.shift)
    .bind(employee.join_date)
    .bind(&employee.color)
    .bind(&employee.avatar)
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_on_unique(e, || duplicate_message(&employee.employee_code)))?;

    info!(id = %stored.id, code = %stored.employee_code, "Employee created");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `PUT /employees/{id}` – partial update.
async fn update(
    State((pool, _config)): State<(PgPool, Config)>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<EmployeePatch>, JsonRejection>,
) -> AppResult<Json<Employee>> {
    // ---
    let Path(id) = id?;
    let id = record_id(&id, not_found)?;
    let Json(patch) = payload?;
    let patch = patch.normalized();
    patch.validate()?;

    let updated = sqlx::query_as::<_, Employee>(
        r#"
        UPDATE employees SET
            employee_code = COALESCE($2, employee_code),
            name          = COALESCE($3, name),
            role          = COALESCE($4, role),
            status        = COALESCE($5, status),
            shift         = COALESCE($6, shift),
            join_date     = COALESCE($7, join_date),
            color         = COALESCE($8, color),
            avatar        = COALESCE($9, avatar),
            updated_at    = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(patch.employee_code.as_deref())
    .bind(patch.name.as_deref())
    .bind(patch.role.as_deref())
    .bind(patch.status)
    .bind(patch.shift.as_deref())
    .bind(patch.join_date)
    .bind(patch.color.as_deref())
    .bind(patch.avatar.as_deref())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        conflict_on_unique(e, || {
            duplicate_message(patch.employee_code.as_deref().unwrap_or_default())
        })
    })?
    .ok_or_else(not_found)?;

    info!(id = %updated.id, "Employee updated");
    Ok(Json(updated))
}

async fn remove(
    State((pool, _config)): State<(PgPool, Config)>,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = id?;
    let id = record_id(&id, not_found)?;
    let result = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    info!(%id, "Employee deleted");
    Ok(Json(json!({ "message": "Employee deleted successfully" })))
}
