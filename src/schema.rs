//! Database schema management for `fuelwatch`.
//!
//! Ensures required types, tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).
//!
//! Uniqueness lives here, not in the handlers. Station identifiers carry a
//! unique index on `upper(identifier)` and employee codes a plain one. A
//! partial unique index allows at most one `Present` attendance row per
//! employee. Handlers map the resulting violations to `409 Conflict`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Case-insensitive uniqueness of station identifiers, independent of the
/// normalisation the handlers apply before writing.
const STATION_IDENTIFIER_INDEX: &str = "
    CREATE UNIQUE INDEX IF NOT EXISTS idx_stations_identifier_upper
        ON stations (upper(identifier));";

/// Postgres has no `CREATE TYPE IF NOT EXISTS`; swallow `duplicate_object`.
fn create_enum(name: &str, variants: &[&str]) -> String {
    // ---
    let labels = variants
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "DO $$ BEGIN
            CREATE TYPE {name} AS ENUM ({labels});
        EXCEPTION
            WHEN duplicate_object THEN NULL;
        END $$;"
    )
}

/// Create or update the database schema (idempotent).
///
/// Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    for ddl in [
        create_enum("employee_status", &["active", "on-break", "offline"]),
        create_enum("attendance_status", &["Present", "Completed"]),
        create_enum("anomaly_status", &["open", "resolved"]),
    ] {
        sqlx::query(&ddl).execute(&mut *tx).await?;
    }

    // Station registry; `identifier` is stored trimmed and upper-cased
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            id          UUID PRIMARY KEY,
            identifier  TEXT        NOT NULL,
            name        TEXT        NOT NULL,
            location    TEXT        NOT NULL,
            person      JSONB       NOT NULL,
            tanks       JSONB       NOT NULL DEFAULT '[]'::jsonb,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(STATION_IDENTIFIER_INDEX)
        .execute(&mut *tx)
        .await?;

    // Superseded by the expression index above
    sqlx::query("DROP INDEX IF EXISTS idx_stations_identifier;")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_stations_created_at
            ON stations (created_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Append-only ultrasonic sensor log
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id             BIGSERIAL PRIMARY KEY,
            reading_cm     DOUBLE PRECISION NOT NULL,
            volume_litres  DOUBLE PRECISION NOT NULL,
            sensor_type    TEXT        NOT NULL,
            location       TEXT        NOT NULL,
            captured_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_captured_at
            ON sensor_readings (captured_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id             UUID PRIMARY KEY,
            employee_code  TEXT            NOT NULL,
            name           TEXT            NOT NULL,
            role           TEXT            NOT NULL,
            status         employee_status NOT NULL DEFAULT 'active',
            shift          TEXT            NOT NULL,
            join_date      DATE            NOT NULL,
            color          TEXT            NOT NULL DEFAULT '#3b82f6',
            avatar         TEXT,
            created_at     TIMESTAMPTZ     NOT NULL DEFAULT now(),
            updated_at     TIMESTAMPTZ     NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_employees_code
            ON employees (employee_code);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id              UUID PRIMARY KEY,
            employee_id     UUID              NOT NULL REFERENCES employees (id) ON DELETE CASCADE,
            station_id      TEXT              NOT NULL,
            check_in_time   TIMESTAMPTZ       NOT NULL,
            check_out_time  TIMESTAMPTZ,
            status          attendance_status NOT NULL DEFAULT 'Present',
            created_at      TIMESTAMPTZ       NOT NULL DEFAULT now(),
            updated_at      TIMESTAMPTZ       NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // At most one open clock-in per employee
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_attendance_one_present
            ON attendance (employee_id)
            WHERE status = 'Present';
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_attendance_employee_created
            ON attendance (employee_id, created_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anomalies (
            id             UUID PRIMARY KEY,
            station_id     TEXT             NOT NULL,
            station_name   TEXT,
            fuel_type      TEXT             NOT NULL,
            reading_time   TIMESTAMPTZ      NOT NULL,
            fuel_volume_l  DOUBLE PRECISION NOT NULL,
            volume_diff    DOUBLE PRECISION NOT NULL DEFAULT 0,
            anomaly_score  DOUBLE PRECISION NOT NULL DEFAULT 0,
            anomaly_flag   BOOLEAN          NOT NULL DEFAULT TRUE,
            anomaly_types  TEXT             NOT NULL DEFAULT '',
            status         anomaly_status   NOT NULL DEFAULT 'open',
            resolved_at    TIMESTAMPTZ,
            created_at     TIMESTAMPTZ      NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_anomalies_reading_time
            ON anomalies (reading_time DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_enum_ddl_is_idempotent_block() {
        // ---
        let ddl = create_enum("employee_status", &["active", "on-break"]);
        assert!(ddl.contains("CREATE TYPE employee_status AS ENUM ('active', 'on-break');"));
        assert!(ddl.contains("WHEN duplicate_object THEN NULL;"));
    }

    #[test]
    fn test_station_identifier_index_ignores_case() {
        // ---
        assert!(STATION_IDENTIFIER_INDEX.contains("CREATE UNIQUE INDEX IF NOT EXISTS"));
        assert!(STATION_IDENTIFIER_INDEX.contains("ON stations (upper(identifier))"));
    }
}
