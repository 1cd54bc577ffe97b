//! Attendance clock-in / clock-out records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "PascalCase")]
pub enum AttendanceStatus {
    Present,
    Completed,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Attendance {
    // ---
    pub id: Uuid,
    pub employee_id: Uuid,
    pub station_id: String,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decoded QR payload scanned at the station.
#[derive(Debug, Deserialize, Validate)]
pub struct ClockIn {
    // ---
    pub employee_id: Uuid,
    #[validate(length(min = 1, message = "Station id is required"))]
    pub station_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ClockOut {
    pub employee_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ClockStatus {
    // ---
    pub is_clocked_in: bool,
    pub record: Option<Attendance>,
}

impl From<Option<Attendance>> for ClockStatus {
    fn from(record: Option<Attendance>) -> Self {
        ClockStatus {
            is_clocked_in: record.is_some(),
            record,
        }
    }
}
