//! Fuel-volume anomaly flags pushed by the external detector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "anomaly_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AnomalyStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Anomaly {
    // ---
    pub id: Uuid,
    pub station_id: String,
    pub station_name: Option<String>,
    pub fuel_type: String,
    pub reading_time: DateTime<Utc>,
    pub fuel_volume_l: f64,
    pub volume_diff: f64,
    pub anomaly_score: f64,
    pub anomaly_flag: bool,
    /// Comma-separated labels, e.g. `sudden_drop,after_hours`.
    pub anomaly_types: String,
    pub status: AnomalyStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewAnomaly {
    // ---
    #[validate(length(min = 1, message = "Station id is required"))]
    pub station_id: String,
    pub station_name: Option<String>,
    #[validate(length(min = 1, message = "Fuel type is required"))]
    pub fuel_type: String,
    pub reading_time: DateTime<Utc>,
    pub fuel_volume_l: f64,
    #[serde(default)]
    pub volume_diff: f64,
    #[serde(default)]
    pub anomaly_score: f64,
    #[serde(default = "flagged")]
    pub anomaly_flag: bool,
    #[serde(default)]
    pub anomaly_types: String,
}

/// Query string for `GET /anomaly`.
#[derive(Debug, Default, Deserialize)]
pub struct AnomalyQuery {
    // ---
    pub status: Option<AnomalyStatus>,
    /// Station identifier, compared case-insensitively.
    pub station: Option<String>,
    pub limit: Option<i64>,
}

fn flagged() -> bool {
    true
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_anomaly_defaults() {
        // ---
        let anomaly: NewAnomaly = serde_json::from_value(json!({
            "station_id": "ST-001",
            "fuel_type": "Diesel",
            "reading_time": "2025-03-26T18:45:00Z",
            "fuel_volume_l": 812.5
        }))
        .unwrap();

        assert!(anomaly.anomaly_flag);
        assert_eq!(anomaly.volume_diff, 0.0);
        assert!(anomaly.anomaly_types.is_empty());
        assert!(anomaly.validate().is_ok());
    }

    #[test]
    fn test_query_status_filter() {
        // ---
        let query: AnomalyQuery = serde_json::from_value(json!({ "status": "resolved" })).unwrap();
        assert_eq!(query.status, Some(AnomalyStatus::Resolved));
        assert!(serde_json::from_value::<AnomalyQuery>(json!({ "status": "closed" })).is_err());
    }
}
