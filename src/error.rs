//! Request-level error type for the `fuelwatch` API.
//!
//! Every handler returns `Result<_, AppError>`. Client-caused failures carry a
//! readable message; database and internal failures are logged here and
//! answered with a generic message so no internals reach the client.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

// ---

#[derive(Error, Debug)]
pub enum AppError {
    // ---
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The forecasting service failed or answered with something unusable.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    // ---
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::Conflict(msg) | AppError::NotFound(msg) => {
                msg.clone()
            }
            AppError::Upstream(_) => "Forecast service unavailable".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
            }
            AppError::Upstream(_) => tracing::warn!(error = %self, "Upstream call failed"),
            _ => tracing::debug!(status = %self.status(), error = %self, "Request rejected"),
        }

        (self.status(), Json(json!({ "message": self.public_message() }))).into_response()
    }
}

/// True when the error is a unique-constraint violation reported by the store.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    // ---
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// True when the error is a foreign-key violation, e.g. the referenced row is gone.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    // ---
    match err {
        sqlx::Error::Database(db_err) => db_err.is_foreign_key_violation(),
        _ => false,
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    // ---
    if is_unique_violation(&err) {
        AppError::Conflict(message())
    } else {
        AppError::Database(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(err.body_text())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    // ---
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use sqlx::error::{DatabaseError, ErrorKind};

    /// Store error standing in for a unique or foreign-key violation.
    #[derive(Debug, Error)]
    #[error("constraint violated")]
    pub(crate) struct ConstraintError {
        foreign_key: bool,
    }

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.foreign_key {
                ErrorKind::ForeignKeyViolation
            } else {
                ErrorKind::UniqueViolation
            }
        }
    }

    pub(crate) fn unique_violation() -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError { foreign_key: false }))
    }

    pub(crate) fn foreign_key_violation() -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError { foreign_key: true }))
    }

    fn body_json(err: AppError) -> (StatusCode, Value) {
        // ---
        let response = err.into_response();
        let status = response.status();
        let bytes = tokio_test::block_on(to_bytes(response.into_body(), usize::MAX)).unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        // ---
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        // ---
        let err = AppError::Conflict("Station with ID ST-001 already exists".into());
        let (status, body) = body_json(err);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Station with ID ST-001 already exists");
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        // ---
        let err = AppError::Internal(anyhow::anyhow!("connection refused at 10.0.0.4"));
        let (status, body) = body_json(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal Server Error");

        let (_, body) = body_json(AppError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        // ---
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
        let mapped = conflict_on_unique(sqlx::Error::RowNotFound, || "dup".to_string());
        assert!(matches!(mapped, AppError::Database(_)));
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        // ---
        let err = unique_violation();
        assert!(is_unique_violation(&err));
        assert!(!is_foreign_key_violation(&err));

        let mapped = conflict_on_unique(err, || "Station with ID ST-001 already exists".into());
        assert!(matches!(mapped, AppError::Conflict(msg) if msg.contains("ST-001")));
    }

    #[test]
    fn test_foreign_key_violation_is_detected() {
        // ---
        let err = foreign_key_violation();
        assert!(is_foreign_key_violation(&err));
        assert!(!is_unique_violation(&err));
        assert!(matches!(conflict_on_unique(err, String::new), AppError::Database(_)));
    }
}
