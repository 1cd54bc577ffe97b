//! Request types for the forecast pass-through.

use axum::body::Bytes;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastMode {
    Weekly,
    Monthly,
    Annual,
}

impl ForecastMode {
    // ---
    /// Case-insensitive parse of `weekly`, `monthly` or `annual`.
    pub fn parse(raw: &str) -> Option<Self> {
        // ---
        match raw.trim().to_ascii_lowercase().as_str() {
            "weekly" => Some(ForecastMode::Weekly),
            "monthly" => Some(ForecastMode::Monthly),
            "annual" => Some(ForecastMode::Annual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMode::Weekly => "weekly",
            ForecastMode::Monthly => "monthly",
            ForecastMode::Annual => "annual",
        }
    }
}

/// Sales report uploaded alongside a forecast request.
#[derive(Debug, Clone)]
pub struct ReportUpload {
    // ---
    pub file_name: String,
    pub content: Bytes,
}

impl ReportUpload {
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}
