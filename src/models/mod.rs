//! Data models for the fuel station service.
//!
//! Each submodule owns the row type read back from PostgreSQL, the request
//! payloads accepted by the API, and any pure transformation helpers.

use serde::Serialize;

mod anomaly;
mod attendance;
mod employee;
mod forecast;
mod sensor;
mod station;

pub use anomaly::{Anomaly, AnomalyQuery, NewAnomaly};
pub use attendance::{Attendance, ClockIn, ClockOut, ClockStatus};
pub use employee::{Employee, EmployeePatch, NewEmployee};
pub use forecast::{ForecastMode, ReportUpload};
pub use sensor::{NewSensorReading, RawSensorReading, SensorReading, TankGeometry};
pub use station::{normalize_identifier, NewStation, Station, StationListQuery, StationPatch};

// ---

/// Clamped pagination window for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    // ---
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    // ---
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 50;

    /// Page is at least 1, limit is clamped to `1..=MAX_LIMIT`.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        // ---
        PageRequest {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` rows.
    pub fn pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

/// One page of a listing plus the totals a client needs to paginate.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    // ---
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Page {
            items,
            total,
            page: request.page,
            limit: request.limit,
            pages: request.pages(total),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_page_defaults() {
        // ---
        let req = PageRequest::new(None, None);
        assert_eq!(req, PageRequest { page: 1, limit: 10 });
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_page_clamping() {
        // ---
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(-3), Some(500)), PageRequest { page: 1, limit: 50 });
        assert_eq!(PageRequest::new(Some(4), Some(25)).offset(), 75);
    }

    #[test]
    fn test_second_page_of_twenty_five() {
        // ---
        let req = PageRequest::new(Some(2), Some(10));
        assert_eq!(req.offset(), 10);
        assert_eq!(req.pages(25), 3);

        let page = Page::new((11..=20).collect::<Vec<i32>>(), 25, req);
        assert_eq!(page.items.first(), Some(&11));
        assert_eq!(page.items.last(), Some(&20));
        assert_eq!(page.pages, 3);
    }

    #[test]
    fn test_pages_edge_cases() {
        // ---
        let req = PageRequest::new(None, Some(10));
        assert_eq!(req.pages(0), 0);
        assert_eq!(req.pages(10), 1);
        assert_eq!(req.pages(11), 2);
    }
}
