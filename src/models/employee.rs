//! Employee roster.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "employee_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EmployeeStatus {
    #[default]
    Active,
    OnBreak,
    Offline,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Employee {
    // ---
    pub id: Uuid,
    /// External identifier printed on the employee's QR badge.
    pub employee_code: String,
    pub name: String,
    pub role: String,
    pub status: EmployeeStatus,
    pub shift: String,
    pub join_date: NaiveDate,
    pub color: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewEmployee {
    // ---
    #[validate(length(min = 1, message = "Employee code is required"))]
    pub employee_code: String,
    #[validate(length(min = 1, message = "Employee name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Employee role is required"))]
    pub role: String,
    #[serde(default)]
    pub status: EmployeeStatus,
    #[validate(length(min = 1, message = "Employee shift is required"))]
    pub shift: String,
    pub join_date: NaiveDate,
    #[serde(default = "default_color")]
    pub color: String,
    pub avatar: Option<String>,
}

/// Partial update for `PUT /employees/:id`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EmployeePatch {
    // ---
    #[validate(length(min = 1, message = "Employee code cannot be empty"))]
    pub employee_code: Option<String>,
    #[validate(length(min = 1, message = "Employee name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Employee role cannot be empty"))]
    pub role: Option<String>,
    pub status: Option<EmployeeStatus>,
    #[validate(length(min = 1, message = "Employee shift cannot be empty"))]
    pub shift: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub color: Option<String>,
    pub avatar: Option<String>,
}

fn default_color() -> String {
    "#3b82f6".to_string()
}

impl NewEmployee {
    pub fn normalized(mut self) -> Self {
        // ---
        self.employee_code = self.employee_code.trim().to_string();
        self.name = self.name.trim().to_string();
        self.role = self.role.trim().to_string();
        self.shift = self.shift.trim().to_string();
        self
    }
}

impl EmployeePatch {
    pub fn normalized(mut self) -> Self {
        // ---
        let trim = |s: String| s.trim().to_string();
        self.employee_code = self.employee_code.map(trim);
        self.name = self.name.map(trim);
        self.role = self.role.map(trim);
        self.shift = self.shift.map(trim);
        self
    }
}
