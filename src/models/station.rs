//! Filling-station registry records and request payloads.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

// ---

/// The single contact person embedded in a station record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContactPerson {
    // ---
    #[validate(length(min = 1, message = "contact id is required"))]
    pub id: String,
    #[validate(length(min = 1, message = "contact name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "contact designation is required"))]
    pub designation: String,
    #[validate(email(message = "contact email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "contact phone is required"))]
    pub phone: String,
    /// Shift start as entered, e.g. `06:00`.
    #[validate(length(min = 1, message = "shift start is required"))]
    pub shift_start: String,
    #[validate(length(min = 1, message = "shift end is required"))]
    pub shift_end: String,
}

/// One physical storage tank within a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TankDescriptor {
    // ---
    #[validate(length(min = 1, message = "fuel type is required"))]
    pub fuel_type: String,
    #[validate(range(min = 1, message = "tank count must be at least 1"))]
    pub number_of_tanks: i32,
    #[validate(range(min = 0, message = "tank index cannot be negative"))]
    pub tank_index: i32,
    #[validate(range(min = 0.0, message = "tank capacity cannot be negative"))]
    pub capacity_litres: f64,
}

/// Stored station record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Station {
    // ---
    pub id: Uuid,
    pub identifier: String,
    pub name: String,
    pub location: String,
    pub person: Json<ContactPerson>,
    pub tanks: Json<Vec<TankDescriptor>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload for `POST /station`.
#[derive(Debug, Deserialize, Validate)]
pub struct NewStation {
    // ---
    #[serde(default)]
    #[validate(length(min = 1, message = "Station identifier is required"))]
    pub identifier: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Station name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Station location is required"))]
    pub location: String,
    #[validate(nested)]
    pub person: Option<ContactPerson>,
    #[serde(default, deserialize_with = "tanks_or_empty")]
    #[validate(nested)]
    pub tanks: Vec<TankDescriptor>,
}

/// Partial update payload for `PUT /station/:id`. Absent fields stay as they are.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct StationPatch {
    // ---
    #[validate(length(min = 1, message = "Station identifier cannot be empty"))]
    pub identifier: Option<String>,
    #[validate(length(min = 1, message = "Station name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Station location cannot be empty"))]
    pub location: Option<String>,
    #[validate(nested)]
    pub person: Option<ContactPerson>,
    #[validate(nested)]
    pub tanks: Option<Vec<TankDescriptor>>,
}

/// Query string for `GET /station`.
#[derive(Debug, Default, Deserialize)]
pub struct StationListQuery {
    // ---
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Case-insensitive substring matched against identifier, name,
    /// location and the contact's name or email.
    pub q: Option<String>,
}

/// Canonical form of a station identifier: trimmed and upper-cased.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Escape `ILIKE` wildcards so a search term matches literally.
pub fn escape_like(term: &str) -> String {
    // ---
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl NewStation {
    // ---
    /// Trim text fields and normalize the identifier before validation.
    pub fn normalized(mut self) -> Self {
        // ---
        self.identifier = normalize_identifier(&self.identifier);
        self.name = self.name.trim().to_string();
        self.location = self.location.trim().to_string();
        self
    }
}

impl StationPatch {
    // ---
    pub fn normalized(mut self) -> Self {
        // ---
        self.identifier = self.identifier.as_deref().map(normalize_identifier);
        self.name = self.name.map(|s| s.trim().to_string());
        self.location = self.location.map(|s| s.trim().to_string());
        self
    }
}

impl StationListQuery {
    /// The trimmed search term, or `None` when blank.
    pub fn search_pattern(&self) -> Option<String> {
        // ---
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)))
    }
}

/// Accept any JSON value for `tanks`; anything but an array becomes empty.
fn tanks_or_empty<'de, D>(deserializer: D) -> Result<Vec<TankDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    match serde_json::Value::deserialize(deserializer)? {
        value @ serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(de::Error::custom)
        }
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    fn person_json() -> serde_json::Value {
        // ---
        json!({
            "id": "P-01",
            "name": "Nimal Perera",
            "designation": "Manager",
            "email": "nimal@example.com",
            "phone": "0771234567",
            "shift_start": "06:00",
            "shift_end": "14:00"
        })
    }

    fn parse(body: serde_json::Value) -> NewStation {
        serde_json::from_value::<NewStation>(body).unwrap().normalized()
    }

    #[test]
    fn test_identifier_is_trimmed_and_uppercased() {
        // ---
        assert_eq!(normalize_identifier("  st-001 "), "ST-001");
        assert_eq!(normalize_identifier("St-001"), normalize_identifier("ST-001"));
    }

    #[test]
    fn test_valid_station_passes() {
        // ---
        let station = parse(json!({
            "identifier": " st-001",
            "name": "Colombo North",
            "location": "Colombo",
            "person": person_json(),
            "tanks": [{
                "fuel_type": "Petrol 92",
                "number_of_tanks": 2,
                "tank_index": 1,
                "capacity_litres": 13500.0
            }]
        }));

        assert_eq!(station.identifier, "ST-001");
        assert_eq!(station.tanks.len(), 1);
        assert!(station.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_fail_validation() {
        // ---
        let station = parse(json!({ "identifier": "   ", "person": person_json() }));
        let errors = station.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("identifier"));
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("location"));
    }

    #[test]
    fn test_bad_contact_email_fails_validation() {
        // ---
        let mut person = person_json();
        person["email"] = json!("not-an-email");
        let station = parse(json!({
            "identifier": "ST-002",
            "name": "Kandy",
            "location": "Kandy",
            "person": person
        }));

        assert!(station.validate().is_err());
    }

    #[test]
    fn test_tanks_default_to_empty() {
        // ---
        let absent = parse(json!({ "identifier": "A", "name": "n", "location": "l" }));
        assert!(absent.tanks.is_empty());

        let not_array =
            parse(json!({ "identifier": "A", "name": "n", "location": "l", "tanks": "none" }));
        assert!(not_array.tanks.is_empty());

        let null = parse(json!({ "identifier": "A", "name": "n", "location": "l", "tanks": null }));
        assert!(null.tanks.is_empty());
    }

    #[test]
    fn test_patch_leaves_absent_fields_unset() {
        // ---
        let patch: StationPatch =
            serde_json::from_value(json!({ "name": " Galle Road " })).unwrap();
        let patch = patch.normalized();

        assert_eq!(patch.name.as_deref(), Some("Galle Road"));
        assert!(patch.identifier.is_none());
        assert!(patch.location.is_none());
        assert!(patch.person.is_none());
        assert!(patch.tanks.is_none());
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_patch_rejects_blank_identifier() {
        // ---
        let patch = StationPatch {
            identifier: Some("   ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_search_pattern() {
        // ---
        let blank = StationListQuery { q: Some("  ".into()), ..Default::default() };
        assert_eq!(blank.search_pattern(), None);

        let term = StationListQuery { q: Some(" colombo ".into()), ..Default::default() };
        assert_eq!(term.search_pattern().as_deref(), Some("%colombo%"));

        let wildcard = StationListQuery { q: Some("50%_off".into()), ..Default::default() };
        assert_eq!(wildcard.search_pattern().as_deref(), Some("%50\\%\\_off%"));
    }
}
