//! Ultrasonic tank-level readings and the distance → volume conversion.

use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

// ---

/// Vertical cylindrical tank with the sensor mounted at the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankGeometry {
    // ---
    pub height_cm: f64,
    pub radius_cm: f64,
}

impl TankGeometry {
    // ---
    /// The tank the deployed sensor sits on.
    pub const DEFAULT: TankGeometry = TankGeometry {
        height_cm: 37.78,
        radius_cm: 16.51,
    };

    /// Returns `None` unless both dimensions are finite and positive.
    pub fn new(height_cm: f64, radius_cm: f64) -> Option<Self> {
        // ---
        let valid = |v: f64| v.is_finite() && v > 0.0;
        (valid(height_cm) && valid(radius_cm)).then_some(TankGeometry {
            height_cm,
            radius_cm,
        })
    }

    pub fn volume_litres(&self, raw_distance_cm: f64) -> f64 {
        convert(raw_distance_cm, self.height_cm, self.radius_cm)
    }
}

/// Convert an ultrasonic distance reading to litres of liquid.
///
/// The sensor measures the empty space between the tank top and the liquid
/// surface, so the liquid column is `tank_height_cm - raw_distance_cm`. A
/// column at or below zero is clamped to 0 litres.
pub fn convert(raw_distance_cm: f64, tank_height_cm: f64, tank_radius_cm: f64) -> f64 {
    // ---
    let liquid_height_cm = tank_height_cm - raw_distance_cm;
    if liquid_height_cm <= 0.0 {
        return 0.0;
    }
    let volume_cm3 = PI * tank_radius_cm.powi(2) * liquid_height_cm;
    volume_cm3 / 1000.0
}

/// Raw reading posted by the sensor gateway.
#[derive(Debug, Deserialize)]
pub struct RawSensorReading {
    // ---
    /// Distance from sensor to liquid surface, in centimetres.
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub reading: f64,
}

/// Accept `12.5` as well as `"12.5"`; some gateways send every value as text.
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| de::Error::custom(format!("reading must be a number, got {text:?}"))),
    }
}

/// Reading ready to be appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensorReading {
    // ---
    pub reading_cm: f64,
    pub volume_litres: f64,
    pub sensor_type: String,
    pub location: String,
}

/// Stored reading returned by the API.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SensorReading {
    // ---
    pub id: i64,
    pub reading_cm: f64,
    pub volume_litres: f64,
    pub sensor_type: String,
    pub location: String,
    pub captured_at: DateTime<Utc>,
}

impl RawSensorReading {
    // ---
    pub fn to_transformed(
        &self,
        tank: &TankGeometry,
        sensor_type: &str,
        location: &str,
    ) -> NewSensorReading {
        // ---
        NewSensorReading {
            reading_cm: self.reading,
            volume_litres: tank.volume_litres(self.reading),
            sensor_type: sensor_type.to_string(),
            location: location.to_string(),
        }
    }
}
