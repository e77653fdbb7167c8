//! Model prediction models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::condition::WeatherCondition;
use super::observation::PhysicalField;
use crate::types::Location;

/// Source tag for conditions read straight from observations
pub const OBSERVATION_SOURCE: &str = "NASA POWER";

/// The six physical target values in physical units
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetValues {
    pub clear_sky_radiation: f64,
    pub surface_pressure: f64,
    pub temperature: f64,
    pub specific_humidity: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
}

impl TargetValues {
    pub fn set(&mut self, field: PhysicalField, value: f64) {
        match field {
            PhysicalField::ClearSkyRadiation => self.clear_sky_radiation = value,
            PhysicalField::SurfacePressure => self.surface_pressure = value,
            PhysicalField::Temperature => self.temperature = value,
            PhysicalField::SpecificHumidity => self.specific_humidity = value,
            PhysicalField::WindSpeed => self.wind_speed = value,
            PhysicalField::Precipitation => self.precipitation = value,
        }
    }

    /// Build from a row laid out in `columns` order.
    /// Extra values beyond `columns` are ignored.
    pub fn from_row(columns: &[PhysicalField], row: impl IntoIterator<Item = f64>) -> Self {
        let mut values = Self::default();
        for (field, value) in columns.iter().zip(row) {
            values.set(*field, value);
        }
        values
    }
}

/// One predicted hour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub values: TargetValues,
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub source: String,
}

impl Prediction {
    pub fn new(
        timestamp: NaiveDateTime,
        values: TargetValues,
        condition: WeatherCondition,
        source: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            values,
            condition: condition.label,
            description: condition.description,
            icon: condition.icon,
            source: source.into(),
        }
    }
}

/// Latest observed conditions for a location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentConditions {
    pub location: Location,
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub values: TargetValues,
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_row_follows_column_order() {
        let columns = [
            PhysicalField::Temperature,
            PhysicalField::Precipitation,
            PhysicalField::WindSpeed,
        ];
        let values = TargetValues::from_row(&columns, [31.5, 2.0, 4.5]);

        assert_eq!(values.temperature, 31.5);
        assert_eq!(values.precipitation, 2.0);
        assert_eq!(values.wind_speed, 4.5);
        assert_eq!(values.surface_pressure, 0.0);
    }

    #[test]
    fn test_prediction_serializes_flat() {
        let prediction = Prediction {
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap(),
            values: TargetValues {
                temperature: 29.0,
                ..Default::default()
            },
            condition: "Trời đẹp".to_string(),
            description: "fair weather".to_string(),
            icon: "02d".to_string(),
            source: "LSTM Model".to_string(),
        };

        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["temperature"], 29.0);
        assert_eq!(json["icon"], "02d");
    }
}
