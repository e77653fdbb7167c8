//! Raw hourly observation models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved value marking a missing raw reading
pub const MISSING_VALUE_SENTINEL: f64 = -999.0;

/// Replace the missing-value sentinel with zero
pub fn substitute_sentinel(value: f64) -> f64 {
    if value == MISSING_VALUE_SENTINEL {
        0.0
    } else {
        value
    }
}

/// Physical quantities measured at a point, keyed by their source column names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalField {
    /// Clear-sky surface shortwave downward irradiance
    #[serde(rename = "CLRSKY_SFC_SW_DWN")]
    ClearSkyRadiation,
    /// Surface pressure
    #[serde(rename = "PS")]
    SurfacePressure,
    /// Temperature at 2 meters, °C
    #[serde(rename = "T2M")]
    Temperature,
    /// Specific humidity at 2 meters
    #[serde(rename = "QV2M")]
    SpecificHumidity,
    /// Wind speed at 10 meters, m/s
    #[serde(rename = "WS10M")]
    WindSpeed,
    /// Corrected total precipitation, mm
    #[serde(rename = "PRECTOTCORR")]
    Precipitation,
}

impl PhysicalField {
    /// All fields in target order
    pub const ALL: [PhysicalField; 6] = [
        PhysicalField::ClearSkyRadiation,
        PhysicalField::SurfacePressure,
        PhysicalField::Temperature,
        PhysicalField::SpecificHumidity,
        PhysicalField::WindSpeed,
        PhysicalField::Precipitation,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            PhysicalField::ClearSkyRadiation => "CLRSKY_SFC_SW_DWN",
            PhysicalField::SurfacePressure => "PS",
            PhysicalField::Temperature => "T2M",
            PhysicalField::SpecificHumidity => "QV2M",
            PhysicalField::WindSpeed => "WS10M",
            PhysicalField::Precipitation => "PRECTOTCORR",
        }
    }

    /// Whether an observation is unusable without this reading.
    /// Radiation is absent at night for some sources and defaults to zero.
    pub fn is_required(&self) -> bool {
        !matches!(self, PhysicalField::ClearSkyRadiation)
    }
}

impl fmt::Display for PhysicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Column name that does not match any known field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown column: {0}")]
pub struct UnknownColumn(pub String);

impl FromStr for PhysicalField {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhysicalField::ALL
            .into_iter()
            .find(|field| field.column_name() == s)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

/// One hourly record for a geographic point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: Option<f64>,
    pub specific_humidity: Option<f64>,
    pub surface_pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
    pub clear_sky_radiation: Option<f64>,
}

impl Observation {
    /// Raw reading as recorded, sentinel included
    pub fn raw(&self, field: PhysicalField) -> Option<f64> {
        match field {
            PhysicalField::ClearSkyRadiation => self.clear_sky_radiation,
            PhysicalField::SurfacePressure => self.surface_pressure,
            PhysicalField::Temperature => self.temperature,
            PhysicalField::SpecificHumidity => self.specific_humidity,
            PhysicalField::WindSpeed => self.wind_speed,
            PhysicalField::Precipitation => self.precipitation,
        }
    }

    /// Reading with the missing-value sentinel replaced by zero
    pub fn value(&self, field: PhysicalField) -> Option<f64> {
        self.raw(field).map(substitute_sentinel)
    }

    /// Reading after sentinel substitution, with optional fields defaulted to zero.
    /// Returns `None` only when a required field is absent.
    pub fn usable_value(&self, field: PhysicalField) -> Option<f64> {
        match self.value(field) {
            Some(v) => Some(v),
            None if !field.is_required() => Some(0.0),
            None => None,
        }
    }
}
