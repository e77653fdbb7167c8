//! Weather condition classification
//!
//! Maps physical values to a human-readable condition. The multi-factor
//! classifier evaluates each dimension independently and joins every bucket
//! that fires; the binary classifier used for current conditions looks only at
//! clear-sky radiation.

use serde::{Deserialize, Serialize};

/// Label used when no threshold bucket fires
pub const FAIR_WEATHER_LABEL: &str = "Trời đẹp";
pub const FAIR_WEATHER_DESCRIPTION: &str = "fair weather";

const LABEL_SEPARATOR: &str = ", ";

/// A single threshold bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionTag {
    /// > 35 °C
    Scorching,
    /// > 30 °C
    Sunny,
    /// < 15 °C
    Cold,
    /// < 20 °C
    Cool,
    /// > 7.5 mm
    HeavyRain,
    /// > 2.5 mm
    ModerateRain,
    /// > 0 mm
    LightRain,
    /// > 10.8 m/s
    StrongWind,
    /// > 5.4 m/s
    Windy,
    /// > 80 %
    Humid,
    /// < 40 %
    Dry,
    /// < 1000 hPa
    LowPressure,
    /// > 1020 hPa
    HighPressure,
}

impl ConditionTag {
    /// Vietnamese display label
    pub fn label(&self) -> &'static str {
        match self {
            ConditionTag::Scorching => "Nắng nóng",
            ConditionTag::Sunny => "Nắng",
            ConditionTag::Cold => "Lạnh",
            ConditionTag::Cool => "Mát",
            ConditionTag::HeavyRain => "Mưa to",
            ConditionTag::ModerateRain => "Mưa vừa",
            ConditionTag::LightRain => "Mưa nhẹ",
            ConditionTag::StrongWind => "Gió mạnh",
            ConditionTag::Windy => "Gió",
            ConditionTag::Humid => "Ẩm ướt",
            ConditionTag::Dry => "Khô",
            ConditionTag::LowPressure => "Áp thấp",
            ConditionTag::HighPressure => "Áp cao",
        }
    }

    /// English description
    pub fn description(&self) -> &'static str {
        match self {
            ConditionTag::Scorching => "scorching heat",
            ConditionTag::Sunny => "sunny",
            ConditionTag::Cold => "cold",
            ConditionTag::Cool => "cool",
            ConditionTag::HeavyRain => "heavy rain",
            ConditionTag::ModerateRain => "moderate rain",
            ConditionTag::LightRain => "light rain",
            ConditionTag::StrongWind => "strong wind",
            ConditionTag::Windy => "windy",
            ConditionTag::Humid => "humid",
            ConditionTag::Dry => "dry",
            ConditionTag::LowPressure => "low pressure",
            ConditionTag::HighPressure => "high pressure",
        }
    }
}

impl std::fmt::Display for ConditionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Physical values consumed by the multi-factor classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionInputs {
    /// °C
    pub temperature: f64,
    /// mm
    pub precipitation: f64,
    /// m/s
    pub wind_speed: f64,
    /// Humidity as a fraction; scaled by 100 before bucketing
    pub humidity_fraction: f64,
    /// hPa
    pub pressure: f64,
}

/// Classified condition with display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub label: String,
    pub description: String,
    pub icon: String,
    pub tags: Vec<ConditionTag>,
}

fn temperature_bucket(temperature: f64) -> Option<ConditionTag> {
    if temperature > 35.0 {
        Some(ConditionTag::Scorching)
    } else if temperature > 30.0 {
        Some(ConditionTag::Sunny)
    } else if temperature < 15.0 {
        Some(ConditionTag::Cold)
    } else if temperature < 20.0 {
        Some(ConditionTag::Cool)
    } else {
        None
    }
}

fn precipitation_bucket(precipitation: f64) -> Option<ConditionTag> {
    if precipitation > 7.5 {
        Some(ConditionTag::HeavyRain)
    } else if precipitation > 2.5 {
        Some(ConditionTag::ModerateRain)
    } else if precipitation > 0.0 {
        Some(ConditionTag::LightRain)
    } else {
        None
    }
}

fn wind_bucket(wind_speed: f64) -> Option<ConditionTag> {
    // 10.8 m/s ≈ 39 km/h, 5.4 m/s ≈ 20 km/h
    if wind_speed > 10.8 {
        Some(ConditionTag::StrongWind)
    } else if wind_speed > 5.4 {
        Some(ConditionTag::Windy)
    } else {
        None
    }
}

fn humidity_bucket(humidity_fraction: f64) -> Option<ConditionTag> {
    let humidity_percent = humidity_fraction * 100.0;
    if humidity_percent > 80.0 {
        Some(ConditionTag::Humid)
    } else if humidity_percent < 40.0 {
        Some(ConditionTag::Dry)
    } else {
        None
    }
}

fn pressure_bucket(pressure: f64) -> Option<ConditionTag> {
    if pressure < 1000.0 {
        Some(ConditionTag::LowPressure)
    } else if pressure > 1020.0 {
        Some(ConditionTag::HighPressure)
    } else {
        None
    }
}

/// Pick the icon for the most significant fired bucket
fn icon_for(tags: &[ConditionTag]) -> &'static str {
    let has = |candidates: &[ConditionTag]| tags.iter().any(|t| candidates.contains(t));

    if has(&[ConditionTag::HeavyRain]) {
        "09d"
    } else if has(&[ConditionTag::ModerateRain, ConditionTag::LightRain]) {
        "10d"
    } else if has(&[ConditionTag::Scorching, ConditionTag::Sunny]) {
        "01d"
    } else if has(&[ConditionTag::StrongWind, ConditionTag::Windy]) {
        "50d"
    } else if has(&[ConditionTag::Cold, ConditionTag::Cool]) {
        "13d"
    } else if has(&[ConditionTag::Humid]) {
        "04d"
    } else {
        "02d"
    }
}

/// Classify physical values into a combined condition label.
///
/// Buckets are evaluated per dimension in the order temperature,
/// precipitation, wind, humidity, pressure. Within a dimension at most one
/// bucket fires; across dimensions they accumulate.
pub fn classify_condition(inputs: &ConditionInputs) -> WeatherCondition {
    let tags: Vec<ConditionTag> = [
        temperature_bucket(inputs.temperature),
        precipitation_bucket(inputs.precipitation),
        wind_bucket(inputs.wind_speed),
        humidity_bucket(inputs.humidity_fraction),
        pressure_bucket(inputs.pressure),
    ]
    .into_iter()
    .flatten()
    .collect();

    if tags.is_empty() {
        return WeatherCondition {
            label: FAIR_WEATHER_LABEL.to_string(),
            description: FAIR_WEATHER_DESCRIPTION.to_string(),
            icon: icon_for(&tags).to_string(),
            tags,
        };
    }

    let label = tags
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR);
    let description = tags
        .iter()
        .map(|t| t.description())
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR);

    WeatherCondition {
        label,
        description,
        icon: icon_for(&tags).to_string(),
        tags,
    }
}

/// Binary classifier for near-real-time lookups: sunlight or not.
/// Independent of [`classify_condition`].
pub fn classify_current(clear_sky_radiation: f64) -> WeatherCondition {
    let (label, description, icon) = if clear_sky_radiation > 0.0 {
        ("Clear", "clear sky", "01d")
    } else {
        ("Clouds", "clouds", "04d")
    };

    WeatherCondition {
        label: label.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        tags: Vec::new(),
    }
}
