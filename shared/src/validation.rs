//! Validation utilities for the weather forecast platform
//!
//! Pure checks over observation sequences and request parameters. Callers map
//! the returned messages into their own error types.

use chrono::Duration;

use crate::models::Observation;

/// Expected spacing between consecutive hourly observations
pub const HOURLY_STEP_MINUTES: i64 = 60;

/// Upper bound on forecast horizon in days
pub const MAX_HORIZON_DAYS: u32 = 31;

// ============================================================================
// Coordinate Validations
// ============================================================================

/// Validate latitude/longitude are within WGS84 bounds
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), &'static str> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

// ============================================================================
// Observation Sequence Validations
// ============================================================================

/// Index of the first observation whose timestamp is not strictly after its
/// predecessor, if any
pub fn find_order_violation(observations: &[Observation]) -> Option<usize> {
    observations
        .windows(2)
        .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        .map(|i| i + 1)
}

/// A spacing irregularity between two consecutive observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacingGap {
    /// Index of the later observation of the pair
    pub index: usize,
    pub actual_minutes: i64,
}

/// First pair of consecutive observations not spaced exactly `step` apart
pub fn find_spacing_gap(observations: &[Observation], step: Duration) -> Option<SpacingGap> {
    observations.windows(2).enumerate().find_map(|(i, pair)| {
        let delta = pair[1].timestamp - pair[0].timestamp;
        (delta != step).then(|| SpacingGap {
            index: i + 1,
            actual_minutes: delta.num_minutes(),
        })
    })
}

// ============================================================================
// Request Parameter Validations
// ============================================================================

/// Validate a forecast horizon in days
pub fn validate_horizon_days(days: u32) -> Result<(), &'static str> {
    if days == 0 {
        return Err("Forecast horizon must be at least 1 day");
    }
    if days > MAX_HORIZON_DAYS {
        return Err("Forecast horizon exceeds 31 days");
    }
    Ok(())
}

/// Validate a location name is non-blank
pub fn validate_location_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Location name must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour_offset: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(hour_offset)
    }

    fn obs(timestamp: NaiveDateTime) -> Observation {
        Observation {
            timestamp,
            latitude: 16.0544,
            longitude: 108.2022,
            temperature: Some(28.0),
            specific_humidity: Some(0.017),
            surface_pressure: Some(1008.0),
            wind_speed: Some(2.5),
            precipitation: Some(0.0),
            clear_sky_radiation: Some(0.0),
        }
    }

    // ========================================================================
    // Coordinate Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_coordinates_valid() {
        assert!(validate_coordinates(21.0285, 105.8542).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_validate_coordinates_invalid() {
        assert!(validate_coordinates(90.1, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    // ========================================================================
    // Sequence Validation Tests
    // ========================================================================

    #[test]
    fn test_order_violation_detects_duplicate_timestamp() {
        let observations = vec![obs(at(0)), obs(at(1)), obs(at(1)), obs(at(2))];
        assert_eq!(find_order_violation(&observations), Some(2));
    }

    #[test]
    fn test_order_violation_none_for_increasing() {
        let observations: Vec<_> = (0..5).map(|h| obs(at(h))).collect();
        assert_eq!(find_order_violation(&observations), None);
        assert_eq!(find_order_violation(&[]), None);
    }

    #[test]
    fn test_spacing_gap_reports_first_irregular_pair() {
        let observations = vec![obs(at(0)), obs(at(1)), obs(at(4)), obs(at(5))];
        let gap = find_spacing_gap(&observations, Duration::minutes(HOURLY_STEP_MINUTES));
        assert_eq!(
            gap,
            Some(SpacingGap {
                index: 2,
                actual_minutes: 180
            })
        );
    }

    #[test]
    fn test_spacing_gap_none_for_regular_series() {
        let observations: Vec<_> = (0..48).map(|h| obs(at(h))).collect();
        assert!(find_spacing_gap(&observations, Duration::hours(1)).is_none());
    }

    // ========================================================================
    // Parameter Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_horizon_days() {
        assert!(validate_horizon_days(7).is_ok());
        assert!(validate_horizon_days(0).is_err());
        assert!(validate_horizon_days(32).is_err());
    }

    #[test]
    fn test_validate_location_name() {
        assert!(validate_location_name("Hà Nội").is_ok());
        assert!(validate_location_name("   ").is_err());
    }
}
