//! Multi-day forecast grouping

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::prediction::Prediction;
use crate::types::Location;

/// Default number of calendar days in a forecast
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

/// Hourly predictions for one calendar date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub hourly: Vec<Prediction>,
}

/// Grouped forecast for a single location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationForecast {
    pub location: Location,
    pub forecast: Vec<ForecastDay>,
}

/// Groups time-ordered predictions into per-date buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastAssembler {
    horizon_days: u32,
}

impl Default for ForecastAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON_DAYS)
    }
}

impl ForecastAssembler {
    pub fn new(horizon_days: u32) -> Self {
        Self { horizon_days }
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Group predictions by calendar date of their timestamp.
    ///
    /// Input order is preserved inside each day. Predictions whose date is
    /// `horizon_days` or more after the first prediction's date are dropped,
    /// along with everything after them.
    pub fn assemble(&self, predictions: Vec<Prediction>) -> Vec<ForecastDay> {
        let mut days: Vec<ForecastDay> = Vec::new();
        let Some(first_date) = predictions.first().map(|p| p.timestamp.date()) else {
            return days;
        };

        let mut current: Option<ForecastDay> = None;
        for prediction in predictions {
            let date = prediction.timestamp.date();
            if (date - first_date).num_days() >= i64::from(self.horizon_days) {
                break;
            }

            match current.as_mut() {
                Some(day) if day.date == date => day.hourly.push(prediction),
                _ => {
                    if let Some(finished) = current.take() {
                        days.push(finished);
                    }
                    current = Some(ForecastDay {
                        date,
                        hourly: vec![prediction],
                    });
                }
            }
        }

        if let Some(finished) = current {
            days.push(finished);
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prediction::TargetValues;
    use chrono::{Duration, NaiveDateTime};
    use proptest::prelude::*;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hourly(from: NaiveDateTime, count: usize) -> Vec<Prediction> {
        (0..count)
            .map(|i| Prediction {
                timestamp: from + Duration::hours(i as i64),
                values: TargetValues {
                    temperature: i as f64,
                    ..Default::default()
                },
                condition: "Trời đẹp".to_string(),
                description: "fair weather".to_string(),
                icon: "02d".to_string(),
                source: "test".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_empty_input_gives_empty_forecast() {
        assert!(ForecastAssembler::default().assemble(Vec::new()).is_empty());
    }

    #[test]
    fn test_ten_days_truncated_to_seven() {
        let days = ForecastAssembler::new(7).assemble(hourly(start(), 240));

        assert_eq!(days.len(), 7);
        assert!(days.iter().all(|d| d.hourly.len() == 24));
        assert_eq!(days[0].date, start().date());
        assert_eq!(days[6].date, start().date() + Duration::days(6));
    }

    #[test]
    fn test_partial_first_day() {
        let from = start() + Duration::hours(20);
        let days = ForecastAssembler::new(2).assemble(hourly(from, 30));

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].hourly.len(), 4);
        assert_eq!(days[1].hourly.len(), 24);
    }

    #[test]
    fn test_order_preserved_within_day() {
        let days = ForecastAssembler::new(1).assemble(hourly(start(), 24));
        let temps: Vec<f64> = days[0].hourly.iter().map(|p| p.values.temperature).collect();
        assert_eq!(temps, (0..24).map(|i| i as f64).collect::<Vec<_>>());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_day_count_bounded(hours in 0usize..400, horizon in 1u32..10, offset in 0i64..24) {
            let from = start() + Duration::hours(offset);
            let input = hourly(from, hours);
            let days = ForecastAssembler::new(horizon).assemble(input);

            prop_assert!(days.len() <= horizon as usize);
            for pair in days.windows(2) {
                prop_assert!(pair[0].date < pair[1].date);
            }
            for day in &days {
                prop_assert!(day.hourly.iter().all(|p| p.timestamp.date() == day.date));
            }
        }
    }
}
