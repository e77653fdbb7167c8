//! Multi-location runner tests

mod common;

use std::sync::Arc;

use common::*;
use shared::Location;
use weather_forecast_backend::services::{ForecastRunner, LocationReport, LocationRequest};

fn request(name: &str, count: usize) -> LocationRequest {
    LocationRequest {
        location: Location::new(name, LATITUDE, LONGITUDE),
        observations: hourly_observations(count),
    }
}

fn runner() -> ForecastRunner {
    ForecastRunner::new(Arc::new(pipeline(4, 1)))
}

#[tokio::test]
async fn test_reports_follow_request_order() {
    let names = ["Hà Nội", "Đà Nẵng", "Huế", "Cần Thơ", "Lâm Đồng"];
    let requests = names.iter().map(|n| request(n, 12)).collect();

    let reports = runner().run(requests).await;

    let got: Vec<&str> = reports.iter().map(|r| r.location().name.as_str()).collect();
    assert_eq!(got, names);
    assert!(reports.iter().all(LocationReport::is_completed));
}

#[tokio::test]
async fn test_failure_is_isolated() {
    let requests = vec![request("Hà Nội", 12), request("Sơn La", 2), request("Huế", 12)];

    let reports = runner().run(requests).await;

    assert!(reports[0].is_completed());
    assert!(reports[2].is_completed());
    match &reports[1] {
        LocationReport::Failed { location, error } => {
            assert_eq!(location.name, "Sơn La");
            assert_eq!(error.code, "INSUFFICIENT_DATA");
            assert!(!error.message_vi.is_empty());
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_run() {
    assert!(runner().run(Vec::new()).await.is_empty());
}

#[tokio::test]
async fn test_report_serialization_is_tagged() {
    let reports = runner()
        .run(vec![request("Hà Nội", 12), request("Huế", 1)])
        .await;
    let json = serde_json::to_value(&reports).unwrap();

    assert_eq!(json[0]["status"], "completed");
    assert_eq!(json[0]["location"]["name"], "Hà Nội");
    assert!(json[0]["forecast"].is_array());
    assert_eq!(json[1]["status"], "failed");
    assert_eq!(json[1]["error"]["code"], "INSUFFICIENT_DATA");
}
