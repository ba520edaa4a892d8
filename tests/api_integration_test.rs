// API integration tests that verify the dashboard endpoints against an in-memory dataset

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use house_price_heatmap::api::{create_router, AppState};
use house_price_heatmap::services::DashboardService;

fn test_state() -> AppState {
    let sales = vec![
        common::geocoded_sale("N2 9QL", 5000.0, "Barnet"),
        common::geocoded_sale("N2 8AB", 6000.0, "Barnet"),
        common::geocoded_sale("N2 0PL", 7000.0, "Barnet"),
        common::geocoded_sale("N3 1AA", 3000.0, "Barnet"),
        common::geocoded_sale("N3 2BB", 3500.0, "Barnet"),
        common::geocoded_sale("N3 3CC", 4000.0, "Barnet"),
        common::geocoded_sale("NW3 1AA", 9000.0, "Camden"),
        common::geocoded_sale("NW3 2BB", 9500.0, "Camden"),
        common::geocoded_sale("NW3 3CC", 12000.0, "Camden"),
    ];

    AppState {
        dashboard_service: DashboardService::new(Arc::new(sales), 3),
    }
}

async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
    let app = create_router(test_state());
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(uri).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = get_json("/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["sales_loaded"], 9);
}

#[tokio::test]
async fn test_index_serves_dashboard_page() {
    let (status, body) = get("/").await;
    let html = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<html"));
    assert!(html.contains("/api/v1/dashboard"));
    assert!(html.contains("Barnet"));
    assert!(html.contains("Camden"));
}

#[tokio::test]
async fn test_options_endpoint() {
    let (status, json) = get_json("/api/v1/options").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["price_min"], 3000.0);
    assert_eq!(json["price_max"], 12000.0);
    assert_eq!(json["default_range"][0], 3000.0);
    assert_eq!(json["default_range"][1], 8000.0);
    assert_eq!(json["step"], 100.0);
    assert_eq!(json["areas"], serde_json::json!(["Barnet", "Camden"]));
    assert_eq!(json["marks"][0]["label"], "£0");
}

#[tokio::test]
async fn test_dashboard_default_filter() {
    let (status, json) = get_json("/api/v1/dashboard").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["filter_area"], "all");
    assert_eq!(json["message"], Value::Null);

    let districts = json["districts"].as_array().unwrap();
    let names: Vec<&str> = districts
        .iter()
        .map(|d| d["district"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["N2", "N3"]);
    assert_eq!(districts[0]["average_price_per_sqm"], 6000.0);
    assert_eq!(districts[0]["sale_count"], 3);
    assert!(districts[0]["marker_size"].as_f64().unwrap() >= 8.0);

    assert_eq!(json["summary"]["total_sales"], 6);
    assert_eq!(json["summary"]["districts_shown"], 2);
    assert_eq!(json["area_comparison"][0]["area"], "Barnet");
}

#[tokio::test]
async fn test_dashboard_filters_by_area_and_price() {
    let (status, json) =
        get_json("/api/v1/dashboard?min_price=8000&max_price=15000&area=Camden").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["filter_area"], "Camden");
    assert_eq!(json["summary"]["total_sales"], 3);
    assert_eq!(json["districts"][0]["district"], "NW3");
    // fewer than five sales per area
    assert_eq!(json["area_comparison"], serde_json::json!([]));
}

#[tokio::test]
async fn test_dashboard_unknown_area_reports_no_data() {
    let (status, json) = get_json("/api/v1/dashboard?area=Nowhere").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "No data available for selected filters");
    assert_eq!(json["summary"], Value::Null);
    assert_eq!(json["districts"], serde_json::json!([]));
}

#[tokio::test]
async fn test_dashboard_rejects_inverted_range() {
    let (status, _) = get_json("/api/v1/dashboard?min_price=9000&max_price=1000").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_statistics_endpoint() {
    let (status, json) = get_json("/api/v1/statistics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_records"], 9);
    assert_eq!(json["unique_postcodes"], 9);
    assert_eq!(json["area_count"], 2);
    assert_eq!(json["price"]["min"], 3000.0);
    assert_eq!(json["price"]["max"], 12000.0);
    assert_eq!(json["property_types"]["T"], 9);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (status, _) = get("/api/v1/nonexistent").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
