use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::models::DatasetStatistics;
use crate::render::render_dashboard_shell;
use crate::services::{DashboardFilter, DashboardOptions, DashboardService, DashboardView};

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub sales_loaded: usize,
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/options", get(get_options))
        .route("/dashboard", get(get_dashboard))
        .route("/statistics", get(get_statistics))
        .with_state(state.clone());

    Router::new()
        .route("/", get(index))
        .with_state(state)
        .nest("/api/v1", api_routes)
}

#[instrument(skip(state))]
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
        sales_loaded: state.dashboard_service.sale_count(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state))]
async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let options = state.dashboard_service.options();
    let page = render_dashboard_shell(&options).map_err(|e| {
        error!("Failed to render dashboard page: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Html(page))
}

#[instrument(skip(state))]
async fn get_options(State(state): State<AppState>) -> Json<DashboardOptions> {
    let options = state.dashboard_service.options();
    debug!(
        "Serving dashboard options ({} areas, price {}..{})",
        options.areas.len(),
        options.price_min,
        options.price_max
    );
    Json(options)
}

#[instrument(skip(state))]
async fn get_dashboard(
    State(state): State<AppState>,
    Query(filter): Query<DashboardFilter>,
) -> Result<Json<DashboardView>, StatusCode> {
    let view = state.dashboard_service.view(&filter).map_err(|e| {
        warn!("Rejected dashboard filter: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    match &view.summary {
        Some(summary) => info!(
            "Dashboard view: {} sales, {} districts",
            summary.total_sales, summary.districts_shown
        ),
        None => info!("Dashboard view: no sales match filter"),
    }

    Ok(Json(view))
}

#[instrument(skip(state))]
async fn get_statistics(State(state): State<AppState>) -> Json<DatasetStatistics> {
    Json(state.dashboard_service.statistics())
}
