pub mod dashboard_service;

pub use dashboard_service::{
    DashboardError, DashboardFilter, DashboardOptions, DashboardService, DashboardView,
};
