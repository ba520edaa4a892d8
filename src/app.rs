use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::pipeline::{self, PreparedDataset};
use crate::services::DashboardService;

/// Running dashboard server
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub local_addr: std::net::SocketAddr,
}

impl Application {
    /// Prepare the dataset and start serving the dashboard
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Preparing dashboard data");
        let spinner = ProgressBar::new_spinner();
        let prepared = pipeline::prepare_dataset(&config, &spinner).await?;
        spinner.finish_and_clear();

        Self::serve(&config, prepared).await
    }

    /// Start serving an already prepared dataset
    pub async fn serve(
        config: &Config,
        prepared: PreparedDataset,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        info!(
            "Serving {} sales ({} rows read, {} dropped during geocoding)",
            prepared.sales.len(),
            prepared.load_report.rows_read,
            prepared.geocode_report.dropped()
        );

        let dashboard_service =
            DashboardService::new(Arc::new(prepared.sales), config.min_district_sales);
        let app_state = AppState { dashboard_service };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Dashboard listening on http://{}", local_addr);

        let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

        Ok(Self {
            server_handle,
            local_addr,
        })
    }

    /// Run until the server stops
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
