use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use house_price_heatmap::app::Application;
use house_price_heatmap::config::Config;

#[derive(Parser)]
#[command(name = "house-price-dashboard")]
#[command(about = "Serve the interactive house price dashboard", long_about = None)]
struct Cli {
    /// Directory containing *_link_*.csv files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Maximum number of files to load
    #[arg(long)]
    max_files: Option<usize>,

    /// Maximum rows read from each file
    #[arg(long)]
    max_rows_per_file: Option<usize>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,house_price_heatmap=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(max_files) = cli.max_files {
        config.max_files = max_files;
    }
    if let Some(max_rows) = cli.max_rows_per_file {
        config.max_rows_per_file = max_rows;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }
    info!("Starting house price dashboard with config: {:?}", config);

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    Ok(())
}
