use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use house_price_heatmap::config::Config;
use house_price_heatmap::pipeline;
use house_price_heatmap::render::{
    render_district_heatmap, render_postcode_heatmap, write_page, DistrictHeatmap,
    PostcodeHeatmap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Style {
    /// One marker per postcode district
    Districts,
    /// One point per postcode
    Postcodes,
}

#[derive(Parser)]
#[command(name = "generate-heatmap")]
#[command(about = "Render a static house price heatmap to an HTML file", long_about = None)]
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

    /// Output HTML file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Map style
    #[arg(long, value_enum, default_value = "districts")]
    style: Style,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

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
    let output = cli.output.unwrap_or_else(|| config.heatmap_output.clone());

    let start = Instant::now();
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    let prepared = pipeline::prepare_dataset(&config, &pb).await?;
    info!(
        "Loaded {} sales; {} kept after geocoding",
        prepared.load_report.rows_kept,
        prepared.sales.len()
    );

    let html = match cli.style {
        Style::Districts => {
            let view = DistrictHeatmap::from_sales(
                "UK House Price Heatmap",
                &prepared.sales,
                config.min_district_sales,
            );
            info!("Rendering {} postcode districts", view.districts.len());
            render_district_heatmap(&view)?
        }
        Style::Postcodes => {
            let view = PostcodeHeatmap::from_sales("UK House Price Heatmap", &prepared.sales);
            info!("Rendering {} postcodes", view.points.len());
            render_postcode_heatmap(&view)?
        }
    };

    write_page(&output, &html)?;

    println!("\n✓ Heatmap saved to {}", output.display());
    println!("  Sales mapped:     {}", prepared.sales.len());
    println!("  Rows read:        {}", prepared.load_report.rows_read);
    println!("  Outliers dropped: {}", prepared.load_report.dropped_outliers);
    println!(
        "  Geocoded:         {} dataset, {} cache, {} api, {} estimated",
        prepared.geocode_report.dataset,
        prepared.geocode_report.cache,
        prepared.geocode_report.api,
        prepared.geocode_report.estimated
    );
    println!("  Duration:         {:.1?}", start.elapsed());

    Ok(())
}
