use clap::Parser;
use tracing::info;

use house_price_heatmap::config::Config;
use house_price_heatmap::geocoding::{
    CoordinateCache, Geocoder, PostcodesIoClient, PrefixEstimator,
};
use house_price_heatmap::pipeline::load_postcode_dataset;
use house_price_heatmap::postcode;

#[derive(Parser)]
#[command(name = "lookup-postcodes")]
#[command(about = "Resolve postcodes to coordinates and show where each came from", long_about = None)]
struct Cli {
    /// Postcodes to resolve (e.g. "SW1A 1AA")
    #[arg(required = true)]
    postcodes: Vec<String>,

    /// Query postcodes.io for postcodes missing from the dataset and cache
    #[arg(long)]
    api: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let mut geocoder = Geocoder::new(
        CoordinateCache::load(config.coords_cache_file.clone()),
        PrefixEstimator::new(),
    )
    .with_estimation(config.estimate_missing_coordinates);

    if let Some(dataset) = load_postcode_dataset(&config).await {
        info!("Using postcode dataset with {} entries", dataset.len());
        geocoder = geocoder.with_dataset(dataset);
    }

    if cli.api || config.geocode_with_api {
        geocoder = geocoder.with_api(PostcodesIoClient::new(config.postcodes_io_url.clone()));
        geocoder.prefetch(&cli.postcodes).await;
    }

    println!("{:<10} {:>10} {:>10}  source", "postcode", "latitude", "longitude");
    for pc in &cli.postcodes {
        let display = postcode::display_form(pc).unwrap_or_else(|| pc.clone());
        match geocoder.resolve(pc) {
            Some(resolution) => println!(
                "{:<10} {:>10.5} {:>10.5}  {}",
                display,
                resolution.coordinates.latitude,
                resolution.coordinates.longitude,
                resolution.source.as_str()
            ),
            None => println!("{:<10} {:>10} {:>10}  unresolved", display, "-", "-"),
        }
    }

    if geocoder.save_cache()? {
        info!("Coordinate cache updated");
    }

    Ok(())
}
