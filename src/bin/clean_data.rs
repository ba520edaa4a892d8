use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use house_price_heatmap::config::Config;
use house_price_heatmap::importers::{partition_data_files, remove_files};

#[derive(Parser)]
#[command(name = "clean-data")]
#[command(about = "Delete data files outside London and the Greater London belt", long_about = None)]
struct Cli {
    /// Directory containing *_link_*.csv files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => Config::from_env()?.data_dir,
    };

    info!("Scanning {}", data_dir.display());
    let partition = partition_data_files(&data_dir)?;

    println!("Files to keep:   {}", partition.keep.len());
    println!("Files to delete: {}", partition.remove.len());

    if partition.remove.is_empty() {
        println!("Nothing to delete.");
        return Ok(());
    }

    println!("\nSample files to delete:");
    for path in partition.remove.iter().take(10) {
        if let Some(name) = path.file_name() {
            println!("  {}", name.to_string_lossy());
        }
    }
    if partition.remove.len() > 10 {
        println!("  ... and {} more", partition.remove.len() - 10);
    }

    if !cli.yes {
        println!(
            "\n⚠️  This will permanently delete {} files from {}.",
            partition.remove.len(),
            data_dir.display()
        );
        println!("\nContinue? [y/N]: ");

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cleanup cancelled.");
            return Ok(());
        }
    }

    let removed = remove_files(&partition.remove);
    println!(
        "\n✓ Deleted {} files; {} London area files remain",
        removed,
        partition.keep.len()
    );

    Ok(())
}
