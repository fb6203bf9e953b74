use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

use marathon_importer::config::Config;
use marathon_importer::logging;
use marathon_importer::pipeline::{ImportOptions, ImportPipeline};
use marathon_importer::storage::{InMemoryStorage, Storage};

#[derive(Parser)]
#[command(name = "marathon_importer")]
#[command(about = "Marathon event data importer")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import events from the Two Centuries of UM Races CSV dataset
    Import {
        /// Path to the CSV dataset (defaults to config, then the bundled filename)
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Limit the number of unique events to import
        #[arg(long)]
        limit: Option<usize>,
        /// Preview the events without writing any records
        #[arg(long)]
        dry_run: bool,
        /// Directory for the JSON run report
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Import {
            csv,
            limit,
            dry_run,
            report_dir,
        } => {
            println!("🏃 Running marathon event import...");

            let mut options =
                ImportOptions::new(csv.unwrap_or_else(|| PathBuf::from(&config.import.csv_path)));
            options.limit = limit.or(config.import.limit);
            options.dry_run = dry_run;
            options.report_dir =
                report_dir.or_else(|| config.import.report_dir.as_deref().map(PathBuf::from));

            let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
            let pipeline = ImportPipeline::new(storage);

            match pipeline.run(&options).await {
                Ok(summary) => {
                    println!("\n📊 Import results:");
                    println!("   Rows read: {}", summary.total_rows);
                    println!("   Rows parsed: {}", summary.parsed_rows);
                    println!("   Unique events: {}", summary.unique_events);
                    if !summary.dry_run {
                        println!("   Created: {}", summary.created);
                        println!("   Updated: {}", summary.updated);
                        if summary.failed > 0 {
                            println!("   Failed: {}", summary.failed);
                        }
                    }
                }
                Err(e) => {
                    error!("Import failed: {}", e);
                    println!("❌ Import failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
