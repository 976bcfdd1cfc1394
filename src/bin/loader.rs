//! Loader binary entry point.
//!
//! Replaces the article collection with the contents of a DBLP dataset file
//! and rebuilds its indexes. Any failure ends the process.
//!
//! # Examples
//!
//! ```bash
//! loader dblp-ref-0.json 27017
//! loader dblp.json 27017 --host db.local --mongoimport /opt/mongo/bin/mongoimport
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dblp_browser::{
    ingestion::{BulkLoader, MongoImport},
    storage::{mongo::MongoStore, ConnectionConfig},
    DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_HOST,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Load a DBLP dataset file into MongoDB
#[derive(Parser, Debug)]
#[command(
    name = "loader",
    version,
    about = "Load a DBLP dataset into MongoDB and build its indexes",
    long_about = "Drops the article collection, imports the given JSON file with mongoimport, \
                  then creates the id, title, venue, year and text indexes.

EXAMPLES:
  Load into a local server:
    loader dblp-ref-0.json 27017

  Use a specific mongoimport binary:
    loader dblp.json 27017 --mongoimport /opt/mongo/bin/mongoimport"
)]
struct LoaderArgs {
    /// Dataset file (JSON lines or a JSON array)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Port the MongoDB server listens on
    #[arg(value_name = "PORT")]
    port: u16,

    /// Host the MongoDB server runs on
    #[arg(long, env = "DBLP_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Target database
    #[arg(long, default_value = DEFAULT_DATABASE)]
    database: String,

    /// Target collection
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Path to the mongoimport executable
    #[arg(long, value_name = "PATH", default_value = "mongoimport")]
    mongoimport: PathBuf,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging subsystem with the specified level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn create_spinner(message: String) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = LoaderArgs::parse();
    init_logging(&args.log_level);
    debug!("CLI arguments: {:?}", args);

    if !args.input.exists() {
        error!("Input file does not exist: {:?}", args.input);
        anyhow::bail!("Input file not found: {:?}", args.input);
    }

    let config = ConnectionConfig::new(args.port)
        .with_host(args.host.clone())
        .with_namespace(args.database.clone(), args.collection.clone());

    let store = MongoStore::connect(config.clone())
        .await
        .with_context(|| format!("Error connecting to database at {}", config.uri()))?;

    let importer = MongoImport::new(&config).with_program(&args.mongoimport);
    let loader = BulkLoader::new(importer, store);

    let spinner = create_spinner(format!("Importing {}", args.input.display()))?;
    let result = loader.load(&args.input).await;
    spinner.finish_and_clear();

    let stats = result.context("Fatal error while importing data")?;
    info!(articles = stats.articles, "Load complete");

    println!(
        "Data from {} loaded into {}.{} at port {}: {} articles in {:.2?}.",
        args.input.display(),
        config.database,
        config.collection,
        config.port,
        stats.articles,
        stats.elapsed
    );
    Ok(())
}
