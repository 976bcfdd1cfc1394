//! Interactive browser entry point.
//!
//! Connects to the article collection once and runs the menu loop until the
//! user exits.
//!
//! # Examples
//!
//! ```bash
//! app 27017
//! app --offline dblp-sample.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use dblp_browser::{
    interface::{Interface, ReadlinePrompter},
    provider::{ArticleProvider, JsonFileArticleProvider},
    query::QueryService,
    storage::{memory::MemoryStore, mongo::MongoStore, ArticleStore, ConnectionConfig},
    DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_HOST,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Browse DBLP articles stored in MongoDB
#[derive(Parser, Debug)]
#[command(
    name = "app",
    version,
    about = "Search articles, authors and venues in the DBLP collection",
    long_about = "Interactive menu over the DBLP article collection.

EXAMPLES:
  Connect to a local server:
    app 27017

  Browse a dataset file without a server:
    app --offline dblp-sample.json"
)]
struct Args {
    /// Port the MongoDB server listens on
    #[arg(value_name = "PORT", required_unless_present = "offline")]
    port: Option<u16>,

    /// Host the MongoDB server runs on
    #[arg(long, env = "DBLP_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Database holding the collection
    #[arg(long, default_value = DEFAULT_DATABASE)]
    database: String,

    /// Article collection
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Load this dataset file into memory instead of connecting to a server
    #[arg(long, value_name = "FILE", conflicts_with = "port")]
    offline: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("dblp-browser").join("history.txt"))
}

async fn open_offline(path: &Path) -> Result<MemoryStore> {
    let provider = JsonFileArticleProvider::from_file(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let articles = provider
        .fetch_articles()
        .await
        .with_context(|| format!("Failed to read articles from {}", provider.name()))?;
    info!("Loaded {} articles from {}", articles.len(), provider.name());
    Ok(MemoryStore::from_articles(articles))
}

async fn run_menu<S: ArticleStore>(store: S) -> Result<()> {
    let prompter = ReadlinePrompter::new(history_path()).context("Failed to create readline editor")?;
    let mut interface = Interface::new(QueryService::new(store), prompter, std::io::stdout());

    let outcome = interface.run().await;
    interface.into_prompter().save_history();
    outcome.context("Interactive session failed")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    if let Some(path) = &args.offline {
        let store = open_offline(path).await?;
        return run_menu(store).await;
    }

    // clap guarantees a port when --offline is absent
    let port = args.port.context("A port number is required")?;
    let config = ConnectionConfig::new(port)
        .with_host(args.host)
        .with_namespace(args.database, args.collection);

    let store = MongoStore::connect(config.clone())
        .await
        .with_context(|| format!("Error connecting to database at {}", config.uri()))?;
    let articles = store
        .count_articles()
        .await
        .context("Failed to count articles")?;
    info!("Collection {}.{} holds {} articles", config.database, config.collection, articles);

    run_menu(store).await
}
