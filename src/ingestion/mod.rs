//! Bulk loading pipeline.
//!
//! Loading is a two step process: an importer replaces the whole article
//! collection with the contents of a dataset file, then the store rebuilds its
//! indexes. The production importer shells out to `mongoimport`; the copy is
//! never done record by record in this process.
//!
//! ```ignore
//! use dblp_browser::ingestion::{BulkLoader, MongoImport};
//! use dblp_browser::storage::{mongo::MongoStore, ConnectionConfig};
//!
//! let config = ConnectionConfig::new(27017);
//! let store = MongoStore::connect(config.clone()).await?;
//! let importer = MongoImport::new(&config);
//! let stats = BulkLoader::new(importer, store).load("dblp.json".as_ref()).await?;
//! println!("{} articles loaded", stats.articles);
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::provider::{FileFormat, ProviderError};
use crate::storage::{ArticleStore, ConnectionConfig, StorageError};

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The dataset file does not exist
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    /// The dataset file could not be inspected
    #[error("Input error: {0}")]
    Input(#[from] ProviderError),

    /// The import utility could not be started
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The import utility ran but reported failure
    #[error("Import failed ({status}): {stderr}")]
    ImportFailed { status: String, stderr: String },

    /// Index build or count failed after the import
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Outcome of a completed load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStats {
    /// Articles in the collection after the load
    pub articles: u64,

    /// Layout the input file was imported as
    pub format: FileFormat,

    /// Wall time from import start to indexes ready
    pub elapsed: Duration,
}

/// Replaces the article collection with the contents of a file.
#[async_trait]
pub trait BulkImporter: Send + Sync {
    /// Drop the target collection and load `path` into it.
    async fn import(&self, path: &Path, format: FileFormat) -> LoadResult<()>;
}

/// Importer that runs the `mongoimport` command line tool.
#[derive(Debug, Clone)]
pub struct MongoImport {
    program: PathBuf,
    uri: String,
    database: String,
    collection: String,
}

impl MongoImport {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            program: PathBuf::from("mongoimport"),
            uri: config.uri(),
            database: config.database.clone(),
            collection: config.collection.clone(),
        }
    }

    /// Use a specific `mongoimport` binary instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Command line arguments for importing `path`.
    pub fn args(&self, path: &Path, format: FileFormat) -> Vec<String> {
        let mut args = vec![
            "--drop".to_string(),
            "--quiet".to_string(),
            format!("--db={}", self.database),
            format!("--collection={}", self.collection),
            format!("--uri={}", self.uri),
            format!("--file={}", path.display()),
        ];
        if format == FileFormat::JsonArray {
            args.push("--jsonArray".to_string());
        }
        args
    }
}

#[async_trait]
impl BulkImporter for MongoImport {
    async fn import(&self, path: &Path, format: FileFormat) -> LoadResult<()> {
        let args = self.args(path, format);
        debug!(program = %self.program.display(), ?args, "Running import");

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|source| LoadError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(LoadError::ImportFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Load coordinator: import, then index.
pub struct BulkLoader<I, S>
where
    I: BulkImporter,
    S: ArticleStore,
{
    importer: I,
    store: S,
}

impl<I, S> BulkLoader<I, S>
where
    I: BulkImporter,
    S: ArticleStore,
{
    pub fn new(importer: I, store: S) -> Self {
        Self { importer, store }
    }

    /// Replace the collection with `path` and rebuild indexes.
    ///
    /// # Errors
    /// Any failure is returned as-is; nothing is retried
    pub async fn load(&self, path: &Path) -> LoadResult<LoadStats> {
        if !path.exists() {
            return Err(LoadError::MissingInput(path.to_path_buf()));
        }

        let start = Instant::now();
        let format = FileFormat::sniff(path).await?;
        info!(path = %path.display(), ?format, "Importing dataset");

        self.importer.import(path, format).await?;
        self.store.create_indexes().await?;
        let articles = self.store.count_articles().await?;

        Ok(LoadStats {
            articles,
            format,
            elapsed: start.elapsed(),
        })
    }
}
