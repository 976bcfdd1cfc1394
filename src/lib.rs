//! DBLP Browser - load a DBLP article dump into MongoDB and explore it.
//!
//! # Architecture
//!
//! - **models**: Article records and query result shapes
//! - **storage**: The `ArticleStore` trait with MongoDB and in-memory backends
//! - **provider**: Reading dataset files (JSON lines or JSON array)
//! - **ingestion**: Bulk loading via `mongoimport`, then index creation
//! - **query**: Input validation in front of the store
//! - **interface**: The interactive menu
//!
//! # Workflow
//!
//! ## Loading
//!
//! 1. Connect to the server (fatal if unreachable)
//! 2. Replace the collection with the dataset file using `mongoimport --drop`
//! 3. Build lookup indexes and the combined text index
//!
//! ## Browsing
//!
//! 1. Connect once and hold the connection for the session
//! 2. Loop over the menu: article search, author search, top venues, insert
//!
//! # Example
//!
//! ```ignore
//! use dblp_browser::{query::QueryService, storage::{mongo::MongoStore, ConnectionConfig}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoStore::connect(ConnectionConfig::new(27017)).await?;
//!     let service = QueryService::new(store);
//!
//!     for hit in service.search_articles(&["spatial", "index"]).await? {
//!         println!("{} ({})", hit.title, hit.year);
//!     }
//!     Ok(())
//! }
//! ```

pub mod ingestion;
pub mod interface;
pub mod models;
pub mod provider;
pub mod query;
pub mod storage;

pub use models::{Article, ArticleSummary, AuthorCount, NewArticle, VenueRank};
pub use query::{QueryError, QueryService};
pub use storage::{ArticleStore, ConnectionConfig, StorageError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Host the store is expected on unless overridden
pub const DEFAULT_HOST: &str = "localhost";

/// Database holding the article collection
pub const DEFAULT_DATABASE: &str = "291db";

/// Article collection name
pub const DEFAULT_COLLECTION: &str = "dblp";
