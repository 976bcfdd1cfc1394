//! Storage layer abstraction and implementations.
//!
//! This module defines the interface for persisting and querying article
//! records. Grouping, counting, sorting and limiting are the backend's job;
//! the query layer above only validates input and shapes results.

pub mod memory;
pub mod mongo;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Article, ArticleSummary, AuthorCount, VenueRank};
use crate::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_HOST};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error
    #[error("Query execution failed: {0}")]
    QueryError(String),

    /// Data serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Index creation error
    #[error("Index error: {0}")]
    IndexError(String),

    /// An article with the same id already exists
    #[error("Duplicate key: {0}")]
    DuplicateEntry(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Where the article collection lives.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub collection: String,

    /// How long to wait for a reachable server before giving up
    pub server_selection_timeout: Duration,
}

impl ConnectionConfig {
    /// Connection to the default database and collection on `localhost`.
    pub fn new(port: u16) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port,
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            server_selection_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_namespace(mut self, database: impl Into<String>, collection: impl Into<String>) -> Self {
        self.database = database.into();
        self.collection = collection.into();
        self
    }

    /// Connection string understood by both the driver and `mongoimport`.
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }
}

/// Trait for article storage backends.
///
/// Every method is a single round trip to the backend. Lookups that find
/// nothing return `Ok(None)` or an empty vector rather than an error.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Verify the backend is reachable.
    ///
    /// # Errors
    /// Returns `StorageError::ConnectionError` if it is not
    async fn ping(&self) -> StorageResult<()>;

    /// (Re)build the lookup and text-search indexes.
    ///
    /// Safe to call repeatedly.
    async fn create_indexes(&self) -> StorageResult<()>;

    /// Full-text search over title, authors, abstract and venue.
    ///
    /// # Arguments
    /// * `query` - All keywords joined into one search string
    ///
    /// # Returns
    /// Matching articles, best match first
    async fn text_search(&self, query: &str) -> StorageResult<Vec<ArticleSummary>>;

    /// Count publications per author name containing `keyword`
    /// (case-insensitive), most prolific first.
    async fn author_counts(&self, keyword: &str) -> StorageResult<Vec<AuthorCount>>;

    /// Rank non-empty venues by article count and keep the first `limit`.
    async fn venue_ranking(&self, limit: usize) -> StorageResult<Vec<VenueRank>>;

    /// Insert a new article.
    ///
    /// # Errors
    /// Returns `StorageError::DuplicateEntry` if the id is already taken;
    /// the existing record is left untouched
    async fn insert_article(&self, article: &Article) -> StorageResult<()>;

    /// Look up a single article by exact id.
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Article>>;

    /// Articles listing `author` exactly, newest first.
    async fn find_by_author(&self, author: &str) -> StorageResult<Vec<ArticleSummary>>;

    /// Articles whose references contain `id`, newest first.
    async fn find_referencing(&self, id: &str) -> StorageResult<Vec<ArticleSummary>>;

    /// Check whether an article with this id exists.
    async fn exists(&self, id: &str) -> StorageResult<bool>;

    /// Total number of articles in the collection.
    async fn count_articles(&self) -> StorageResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_defaults() {
        let config = ConnectionConfig::new(27017);
        assert_eq!(config.uri(), "mongodb://localhost:27017");
        assert_eq!(config.database, "291db");
        assert_eq!(config.collection, "dblp");
    }

    #[test]
    fn test_connection_overrides() {
        let config = ConnectionConfig::new(27018)
            .with_host("db.internal")
            .with_namespace("test", "articles");
        assert_eq!(config.uri(), "mongodb://db.internal:27018");
        assert_eq!(config.database, "test");
        assert_eq!(config.collection, "articles");
    }
}
