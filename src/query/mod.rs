//! Query layer.
//!
//! `QueryService` is what the menu talks to. It validates caller input, then
//! hands each request to the store in a single round trip. Grouping, counting
//! and ordering happen in the store.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dblp_browser::query::QueryService;
//! use dblp_browser::storage::memory::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = QueryService::new(MemoryStore::new());
//!
//! for venue in service.top_venues(5).await? {
//!     println!("{}: {} articles", venue.venue, venue.article_count);
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;
use tracing::debug;

use crate::models::{Article, ArticleSummary, AuthorCount, NewArticle, VenueRank};
use crate::storage::{ArticleStore, StorageError};

/// Errors that can occur during query processing.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Article search needs at least one keyword
    #[error("Invalid query: no keywords given")]
    NoKeywords,

    /// Author search needs a non-empty keyword
    #[error("Invalid query: empty author keyword")]
    EmptyKeyword,

    /// Venue count must be positive
    #[error("Invalid query: venue count must be a positive integer")]
    InvalidLimit,

    /// The new article is missing required fields
    #[error("Invalid article: {0}")]
    InvalidArticle(String),

    /// An article with this id already exists
    #[error("An article with id '{0}' already exists")]
    DuplicateKey(String),

    /// Storage access failed
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Validating front for an `ArticleStore`.
pub struct QueryService<S: ArticleStore> {
    store: S,
}

impl<S: ArticleStore> QueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full-text search with all keywords combined into one query string.
    ///
    /// # Errors
    /// Returns `QueryError::NoKeywords` if `keywords` is empty or blank
    pub async fn search_articles<K: AsRef<str>>(&self, keywords: &[K]) -> QueryResult<Vec<ArticleSummary>> {
        let terms: Vec<&str> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .collect();
        if terms.is_empty() {
            return Err(QueryError::NoKeywords);
        }

        let query = terms.join(" ");
        let hits = self.store.text_search(&query).await?;
        debug!(query = %query, hits = hits.len(), "Article search");
        Ok(hits)
    }

    /// Authors whose name contains `keyword`, case-insensitively, with their
    /// publication counts, most prolific first.
    ///
    /// # Errors
    /// Returns `QueryError::EmptyKeyword` for an empty or blank keyword.
    /// Other keywords are matched as given, surrounding spaces included.
    pub async fn search_authors(&self, keyword: &str) -> QueryResult<Vec<AuthorCount>> {
        if keyword.trim().is_empty() {
            return Err(QueryError::EmptyKeyword);
        }
        Ok(self.store.author_counts(keyword).await?)
    }

    /// The `n` venues with the most articles.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidLimit` when `n` is zero
    pub async fn top_venues(&self, n: usize) -> QueryResult<Vec<VenueRank>> {
        if n == 0 {
            return Err(QueryError::InvalidLimit);
        }
        Ok(self.store.venue_ranking(n).await?)
    }

    /// Insert a new article with no venue, abstract or references.
    ///
    /// # Errors
    /// Returns `QueryError::DuplicateKey` if the id is taken (the existing
    /// record is not touched) and `QueryError::InvalidArticle` if the id,
    /// title or any author name is blank
    pub async fn add_article(&self, article: NewArticle) -> QueryResult<()> {
        validate(&article)?;
        if self.has_key(&article.id).await? {
            return Err(QueryError::DuplicateKey(article.id));
        }

        let record = Article::from(article);
        match self.store.insert_article(&record).await {
            Ok(()) => {
                debug!(id = %record.id, "Article added");
                Ok(())
            }
            Err(StorageError::DuplicateEntry(id)) => Err(QueryError::DuplicateKey(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Exact id lookup; `Ok(None)` when nothing matches.
    pub async fn find_article(&self, id: &str) -> QueryResult<Option<Article>> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// Articles by `author` (exact name), newest first. Empty when none.
    pub async fn articles_by_author(&self, author: &str) -> QueryResult<Vec<ArticleSummary>> {
        Ok(self.store.find_by_author(author).await?)
    }

    /// Articles whose references include `id`, newest first.
    pub async fn referencing_articles(&self, id: &str) -> QueryResult<Vec<ArticleSummary>> {
        Ok(self.store.find_referencing(id).await?)
    }

    pub async fn has_key(&self, id: &str) -> QueryResult<bool> {
        Ok(self.store.exists(id).await?)
    }
}

/// Reject blank fields. Values are stored exactly as given.
fn validate(article: &NewArticle) -> QueryResult<()> {
    let blank = |value: &str| value.trim().is_empty();

    if blank(&article.id) {
        return Err(QueryError::InvalidArticle("id must not be empty".to_string()));
    }
    if blank(&article.title) {
        return Err(QueryError::InvalidArticle("title must not be empty".to_string()));
    }
    if article.authors.is_empty() {
        return Err(QueryError::InvalidArticle("at least one author is required".to_string()));
    }
    if article.authors.iter().any(|a| blank(a)) {
        return Err(QueryError::InvalidArticle("author names must not be empty".to_string()));
    }
    Ok(())
}
