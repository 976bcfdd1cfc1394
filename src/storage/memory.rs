//! In-process article store.
//!
//! Holds the whole collection in memory and answers the same queries as the
//! MongoDB backend. Used for browsing a dataset file without a server and as
//! the backend for tests.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ArticleStore, StorageError, StorageResult};
use crate::models::{Article, ArticleSummary, AuthorCount, VenueRank};

/// Memory-backed store. Clones share the same collection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    articles: Arc<RwLock<Vec<Article>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `articles`.
    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: Arc::new(RwLock::new(articles)),
        }
    }

    /// Drop the current contents and load `articles` in their place.
    pub async fn replace_all(&self, articles: Vec<Article>) {
        *self.articles.write().await = articles;
    }
}

/// Lowercased alphanumeric words of `text`.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Number of word occurrences in the searchable fields that match a query term.
fn text_score(article: &Article, terms: &HashSet<String>) -> usize {
    let fields = std::iter::once(article.title.as_str())
        .chain(article.authors.iter().map(String::as_str))
        .chain(article.abstract_text.as_deref())
        .chain(article.venue.as_deref());

    fields
        .flat_map(|field| tokenize(field))
        .filter(|word| terms.contains(word))
        .count()
}

fn newest_first(summaries: &mut [ArticleSummary]) {
    summaries.sort_by(|a, b| b.year.cmp(&a.year).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn create_indexes(&self) -> StorageResult<()> {
        let articles = self.articles.read().await;
        let mut seen = HashSet::with_capacity(articles.len());
        for article in articles.iter() {
            if !seen.insert(article.id.as_str()) {
                return Err(StorageError::IndexError(format!(
                    "duplicate id '{}' prevents a unique index",
                    article.id
                )));
            }
        }
        Ok(())
    }

    async fn text_search(&self, query: &str) -> StorageResult<Vec<ArticleSummary>> {
        let terms: HashSet<String> = tokenize(query).collect();
        let articles = self.articles.read().await;

        let mut scored: Vec<(usize, &Article)> = articles
            .iter()
            .map(|a| (text_score(a, &terms), a))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.cmp(sa)
                .then_with(|| b.year.cmp(&a.year))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(scored.into_iter().map(|(_, a)| a.summary()).collect())
    }

    async fn author_counts(&self, keyword: &str) -> StorageResult<Vec<AuthorCount>> {
        let needle = keyword.to_lowercase();
        let articles = self.articles.read().await;

        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for author in articles.iter().flat_map(|a| a.authors.iter()) {
            if author.to_lowercase().contains(&needle) {
                *counts.entry(author.as_str()).or_default() += 1;
            }
        }

        // BTreeMap order makes the stable sort break ties by name
        let mut result: Vec<AuthorCount> = counts
            .into_iter()
            .map(|(author, publications)| AuthorCount {
                author: author.to_string(),
                publications,
            })
            .collect();
        result.sort_by_key(|c| Reverse(c.publications));
        Ok(result)
    }

    async fn venue_ranking(&self, limit: usize) -> StorageResult<Vec<VenueRank>> {
        let articles = self.articles.read().await;

        let mut venue_of: HashMap<&str, &str> = HashMap::new();
        let mut ranks: HashMap<&str, (u64, i64)> = HashMap::new();
        for article in articles.iter() {
            if let Some(venue) = article.venue_name() {
                venue_of.entry(article.id.as_str()).or_insert(venue);
                let entry = ranks.entry(venue).or_default();
                entry.0 += 1;
                entry.1 += article.n_citation;
            }
        }

        let mut referrers: HashMap<&str, HashSet<&str>> = HashMap::new();
        for article in articles.iter() {
            for target in &article.references {
                if let Some(venue) = venue_of.get(target.as_str()) {
                    referrers.entry(*venue).or_default().insert(article.id.as_str());
                }
            }
        }

        let mut result: Vec<VenueRank> = ranks
            .into_iter()
            .map(|(venue, (article_count, citations))| VenueRank {
                venue: venue.to_string(),
                article_count,
                reference_count: referrers.get(venue).map_or(0, |r| r.len() as u64),
                citations,
            })
            .collect();
        result.sort_by(|a, b| {
            b.article_count
                .cmp(&a.article_count)
                .then_with(|| b.citations.cmp(&a.citations))
                .then_with(|| a.venue.cmp(&b.venue))
        });
        result.truncate(limit);
        Ok(result)
    }

    async fn insert_article(&self, article: &Article) -> StorageResult<()> {
        let mut articles = self.articles.write().await;
        if articles.iter().any(|a| a.id == article.id) {
            return Err(StorageError::DuplicateEntry(article.id.clone()));
        }
        articles.push(article.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Article>> {
        let articles = self.articles.read().await;
        Ok(articles.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_author(&self, author: &str) -> StorageResult<Vec<ArticleSummary>> {
        let articles = self.articles.read().await;
        let mut found: Vec<ArticleSummary> = articles
            .iter()
            .filter(|a| a.authors.iter().any(|name| name == author))
            .map(Article::summary)
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn find_referencing(&self, id: &str) -> StorageResult<Vec<ArticleSummary>> {
        let articles = self.articles.read().await;
        let mut found: Vec<ArticleSummary> = articles
            .iter()
            .filter(|a| a.references.iter().any(|r| r == id))
            .map(Article::summary)
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.articles.read().await.iter().any(|a| a.id == id))
    }

    async fn count_articles(&self) -> StorageResult<u64> {
        Ok(self.articles.read().await.len() as u64)
    }
}
