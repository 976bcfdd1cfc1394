//! MongoDB storage implementation.
//!
//! Every query is pushed down to the server: text search goes through the
//! collection's text index and the author and venue reports are aggregation
//! pipelines. Nothing is post-processed client side beyond decoding.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{ArticleStore, ConnectionConfig, StorageError, StorageResult};
use crate::models::{Article, ArticleSummary, AuthorCount, VenueRank};

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Article store backed by a single MongoDB collection.
///
/// The client is created once and held for the lifetime of the store.
pub struct MongoStore {
    client: Client,
    collection: Collection<Article>,
    config: ConnectionConfig,
}

impl MongoStore {
    /// Connect to the configured server and verify it answers.
    ///
    /// # Errors
    /// Returns `StorageError::ConnectionError` if the URI is invalid or no
    /// server responds within the selection timeout
    pub async fn connect(config: ConnectionConfig) -> StorageResult<Self> {
        let mut options = ClientOptions::parse(config.uri())
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        options.server_selection_timeout = Some(config.server_selection_timeout);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        let client = Client::with_options(options)
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        let collection = client
            .database(&config.database)
            .collection::<Article>(&config.collection);

        let store = Self {
            client,
            collection,
            config,
        };
        store.ping().await?;

        info!(
            uri = %store.config.uri(),
            database = %store.config.database,
            collection = %store.config.collection,
            "Connected to MongoDB"
        );
        Ok(store)
    }

    async fn aggregate<T: DeserializeOwned>(&self, pipeline: Vec<Document>) -> StorageResult<Vec<T>> {
        let documents: Vec<Document> = self
            .collection
            .aggregate(pipeline)
            .allow_disk_use(true)
            .await
            .map_err(query_error)?
            .try_collect()
            .await
            .map_err(query_error)?;

        documents
            .into_iter()
            .map(|d| bson::from_document(d).map_err(|e| StorageError::SerializationError(e.to_string())))
            .collect()
    }

    async fn find_summaries(&self, filter: Document) -> StorageResult<Vec<ArticleSummary>> {
        self.collection
            .clone_with_type::<ArticleSummary>()
            .find(filter)
            .projection(summary_projection())
            .sort(doc! { "year": -1, "id": 1 })
            .await
            .map_err(query_error)?
            .try_collect()
            .await
            .map_err(query_error)
    }
}

#[async_trait]
impl ArticleStore for MongoStore {
    async fn ping(&self) -> StorageResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        Ok(())
    }

    async fn create_indexes(&self) -> StorageResult<()> {
        let names = self
            .collection
            .create_indexes(index_models())
            .await
            .map_err(|e| StorageError::IndexError(e.to_string()))?;
        info!(indexes = ?names.index_names, "Indexes ready");
        Ok(())
    }

    async fn text_search(&self, query: &str) -> StorageResult<Vec<ArticleSummary>> {
        debug!(query, "Running text search");
        self.aggregate(text_search_pipeline(query)).await
    }

    async fn author_counts(&self, keyword: &str) -> StorageResult<Vec<AuthorCount>> {
        debug!(keyword, "Counting publications per author");
        self.aggregate(author_pipeline(keyword)).await
    }

    async fn venue_ranking(&self, limit: usize) -> StorageResult<Vec<VenueRank>> {
        debug!(limit, "Ranking venues");
        self.aggregate(venue_pipeline(&self.config.collection, limit)).await
    }

    async fn insert_article(&self, article: &Article) -> StorageResult<()> {
        match self.collection.insert_one(article).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StorageError::DuplicateEntry(article.id.clone())),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Article>> {
        self.collection
            .find_one(doc! { "id": id })
            .await
            .map_err(query_error)
    }

    async fn find_by_author(&self, author: &str) -> StorageResult<Vec<ArticleSummary>> {
        self.find_summaries(doc! { "authors": author }).await
    }

    async fn find_referencing(&self, id: &str) -> StorageResult<Vec<ArticleSummary>> {
        self.find_summaries(doc! { "references": id }).await
    }

    async fn exists(&self, id: &str) -> StorageResult<bool> {
        let found = self
            .collection
            .clone_with_type::<Document>()
            .find_one(doc! { "id": id })
            .projection(doc! { "_id": 1 })
            .await
            .map_err(query_error)?;
        Ok(found.is_some())
    }

    async fn count_articles(&self) -> StorageResult<u64> {
        self.collection
            .count_documents(doc! {})
            .await
            .map_err(query_error)
    }
}

fn query_error(error: mongodb::error::Error) -> StorageError {
    StorageError::QueryError(error.to_string())
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE
    )
}

fn summary_projection() -> Document {
    doc! { "_id": 0, "id": 1, "title": 1, "authors": 1, "venue": 1, "year": 1 }
}

fn index_models() -> Vec<IndexModel> {
    let single = |field: &str| {
        let mut keys = Document::new();
        keys.insert(field, 1);
        IndexModel::builder().keys(keys).build()
    };

    vec![
        IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build(),
        single("title"),
        single("venue"),
        single("year"),
        single("authors"),
        single("references"),
        IndexModel::builder()
            .keys(doc! {
                "title": "text",
                "authors": "text",
                "abstract": "text",
                "venue": "text",
            })
            .options(IndexOptions::builder().name("article_text".to_string()).build())
            .build(),
    ]
}

pub(crate) fn text_search_pipeline(query: &str) -> Vec<Document> {
    vec![
        doc! { "$match": { "$text": { "$search": query } } },
        doc! { "$addFields": { "score": { "$meta": "textScore" } } },
        doc! { "$sort": { "score": -1, "year": -1, "id": 1 } },
        doc! { "$project": summary_projection() },
    ]
}

pub(crate) fn author_pipeline(keyword: &str) -> Vec<Document> {
    let pattern = doc! { "$regex": regex::escape(keyword), "$options": "i" };
    vec![
        doc! { "$match": { "authors": pattern.clone() } },
        doc! { "$unwind": "$authors" },
        doc! { "$match": { "authors": pattern } },
        doc! { "$group": { "_id": "$authors", "publications": { "$sum": 1 } } },
        doc! { "$sort": { "publications": -1, "_id": 1 } },
        doc! { "$project": { "_id": 0, "author": "$_id", "publications": 1 } },
    ]
}

/// Venue report: each article is joined to the articles citing it, then the
/// citing ids are unioned per venue so a paper citing two articles of the same
/// venue counts once.
pub(crate) fn venue_pipeline(collection: &str, limit: usize) -> Vec<Document> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    vec![
        doc! { "$match": { "venue": { "$exists": true, "$nin": ["", Bson::Null] } } },
        doc! { "$lookup": {
            "from": collection,
            "localField": "id",
            "foreignField": "references",
            "pipeline": [ { "$project": { "_id": 0, "id": 1 } } ],
            "as": "cited_by",
        } },
        doc! { "$group": {
            "_id": "$venue",
            "article_count": { "$sum": 1 },
            "citations": { "$sum": "$n_citation" },
            "referrers": { "$push": "$cited_by.id" },
        } },
        doc! { "$project": {
            "_id": 0,
            "venue": "$_id",
            "article_count": 1,
            "citations": 1,
            "reference_count": { "$size": { "$reduce": {
                "input": "$referrers",
                "initialValue": [],
                "in": { "$setUnion": ["$$value", "$$this"] },
            } } },
        } },
        doc! { "$sort": { "article_count": -1, "citations": -1, "venue": 1 } },
        doc! { "$limit": limit },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_names(pipeline: &[Document]) -> Vec<&str> {
        pipeline
            .iter()
            .filter_map(|stage| stage.keys().next().map(String::as_str))
            .collect()
    }

    #[test]
    fn test_text_search_uses_single_query_string() {
        let pipeline = text_search_pipeline("graph database");
        let search = pipeline[0]
            .get_document("$match")
            .and_then(|m| m.get_document("$text"))
            .and_then(|t| t.get_str("$search"))
            .unwrap();
        assert_eq!(search, "graph database");
        assert_eq!(stage_names(&pipeline), vec!["$match", "$addFields", "$sort", "$project"]);
    }

    #[test]
    fn test_author_pattern_is_escaped_and_case_insensitive() {
        let pipeline = author_pipeline("C++ (J.)");
        let pattern = pipeline[2]
            .get_document("$match")
            .and_then(|m| m.get_document("authors"))
            .unwrap();
        assert_eq!(pattern.get_str("$regex").unwrap(), r"C\+\+ \(J\.\)");
        assert_eq!(pattern.get_str("$options").unwrap(), "i");
        assert_eq!(
            stage_names(&pipeline),
            vec!["$match", "$unwind", "$match", "$group", "$sort", "$project"]
        );
    }

    #[test]
    fn test_venue_pipeline_joins_own_collection_and_limits() {
        let pipeline = venue_pipeline("dblp", 5);
        let lookup = pipeline[1].get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "dblp");
        assert_eq!(lookup.get_str("foreignField").unwrap(), "references");
        // only citing ids are carried, so large citation lists stay small
        let inner = lookup.get_array("pipeline").unwrap();
        assert_eq!(inner.len(), 1);
        let projection = inner[0].as_document().and_then(|d| d.get_document("$project").ok()).unwrap();
        assert_eq!(projection, &doc! { "_id": 0, "id": 1 });
        assert_eq!(pipeline.last().unwrap().get_i64("$limit").unwrap(), 5);

        let sort = pipeline[4].get_document("$sort").unwrap();
        let keys: Vec<&str> = sort.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["article_count", "citations", "venue"]);
    }

    #[test]
    fn test_index_set_covers_lookup_and_text_fields() {
        let models = index_models();
        let unique_id = &models[0];
        assert_eq!(unique_id.keys, doc! { "id": 1 });
        assert_eq!(unique_id.options.as_ref().and_then(|o| o.unique), Some(true));

        let text = models.last().unwrap();
        let fields: Vec<&str> = text.keys.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["title", "authors", "abstract", "venue"]);
    }
}
