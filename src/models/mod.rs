//! Core data models for the DBLP browser.
//!
//! This module contains the records stored in the article collection and the
//! shapes returned by the query layer (summaries, author counts, venue ranks).

use serde::{Deserialize, Serialize};

/// A single bibliographic record as stored in the article collection.
///
/// Field names match the DBLP citation dataset, so files can be imported
/// verbatim and documents read back without remapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Externally supplied identifier, unique across the collection
    pub id: String,

    /// Article title
    pub title: String,

    /// Ordered author names
    #[serde(default)]
    pub authors: Vec<String>,

    /// Year of publication
    pub year: i32,

    /// Publication venue; empty or absent for many records
    #[serde(default)]
    pub venue: Option<String>,

    /// Abstract text, if the dataset carries one
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,

    /// Ids of the articles this one cites; entries may not resolve
    #[serde(default)]
    pub references: Vec<String>,

    /// Citation count
    #[serde(default)]
    pub n_citation: i64,
}

impl Article {
    /// Venue name, treating an empty string the same as a missing venue.
    pub fn venue_name(&self) -> Option<&str> {
        self.venue.as_deref().filter(|v| !v.is_empty())
    }

    /// Project the record down to the columns shown in result lists.
    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            authors: self.authors.clone(),
            venue: self.venue.clone(),
            year: self.year,
        }
    }
}

/// The fields shown for each hit of an article listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub venue: Option<String>,
    pub year: i32,
}

/// An author name together with the number of matching publications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorCount {
    pub author: String,
    pub publications: u64,
}

/// One row of the venue ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VenueRank {
    /// Venue name (never empty)
    pub venue: String,

    /// Number of articles published in the venue
    pub article_count: u64,

    /// Number of distinct articles whose references resolve to an article
    /// published in the venue
    pub reference_count: u64,

    /// Sum of `n_citation` over the venue's articles; secondary ranking key
    #[serde(default)]
    pub citations: i64,
}

/// User-supplied fields for a new article.
///
/// Everything else on the stored record takes its empty default.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
}

impl From<NewArticle> for Article {
    fn from(new: NewArticle) -> Self {
        Self {
            id: new.id,
            title: new.title,
            authors: new.authors,
            year: new.year,
            venue: None,
            abstract_text: None,
            references: Vec::new(),
            n_citation: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_deserializes_dataset_line() {
        let line = r#"{"abstract":"We study things.","authors":["Ada Lovelace","Alan Turing"],"n_citation":12,"references":["r1","r2"],"title":"On Things","venue":"JACM","year":1999,"id":"a1"}"#;
        let article: Article = serde_json::from_str(line).unwrap();

        assert_eq!(article.id, "a1");
        assert_eq!(article.abstract_text.as_deref(), Some("We study things."));
        assert_eq!(article.authors.len(), 2);
        assert_eq!(article.references, vec!["r1", "r2"]);
        assert_eq!(article.n_citation, 12);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let article: Article =
            serde_json::from_str(r#"{"id":"a2","title":"Bare","year":2001}"#).unwrap();

        assert!(article.authors.is_empty());
        assert!(article.references.is_empty());
        assert_eq!(article.venue, None);
        assert_eq!(article.n_citation, 0);
    }

    #[test]
    fn test_empty_venue_has_no_name() {
        let mut article: Article = NewArticle {
            id: "x".to_string(),
            title: "T".to_string(),
            authors: vec!["A".to_string()],
            year: 2020,
        }
        .into();
        assert_eq!(article.venue_name(), None);

        article.venue = Some(String::new());
        assert_eq!(article.venue_name(), None);

        article.venue = Some("VLDB".to_string());
        assert_eq!(article.venue_name(), Some("VLDB"));
    }

    #[test]
    fn test_new_article_serializes_nulls() {
        let article: Article = NewArticle {
            id: "x1".to_string(),
            title: "Fresh".to_string(),
            authors: vec!["Grace Hopper".to_string()],
            year: 2024,
        }
        .into();
        let json = serde_json::to_value(&article).unwrap();

        assert!(json["abstract"].is_null());
        assert!(json["venue"].is_null());
        assert_eq!(json["references"], serde_json::json!([]));
        assert_eq!(json["n_citation"], 0);
    }
}
