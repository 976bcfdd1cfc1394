//! Article file provider.
//!
//! Reads article records from a dataset file. Two layouts are accepted: one
//! JSON document per line (the DBLP citation dump) or a single JSON array.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::models::Article;

/// Errors that can occur when reading articles from a file.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to read from the data source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A record could not be decoded
    #[error("Parse error at record {record}: {source}")]
    ParseError {
        record: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Physical layout of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// One JSON object per line
    JsonLines,
    /// A single top-level JSON array
    JsonArray,
}

impl FileFormat {
    /// Classify from the first non-whitespace byte of the file.
    pub fn detect(prefix: &[u8]) -> Self {
        match prefix.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'[') => FileFormat::JsonArray,
            _ => FileFormat::JsonLines,
        }
    }

    /// Peek at the start of `path` to find its layout.
    pub async fn sniff(path: &Path) -> ProviderResult<Self> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut buf = [0u8; 512];
        let read = file.read(&mut buf).await?;
        Ok(Self::detect(&buf[..read]))
    }
}

/// Trait for sources of article records.
#[async_trait]
pub trait ArticleProvider: Send + Sync {
    /// Fetch every article the source holds.
    async fn fetch_articles(&self) -> ProviderResult<Vec<Article>>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Articles read from a JSON or JSON-lines file on disk.
pub struct JsonFileArticleProvider {
    path: PathBuf,
    name: String,
    format: FileFormat,
}

impl JsonFileArticleProvider {
    /// Open `path` and detect its layout.
    ///
    /// # Errors
    /// Returns `ProviderError::IoError` if the file cannot be opened
    pub async fn from_file(path: impl Into<PathBuf>) -> ProviderResult<Self> {
        let path = path.into();
        let format = FileFormat::sniff(&path).await?;
        Ok(Self {
            name: format!("json file {}", path.display()),
            path,
            format,
        })
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }
}

#[async_trait]
impl ArticleProvider for JsonFileArticleProvider {
    async fn fetch_articles(&self) -> ProviderResult<Vec<Article>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        parse_articles(&contents, self.format)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Decode `contents` laid out as `format`. Blank lines are skipped.
pub fn parse_articles(contents: &str, format: FileFormat) -> ProviderResult<Vec<Article>> {
    match format {
        FileFormat::JsonArray => serde_json::from_str(contents)
            .map_err(|source| ProviderError::ParseError { record: 1, source }),
        FileFormat::JsonLines => contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .map_err(|source| ProviderError::ParseError { record: idx + 1, source })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINES: &str = r#"{"id":"p1","title":"First","authors":["A"],"year":2000,"venue":"V"}

{"id":"p2","title":"Second","authors":["B"],"year":2001,"references":["p1"]}
"#;

    #[test]
    fn test_detect_format() {
        assert_eq!(FileFormat::detect(b"  \n[{\"id\":1}]"), FileFormat::JsonArray);
        assert_eq!(FileFormat::detect(b"{\"id\":1}\n"), FileFormat::JsonLines);
        assert_eq!(FileFormat::detect(b""), FileFormat::JsonLines);
    }

    #[test]
    fn test_parse_json_lines_skips_blank_lines() {
        let articles = parse_articles(LINES, FileFormat::JsonLines).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].references, vec!["p1"]);
    }

    #[test]
    fn test_parse_error_reports_record() {
        let bad = "{\"id\":\"p1\",\"title\":\"T\",\"year\":1}\n{not json}\n";
        match parse_articles(bad, FileFormat::JsonLines) {
            Err(ProviderError::ParseError { record, .. }) => assert_eq!(record, 2),
            other => panic!("Expected ParseError, got {:?}", other.map(|a| a.len())),
        }
    }

    #[tokio::test]
    async fn test_provider_reads_array_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"p1","title":"First","authors":["A"],"year":2000}}]"#
        )
        .unwrap();

        let provider = JsonFileArticleProvider::from_file(file.path()).await.unwrap();
        assert_eq!(provider.format(), FileFormat::JsonArray);
        let articles = provider.fetch_articles().await.unwrap();
        assert_eq!(articles[0].id, "p1");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let result = JsonFileArticleProvider::from_file("/nonexistent/dblp.json").await;
        assert!(matches!(result, Err(ProviderError::IoError(_))));
    }
}
