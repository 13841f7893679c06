//! External seed catalog
//!
//! At startup a fixed result set is fetched from the OpenLibrary search API
//! and held in memory for the lifetime of the process. Seed records carry
//! ids in the reserved range (starting at [`EXTERNAL_ID_FLOOR`]) and are
//! read-only: searches include them, mutations reject them.

use serde::Deserialize;
use tracing::info;

use crate::config::SeedConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Book, BookSource, EXTERNAL_ID_FLOOR};

/// One document in the OpenLibrary search response; everything is optional
/// and multi-valued fields arrive as arrays
#[derive(Debug, Deserialize)]
struct OpenLibraryDoc {
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    publisher: Vec<String>,
    first_publish_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryResponse {
    #[serde(default)]
    docs: Vec<OpenLibraryDoc>,
}

const UNKNOWN: &str = "Unknown";

/// Immutable in-memory catalog of externally seeded books
pub struct SeedCatalog {
    books: Vec<Book>,
}

impl SeedCatalog {
    /// Fetch the seed set from the configured search endpoint.
    ///
    /// A fetch or decode failure aborts startup; the catalog's search
    /// semantics depend on the seed set being present.
    pub async fn load(config: &SeedConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        info!(
            "Loading seed catalog from {} (q={}, limit={})",
            config.url, config.query, config.limit
        );

        let response = client
            .get(&config.url)
            .query(&[
                ("q", config.query.as_str()),
                ("limit", &config.limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                AppError::external_service(format!("seed endpoint returned an error: {}", e))
            })?;

        let payload: OpenLibraryResponse = response.json().await.map_err(|e| {
            AppError::external_service(format!("seed response failed to decode: {}", e))
        })?;

        let catalog = Self::from_docs(payload.docs);
        info!("Seed catalog loaded with {} records", catalog.len());
        Ok(catalog)
    }

    fn from_docs(docs: Vec<OpenLibraryDoc>) -> Self {
        let books = docs
            .into_iter()
            .enumerate()
            .map(|(index, doc)| Book {
                id: EXTERNAL_ID_FLOOR + index as i64,
                title: doc.title.unwrap_or_else(|| UNKNOWN.to_string()),
                author: doc
                    .author_name
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                publisher: doc
                    .publisher
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                first_publish_year: doc.first_publish_year.unwrap_or(0),
                image_file: None,
                source: BookSource::OpenLibrary,
            })
            .collect();
        Self { books }
    }

    /// Build a catalog from prepared records; ids are reassigned into the
    /// reserved range in input order
    pub fn from_records(records: Vec<(String, String, String, i32)>) -> Self {
        let books = records
            .into_iter()
            .enumerate()
            .map(
                |(index, (title, author, publisher, first_publish_year))| Book {
                    id: EXTERNAL_ID_FLOOR + index as i64,
                    title,
                    author,
                    publisher,
                    first_publish_year,
                    image_file: None,
                    source: BookSource::OpenLibrary,
                },
            )
            .collect();
        Self { books }
    }

    pub fn empty() -> Self {
        Self { books: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Case-insensitive substring match over title, author, publisher and
    /// the publish year rendered as text, preserving seed order
    pub fn search(&self, query: &str) -> Vec<Book> {
        let needle = query.to_lowercase();
        self.books
            .iter()
            .filter(|book| {
                book.title.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle)
                    || book.publisher.to_lowercase().contains(&needle)
                    || book.first_publish_year.to_string().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Per-author record counts for seed books whose author matches the
    /// query, in seed order
    pub fn authors_matching(&self, query: &str) -> Vec<(String, u64)> {
        let needle = query.to_lowercase();
        let mut counts: Vec<(String, u64)> = Vec::new();
        for book in &self.books {
            if !book.author.to_lowercase().contains(&needle) {
                continue;
            }
            match counts.iter_mut().find(|(author, _)| *author == book.author) {
                Some((_, count)) => *count += 1,
                None => counts.push((book.author.clone(), 1)),
            }
        }
        counts
    }
}
