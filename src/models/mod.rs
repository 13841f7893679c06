//! Domain models and API payload types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// Ids at or above this value belong to externally seeded records.
///
/// The range partitions "external" from "owned" data: seed records are
/// immutable and non-deletable through the mutation API, and the guard is
/// checked at every mutation entry point.
pub const EXTERNAL_ID_FLOOR: i64 = 999;

pub const TEXT_FIELD_MIN: usize = 3;
pub const TEXT_FIELD_MAX: usize = 100;

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookSource {
    Database,
    OpenLibrary,
}

/// A book record, either persisted or externally seeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub first_publish_year: i32,
    pub image_file: Option<String>,
    pub source: BookSource,
}

impl Book {
    pub fn is_external(&self) -> bool {
        self.id >= EXTERNAL_ID_FLOOR
    }
}

/// Full field set for create and replace operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub first_publish_year: i32,
}

/// Partial field set for patch operations; absent fields retain their values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub first_publish_year: Option<i32>,
}

fn validate_text_field(field: &str, value: &str) -> AppResult<()> {
    let len = value.chars().count();
    if len < TEXT_FIELD_MIN || len > TEXT_FIELD_MAX {
        return Err(AppError::validation(format!(
            "{} must be between {} and {} characters",
            field, TEXT_FIELD_MIN, TEXT_FIELD_MAX
        )));
    }
    Ok(())
}

fn validate_year(year: i32) -> AppResult<()> {
    if year < 0 {
        return Err(AppError::validation(
            "first_publish_year must be non-negative",
        ));
    }
    Ok(())
}

impl BookFields {
    pub fn validate(&self) -> AppResult<()> {
        validate_text_field("title", &self.title)?;
        validate_text_field("author", &self.author)?;
        validate_text_field("publisher", &self.publisher)?;
        validate_year(self.first_publish_year)
    }
}

impl BookPatch {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            validate_text_field("title", title)?;
        }
        if let Some(author) = &self.author {
            validate_text_field("author", author)?;
        }
        if let Some(publisher) = &self.publisher {
            validate_text_field("publisher", publisher)?;
        }
        if let Some(year) = self.first_publish_year {
            validate_year(year)?;
        }
        Ok(())
    }
}

/// Whether a query was answered from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CacheStatus {
    #[serde(rename = "HIT")]
    Hit,
    #[serde(rename = "MISS")]
    Miss,
}

/// Book record as returned by the API, with a constructed cover URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub first_publish_year: i32,
    pub image_url: Option<String>,
    pub source: BookSource,
}

impl BookResponse {
    pub fn from_book(book: Book, base_url: &str) -> Self {
        let image_url = book
            .image_file
            .as_ref()
            .map(|file| format!("{}/images/{}", base_url.trim_end_matches('/'), file));
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            publisher: book.publisher,
            first_publish_year: book.first_publish_year,
            image_url,
            source: book.source,
        }
    }
}

/// Paginated book search payload, also the cached representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookSearchResults {
    pub query: String,
    pub total_count: u64,
    pub results: Vec<BookResponse>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub cache: CacheStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthorCount {
    pub author: String,
    pub book_count: u64,
}

/// Author aggregation payload, also the cached representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthorSearchResults {
    pub query: String,
    pub results: Vec<AuthorCount>,
    pub cache: CacheStatus,
}

/// Response wrapper for delete/replace/patch operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MutationResponse {
    pub message: String,
    pub book: BookResponse,
}
