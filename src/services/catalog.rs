//! Catalog service
//!
//! Orchestrates the repository, the seed catalog, cover storage and the
//! query cache. Search results merge persistent records with the seed set
//! (persistent first) and are cached under per-entity prefixes; every
//! mutation invalidates both prefixes before its response is returned.

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::{QueryCache, cache_key, keys};
use crate::covers::CoverStorage;
use crate::database::repositories::BookRepository;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AuthorCount, AuthorSearchResults, Book, BookFields, BookPatch, BookResponse,
    BookSearchResults, CacheStatus, EXTERNAL_ID_FLOOR, MutationResponse,
};
use crate::seed::SeedCatalog;

/// An uploaded cover image, decoded from the multipart form
#[derive(Debug, Clone)]
pub struct CoverUpload {
    pub data: Vec<u8>,
    pub extension: String,
}

pub struct CatalogService {
    repository: BookRepository,
    seed: Arc<SeedCatalog>,
    cache: QueryCache,
    covers: CoverStorage,
    base_url: String,
    books_ttl: Duration,
    authors_ttl: Duration,
}

impl CatalogService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: BookRepository,
        seed: Arc<SeedCatalog>,
        cache: QueryCache,
        covers: CoverStorage,
        base_url: String,
        books_ttl: Duration,
        authors_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            seed,
            cache,
            covers,
            base_url,
            books_ttl,
            authors_ttl,
        }
    }

    pub fn covers(&self) -> &CoverStorage {
        &self.covers
    }

    /// Search books across the persistent store and the seed catalog.
    ///
    /// Results are ordered store-first, then seed records in seed order;
    /// pagination slices that combined sequence. The full payload, slice
    /// included, is cached per `(q, skip, limit)`.
    pub async fn search_books(
        &self,
        query: &str,
        skip: u64,
        limit: Option<u64>,
    ) -> AppResult<BookSearchResults> {
        let key = cache_key(
            keys::BOOKS_SEARCH,
            &BTreeMap::from([
                ("q", json!(query)),
                ("skip", json!(skip)),
                ("limit", json!(limit)),
            ]),
        );

        if let Some(mut cached) = self.cache.get_json::<BookSearchResults>(&key).await {
            cached.cache = CacheStatus::Hit;
            return Ok(cached);
        }

        let mut combined: Vec<BookResponse> = self
            .repository
            .search(query)
            .await?
            .into_iter()
            .map(|book| self.to_response(book))
            .collect();
        combined.extend(
            self.seed
                .search(query)
                .into_iter()
                .map(|book| self.to_response(book)),
        );

        let total_count = combined.len() as u64;
        let start = skip.min(total_count) as usize;
        let end = match limit {
            Some(limit) => skip.saturating_add(limit).min(total_count) as usize,
            None => total_count as usize,
        };
        let results = combined[start..end].to_vec();

        let payload = BookSearchResults {
            query: query.to_string(),
            total_count,
            results,
            skip,
            limit,
            cache: CacheStatus::Miss,
        };
        self.cache.set_json(&key, &payload, self.books_ttl).await;
        Ok(payload)
    }

    /// Aggregate per-author book counts across the store and the seed
    /// catalog; NotFound when no author matches
    pub async fn search_authors(&self, query: &str) -> AppResult<AuthorSearchResults> {
        let key = cache_key(keys::AUTHORS_SEARCH, &BTreeMap::from([("q", json!(query))]));

        if let Some(mut cached) = self.cache.get_json::<AuthorSearchResults>(&key).await {
            cached.cache = CacheStatus::Hit;
            return Ok(cached);
        }

        let mut merged: BTreeMap<String, u64> = BTreeMap::new();
        for (author, count) in self.repository.aggregate_authors(query).await? {
            merged.insert(author, count);
        }
        for (author, count) in self.seed.authors_matching(query) {
            *merged.entry(author).or_insert(0) += count;
        }

        if merged.is_empty() {
            return Err(AppError::not_found("No authors found matching the query"));
        }

        let payload = AuthorSearchResults {
            query: query.to_string(),
            results: merged
                .into_iter()
                .map(|(author, book_count)| AuthorCount { author, book_count })
                .collect(),
            cache: CacheStatus::Miss,
        };
        self.cache.set_json(&key, &payload, self.authors_ttl).await;
        Ok(payload)
    }

    /// Create a record, optionally storing an uploaded cover first. If the
    /// insert fails, the just-written cover is removed again.
    pub async fn create_book(
        &self,
        fields: BookFields,
        cover: Option<CoverUpload>,
    ) -> AppResult<BookResponse> {
        fields.validate()?;

        let image_file = match &cover {
            Some(upload) => Some(self.covers.save(&upload.data, &upload.extension).await?),
            None => None,
        };

        let book = match self.repository.insert(&fields, image_file.clone()).await {
            Ok(book) => book,
            Err(e) => {
                if let Some(file) = &image_file {
                    let _ = self.covers.delete(file).await;
                }
                return Err(e.into());
            }
        };

        self.invalidate_search_caches().await;
        info!("Created book {} ({})", book.id, book.title);
        Ok(self.to_response(book))
    }

    /// Delete a record, then its stored cover, then the cached searches
    pub async fn delete_book(&self, id: i64) -> AppResult<MutationResponse> {
        let removed = self
            .repository
            .delete_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))?;

        // the row delete has committed; a failed cover removal must not
        // fail the request or skip invalidation
        if let Some(file) = &removed.image_file {
            if let Err(e) = self.covers.delete(file).await {
                warn!("Failed to remove cover {} for book {}: {}", file, removed.id, e);
            }
        }

        self.invalidate_search_caches().await;
        info!("Deleted book {} ({})", removed.id, removed.title);
        Ok(MutationResponse {
            message: "Book deleted successfully".to_string(),
            book: self.to_response(removed),
        })
    }

    /// Replace every field of a record. Ids in the reserved external range
    /// are rejected before touching the store.
    pub async fn replace_book(
        &self,
        id: i64,
        fields: BookFields,
        cover: Option<CoverUpload>,
    ) -> AppResult<MutationResponse> {
        self.guard_reserved_range(id)?;
        fields.validate()?;

        let existing = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))?;

        let (image_file, new_cover) = self.stage_cover(&existing, cover).await?;

        let updated = match self.repository.replace(id, &fields, image_file).await {
            Ok(Some(book)) => book,
            Ok(None) => {
                self.discard_staged_cover(&new_cover).await;
                return Err(AppError::not_found("Book not found"));
            }
            Err(e) => {
                self.discard_staged_cover(&new_cover).await;
                return Err(e.into());
            }
        };

        self.finish_cover_swap(&existing, &new_cover).await;
        self.invalidate_search_caches().await;
        info!("Replaced book {} ({})", updated.id, updated.title);
        Ok(MutationResponse {
            message: "Book fully updated".to_string(),
            book: self.to_response(updated),
        })
    }

    /// Apply a partial update; absent fields keep their stored values
    pub async fn patch_book(
        &self,
        id: i64,
        patch: BookPatch,
        cover: Option<CoverUpload>,
    ) -> AppResult<MutationResponse> {
        self.guard_reserved_range(id)?;
        patch.validate()?;

        let existing = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))?;

        let (_, new_cover) = self.stage_cover(&existing, cover).await?;

        let updated = match self.repository.patch(id, &patch, new_cover.clone()).await {
            Ok(Some(book)) => book,
            Ok(None) => {
                self.discard_staged_cover(&new_cover).await;
                return Err(AppError::not_found("Book not found"));
            }
            Err(e) => {
                self.discard_staged_cover(&new_cover).await;
                return Err(e.into());
            }
        };

        self.finish_cover_swap(&existing, &new_cover).await;
        self.invalidate_search_caches().await;
        info!("Patched book {} ({})", updated.id, updated.title);
        Ok(MutationResponse {
            message: "Book partially updated".to_string(),
            book: self.to_response(updated),
        })
    }

    fn guard_reserved_range(&self, id: i64) -> AppResult<()> {
        if id >= EXTERNAL_ID_FLOOR {
            return Err(AppError::permission_denied(
                "Cannot update books from external source",
            ));
        }
        Ok(())
    }

    /// Write a newly uploaded cover (if any) and return the image file to
    /// persist plus the staged name. The old file stays on disk until the
    /// update has committed.
    async fn stage_cover(
        &self,
        existing: &Book,
        cover: Option<CoverUpload>,
    ) -> AppResult<(Option<String>, Option<String>)> {
        match cover {
            Some(upload) => {
                let name = self.covers.save(&upload.data, &upload.extension).await?;
                Ok((Some(name.clone()), Some(name)))
            }
            None => Ok((existing.image_file.clone(), None)),
        }
    }

    async fn discard_staged_cover(&self, new_cover: &Option<String>) {
        if let Some(file) = new_cover {
            let _ = self.covers.delete(file).await;
        }
    }

    /// After a committed update that introduced a new cover, remove the
    /// superseded file
    async fn finish_cover_swap(&self, existing: &Book, new_cover: &Option<String>) {
        if new_cover.is_some() {
            if let Some(old) = &existing.image_file {
                let _ = self.covers.delete(old).await;
            }
        }
    }

    async fn invalidate_search_caches(&self) {
        self.cache.invalidate_prefix(keys::BOOKS_SEARCH).await;
        self.cache.invalidate_prefix(keys::AUTHORS_SEARCH).await;
    }

    fn to_response(&self, book: Book) -> BookResponse {
        BookResponse::from_book(book, &self.base_url)
    }
}
