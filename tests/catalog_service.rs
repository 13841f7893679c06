//! Catalog service integration tests
//!
//! Exercises the full service stack (repository, seed catalog, cover
//! storage, query cache) over an in-memory SQLite database and the
//! in-process cache store.

use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use book_catalog::cache::{InMemoryCacheStore, QueryCache};
use book_catalog::covers::CoverStorage;
use book_catalog::database::migrations::Migrator;
use book_catalog::database::repositories::BookRepository;
use book_catalog::errors::AppError;
use book_catalog::models::{BookFields, BookPatch, CacheStatus, EXTERNAL_ID_FLOOR};
use book_catalog::seed::SeedCatalog;
use book_catalog::services::{CatalogService, CoverUpload};

fn python_seed() -> SeedCatalog {
    SeedCatalog::from_records(vec![
        (
            "Learning Python".to_string(),
            "Mark Lutz".to_string(),
            "O'Reilly".to_string(),
            2013,
        ),
        (
            "Fluent Python".to_string(),
            "Luciano Ramalho".to_string(),
            "O'Reilly".to_string(),
            2015,
        ),
        (
            "Python Crash Course".to_string(),
            "Eric Matthes".to_string(),
            "No Starch".to_string(),
            2015,
        ),
    ])
}

async fn service_with_seed(seed: SeedCatalog) -> (CatalogService, TempDir) {
    let connection = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    Migrator::up(&connection, None)
        .await
        .expect("failed to run migrations");

    let repository = BookRepository::new(Arc::new(connection));
    let cache = QueryCache::new(Arc::new(InMemoryCacheStore::new()));
    let dir = TempDir::new().expect("failed to create temp dir");
    let covers = CoverStorage::new(dir.path());
    covers.ensure_dir().await.expect("failed to create image dir");

    let service = CatalogService::new(
        repository,
        Arc::new(seed),
        cache,
        covers,
        "http://127.0.0.1:8000".to_string(),
        Duration::from_secs(60),
        Duration::from_secs(120),
    );
    (service, dir)
}

fn sample_fields(title: &str, author: &str) -> BookFields {
    BookFields {
        title: title.to_string(),
        author: author.to_string(),
        publisher: "Addison".to_string(),
        first_publish_year: 1999,
    }
}

fn image_file_name(image_url: &str) -> String {
    image_url
        .rsplit('/')
        .next()
        .expect("image url has no file name")
        .to_string()
}

#[tokio::test]
async fn test_search_is_miss_then_hit() {
    let (service, _dir) = service_with_seed(SeedCatalog::empty()).await;
    service
        .create_book(sample_fields("Refactoring", "Fowler"), None)
        .await
        .unwrap();

    let first = service.search_books("refactoring", 0, Some(10)).await.unwrap();
    assert_eq!(first.cache, CacheStatus::Miss);
    assert_eq!(first.total_count, 1);

    let second = service.search_books("refactoring", 0, Some(10)).await.unwrap();
    assert_eq!(second.cache, CacheStatus::Hit);
    assert_eq!(second.total_count, first.total_count);
    assert_eq!(second.results, first.results);
}

#[tokio::test]
async fn test_create_invalidates_cached_searches() {
    let (service, _dir) = service_with_seed(SeedCatalog::empty()).await;
    service
        .create_book(sample_fields("Refactoring", "Fowler"), None)
        .await
        .unwrap();

    // warm the cache
    let warm = service.search_books("fowler", 0, Some(10)).await.unwrap();
    assert_eq!(warm.cache, CacheStatus::Miss);
    assert_eq!(
        service
            .search_books("fowler", 0, Some(10))
            .await
            .unwrap()
            .cache,
        CacheStatus::Hit
    );

    service
        .create_book(sample_fields("Analysis Patterns", "Fowler"), None)
        .await
        .unwrap();

    // no stale hit: the repeated query recomputes and sees the new book
    let after = service.search_books("fowler", 0, Some(10)).await.unwrap();
    assert_eq!(after.cache, CacheStatus::Miss);
    assert_eq!(after.total_count, 2);
}

#[tokio::test]
async fn test_pagination_slices_store_before_seed() {
    let (service, _dir) = service_with_seed(python_seed()).await;
    service
        .create_book(sample_fields("Python Tricks", "Dan Bader"), None)
        .await
        .unwrap();
    service
        .create_book(sample_fields("Effective Python", "Brett Slatkin"), None)
        .await
        .unwrap();

    let full = service.search_books("python", 0, None).await.unwrap();
    assert_eq!(full.total_count, 5);
    // store records first, in id order, then seed records in seed order
    let ids: Vec<i64> = full.results.iter().map(|b| b.id).collect();
    assert!(ids[0] < EXTERNAL_ID_FLOOR && ids[1] < EXTERNAL_ID_FLOOR);
    assert_eq!(&ids[2..], &[999, 1000, 1001]);

    // slice [k, k+L) of the combined ordering
    let page = service.search_books("python", 1, Some(2)).await.unwrap();
    assert_eq!(page.total_count, 5);
    assert_eq!(page.results, full.results[1..3].to_vec());

    // tail clamp: len == max(0, min(L, N-k))
    let tail = service.search_books("python", 4, Some(10)).await.unwrap();
    assert_eq!(tail.results.len(), 1);
    assert_eq!(tail.results, full.results[4..].to_vec());

    let past_end = service.search_books("python", 9, Some(10)).await.unwrap();
    assert!(past_end.results.is_empty());
    assert_eq!(past_end.total_count, 5);
}

#[tokio::test]
async fn test_reserved_range_is_immutable() {
    let (service, _dir) = service_with_seed(python_seed()).await;

    let err = service
        .replace_book(999, sample_fields("Hijack", "Nobody"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied { .. }));

    let err = service
        .patch_book(1000, BookPatch::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied { .. }));
}

#[tokio::test]
async fn test_created_book_gets_owned_id_and_no_image() {
    let (service, _dir) = service_with_seed(python_seed()).await;

    let created = service
        .create_book(sample_fields("Refactoring", "Fowler"), None)
        .await
        .unwrap();
    assert!(created.id < EXTERNAL_ID_FLOOR);
    assert!(created.image_url.is_none());
}

#[tokio::test]
async fn test_create_rejects_invalid_fields() {
    let (service, _dir) = service_with_seed(SeedCatalog::empty()).await;

    let err = service
        .create_book(sample_fields("ab", "Fowler"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_authors_merge_store_and_seed_counts() {
    let (service, _dir) = service_with_seed(python_seed()).await;
    service
        .create_book(sample_fields("Programming Python", "Mark Lutz"), None)
        .await
        .unwrap();

    let results = service.search_authors("lutz").await.unwrap();
    assert_eq!(results.cache, CacheStatus::Miss);
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0].author, "Mark Lutz");
    // one stored record plus one seed record
    assert_eq!(results.results[0].book_count, 2);

    let cached = service.search_authors("lutz").await.unwrap();
    assert_eq!(cached.cache, CacheStatus::Hit);
}

#[tokio::test]
async fn test_authors_without_matches_is_not_found() {
    let (service, _dir) = service_with_seed(python_seed()).await;

    let err = service.search_authors("zzz_nonexistent").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_removes_cover_and_empties_caches() {
    let (service, dir) = service_with_seed(SeedCatalog::empty()).await;

    let created = service
        .create_book(
            sample_fields("Refactoring", "Fowler"),
            Some(CoverUpload {
                data: b"png bytes".to_vec(),
                extension: "png".to_string(),
            }),
        )
        .await
        .unwrap();
    let file_name = image_file_name(created.image_url.as_deref().unwrap());
    assert!(dir.path().join(&file_name).exists());

    // warm both caches
    service.search_books("fowler", 0, Some(10)).await.unwrap();
    service.search_authors("fowler").await.unwrap();

    let removed = service.delete_book(created.id).await.unwrap();
    assert_eq!(removed.message, "Book deleted successfully");
    assert_eq!(removed.book.id, created.id);
    assert!(!dir.path().join(&file_name).exists());

    // prior entries under both prefixes are gone
    let books = service.search_books("fowler", 0, Some(10)).await.unwrap();
    assert_eq!(books.cache, CacheStatus::Miss);
    assert_eq!(books.total_count, 0);
    let authors = service.search_authors("fowler").await.unwrap_err();
    assert!(matches!(authors, AppError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_with_unremovable_cover_still_invalidates() {
    let (service, dir) = service_with_seed(SeedCatalog::empty()).await;

    let created = service
        .create_book(
            sample_fields("Refactoring", "Fowler"),
            Some(CoverUpload {
                data: b"png bytes".to_vec(),
                extension: "png".to_string(),
            }),
        )
        .await
        .unwrap();
    let file_name = image_file_name(created.image_url.as_deref().unwrap());

    // warm the cache
    service.search_books("fowler", 0, Some(10)).await.unwrap();

    // make the stored name unremovable: swap the file for a non-empty
    // directory so remove_file fails with something other than NotFound
    let cover_path = dir.path().join(&file_name);
    std::fs::remove_file(&cover_path).unwrap();
    std::fs::create_dir(&cover_path).unwrap();
    std::fs::write(cover_path.join("nested"), b"x").unwrap();

    // the row delete commits, so the request succeeds regardless
    let removed = service.delete_book(created.id).await.unwrap();
    assert_eq!(removed.book.id, created.id);

    // no stale hit: invalidation ran even though the cover removal failed
    let after = service.search_books("fowler", 0, Some(10)).await.unwrap();
    assert_eq!(after.cache, CacheStatus::Miss);
    assert_eq!(after.total_count, 0);
}

#[tokio::test]
async fn test_delete_missing_book_is_not_found() {
    let (service, _dir) = service_with_seed(SeedCatalog::empty()).await;

    let err = service.delete_book(12345).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn test_replace_swaps_cover_after_commit() {
    let (service, dir) = service_with_seed(SeedCatalog::empty()).await;

    let created = service
        .create_book(
            sample_fields("Refactoring", "Fowler"),
            Some(CoverUpload {
                data: b"old".to_vec(),
                extension: "png".to_string(),
            }),
        )
        .await
        .unwrap();
    let old_file = image_file_name(created.image_url.as_deref().unwrap());

    let updated = service
        .replace_book(
            created.id,
            sample_fields("Refactoring 2nd", "Fowler"),
            Some(CoverUpload {
                data: b"new".to_vec(),
                extension: "png".to_string(),
            }),
        )
        .await
        .unwrap();
    assert_eq!(updated.message, "Book fully updated");
    assert_eq!(updated.book.title, "Refactoring 2nd");

    let new_file = image_file_name(updated.book.image_url.as_deref().unwrap());
    assert_ne!(new_file, old_file);
    assert!(dir.path().join(&new_file).exists());
    assert!(!dir.path().join(&old_file).exists());
}

#[tokio::test]
async fn test_patch_keeps_absent_fields_and_cover() {
    let (service, dir) = service_with_seed(SeedCatalog::empty()).await;

    let created = service
        .create_book(
            sample_fields("Refactoring", "Fowler"),
            Some(CoverUpload {
                data: b"cover".to_vec(),
                extension: "png".to_string(),
            }),
        )
        .await
        .unwrap();
    let file_name = image_file_name(created.image_url.as_deref().unwrap());

    let patch = BookPatch {
        title: Some("Refactoring, Improved".to_string()),
        ..Default::default()
    };
    let updated = service.patch_book(created.id, patch, None).await.unwrap();
    assert_eq!(updated.message, "Book partially updated");
    assert_eq!(updated.book.title, "Refactoring, Improved");
    assert_eq!(updated.book.author, "Fowler");
    // the stored cover survives a cover-less patch
    assert_eq!(
        image_file_name(updated.book.image_url.as_deref().unwrap()),
        file_name
    );
    assert!(dir.path().join(&file_name).exists());
}

#[tokio::test]
async fn test_replace_missing_book_is_not_found() {
    let (service, _dir) = service_with_seed(SeedCatalog::empty()).await;

    let err = service
        .replace_book(42, sample_fields("Ghost Book", "Nobody"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}
