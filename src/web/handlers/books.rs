//! Book endpoints: search plus the mutation pipeline
//!
//! Mutations arrive as multipart forms with text fields and an optional
//! `image` file part, mirroring the upload-centric API shape.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};

use crate::errors::{AppError, AppResult};
use crate::models::{BookFields, BookPatch, BookResponse, BookSearchResults, MutationResponse};
use crate::services::CoverUpload;
use crate::web::AppState;
use crate::web::extractors::BookSearchParams;

/// Decoded multipart book form; every field optional at this stage
#[derive(Debug, Default)]
struct BookForm {
    title: Option<String>,
    author: Option<String>,
    publisher: Option<String>,
    first_publish_year: Option<i32>,
    image: Option<CoverUpload>,
}

impl BookForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("malformed multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "title" => form.title = Some(Self::read_text(field).await?),
                "author" => form.author = Some(Self::read_text(field).await?),
                "publisher" => form.publisher = Some(Self::read_text(field).await?),
                "first_publish_year" => {
                    let raw = Self::read_text(field).await?;
                    let year = raw.parse::<i32>().map_err(|_| {
                        AppError::validation("first_publish_year must be an integer")
                    })?;
                    form.first_publish_year = Some(year);
                }
                "image" => {
                    let extension = field
                        .file_name()
                        .and_then(|f| f.rsplit_once('.').map(|(_, ext)| ext.to_string()))
                        .unwrap_or_else(|| "bin".to_string());
                    let data = field.bytes().await.map_err(|e| {
                        AppError::validation(format!("failed to read image upload: {}", e))
                    })?;
                    // an empty file part means no upload
                    if !data.is_empty() {
                        form.image = Some(CoverUpload {
                            data: data.to_vec(),
                            extension,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
        field
            .text()
            .await
            .map_err(|e| AppError::validation(format!("malformed form field: {}", e)))
    }

    /// All text fields required (create and replace)
    fn into_fields(self) -> AppResult<(BookFields, Option<CoverUpload>)> {
        let fields = BookFields {
            title: self
                .title
                .ok_or_else(|| AppError::validation("title is required"))?,
            author: self
                .author
                .ok_or_else(|| AppError::validation("author is required"))?,
            publisher: self
                .publisher
                .ok_or_else(|| AppError::validation("publisher is required"))?,
            first_publish_year: self
                .first_publish_year
                .ok_or_else(|| AppError::validation("first_publish_year is required"))?,
        };
        Ok((fields, self.image))
    }

    /// Every field optional (patch)
    fn into_patch(self) -> (BookPatch, Option<CoverUpload>) {
        (
            BookPatch {
                title: self.title,
                author: self.author,
                publisher: self.publisher,
                first_publish_year: self.first_publish_year,
            },
            self.image,
        )
    }
}

/// Search books across the store and the seed catalog
#[utoipa::path(
    get,
    path = "/books",
    params(
        ("q" = String, Query, description = "Search query, 3-100 characters"),
        ("skip" = Option<u64>, Query, description = "Records to skip, default 0"),
        ("limit" = Option<u64>, Query, description = "Page size, default 10")
    ),
    responses(
        (status = 200, description = "Search results", body = BookSearchResults),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "books"
)]
pub async fn search(
    State(state): State<AppState>,
    params: BookSearchParams,
) -> AppResult<Json<BookSearchResults>> {
    let results = state
        .catalog
        .search_books(&params.q, params.skip, Some(params.limit))
        .await?;
    Ok(Json(results))
}

/// Create a book from a multipart form
#[utoipa::path(
    post,
    path = "/books",
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid form data")
    ),
    tag = "books"
)]
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<BookResponse>)> {
    let (fields, cover) = BookForm::read(multipart).await?.into_fields()?;
    let created = state.catalog.create_book(fields, cover).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Fully replace a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book replaced", body = MutationResponse),
        (status = 403, description = "Id is in the reserved external range"),
        (status = 404, description = "Book not found")
    ),
    tag = "books"
)]
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<MutationResponse>> {
    let (fields, cover) = BookForm::read(multipart).await?.into_fields()?;
    let updated = state.catalog.replace_book(id, fields, cover).await?;
    Ok(Json(updated))
}

/// Partially update a book
#[utoipa::path(
    patch,
    path = "/books/{id}",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book updated", body = MutationResponse),
        (status = 403, description = "Id is in the reserved external range"),
        (status = 404, description = "Book not found")
    ),
    tag = "books"
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<MutationResponse>> {
    let (patch, cover) = BookForm::read(multipart).await?.into_patch();
    let updated = state.catalog.patch_book(id, patch, cover).await?;
    Ok(Json(updated))
}

/// Delete a book and its stored cover
#[utoipa::path(
    delete,
    path = "/books/{id}",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book deleted", body = MutationResponse),
        (status = 404, description = "Book not found")
    ),
    tag = "books"
)]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MutationResponse>> {
    let removed = state.catalog.delete_book(id).await?;
    Ok(Json(removed))
}
