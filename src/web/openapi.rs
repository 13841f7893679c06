//! OpenAPI documentation generation using utoipa
//!
//! Handler functions carry `#[utoipa::path]` annotations; schemas derive
//! `ToSchema`. The assembled specification is served as JSON.

use axum::{Json, response::IntoResponse};
use utoipa::OpenApi;

use crate::models::{
    AuthorCount, AuthorSearchResults, BookResponse, BookSearchResults, BookSource, CacheStatus,
    MutationResponse,
};
use crate::web::handlers;
use crate::web::responses::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Book Catalog API",
        description = "Book catalog with cached search, an external seed set and cover uploads"
    ),
    tags(
        (name = "books", description = "Book search and mutations"),
        (name = "authors", description = "Author aggregation"),
        (name = "health", description = "Service health")
    ),
    paths(
        handlers::books::search,
        handlers::books::create,
        handlers::books::replace,
        handlers::books::update,
        handlers::books::remove,
        handlers::authors::search,
        handlers::health::health,
    ),
    components(schemas(
        BookResponse,
        BookSearchResults,
        BookSource,
        CacheStatus,
        AuthorCount,
        AuthorSearchResults,
        MutationResponse,
        ErrorResponse,
        handlers::health::HealthResponse,
    ))
)]
pub struct ApiDoc;

/// Get the OpenAPI specification with the crate version filled in
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    let mut openapi = ApiDoc::openapi();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi
}

/// Serve the OpenAPI specification JSON
pub async fn serve_openapi_spec() -> impl IntoResponse {
    Json(get_openapi_spec())
}
