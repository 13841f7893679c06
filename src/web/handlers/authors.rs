//! Author aggregation endpoint

use axum::{Json, extract::State};

use crate::errors::AppResult;
use crate::models::AuthorSearchResults;
use crate::web::AppState;
use crate::web::extractors::AuthorSearchParams;

/// Aggregate per-author book counts across the store and the seed catalog
#[utoipa::path(
    get,
    path = "/authors",
    params(
        ("q" = String, Query, description = "Author search query, 1-100 characters")
    ),
    responses(
        (status = 200, description = "Matching authors with counts", body = AuthorSearchResults),
        (status = 400, description = "Invalid query parameters"),
        (status = 404, description = "No authors matched")
    ),
    tag = "authors"
)]
pub async fn search(
    State(state): State<AppState>,
    params: AuthorSearchParams,
) -> AppResult<Json<AuthorSearchResults>> {
    let results = state.catalog.search_authors(&params.q).await?;
    Ok(Json(results))
}
