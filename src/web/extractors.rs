//! Request parameter extraction and validation
//!
//! Query parameters are validated at the boundary; handlers receive
//! already-checked values.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{TEXT_FIELD_MAX, TEXT_FIELD_MIN};

fn default_limit() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
struct RawBookSearchParams {
    q: String,
    #[serde(default)]
    skip: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

/// Validated parameters for `GET /books`
#[derive(Debug, Clone)]
pub struct BookSearchParams {
    pub q: String,
    pub skip: u64,
    pub limit: u64,
}

impl<S> FromRequestParts<S> for BookSearchParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<RawBookSearchParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.to_string()))?;

        let len = raw.q.chars().count();
        if len < TEXT_FIELD_MIN || len > TEXT_FIELD_MAX {
            return Err(AppError::validation(format!(
                "q must be between {} and {} characters",
                TEXT_FIELD_MIN, TEXT_FIELD_MAX
            )));
        }

        Ok(Self {
            q: raw.q,
            skip: raw.skip,
            limit: raw.limit,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawAuthorSearchParams {
    q: String,
}

/// Validated parameters for `GET /authors`
#[derive(Debug, Clone)]
pub struct AuthorSearchParams {
    pub q: String,
}

impl<S> FromRequestParts<S> for AuthorSearchParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<RawAuthorSearchParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.to_string()))?;

        let len = raw.q.chars().count();
        if len < 1 || len > TEXT_FIELD_MAX {
            return Err(AppError::validation(format!(
                "q must be between 1 and {} characters",
                TEXT_FIELD_MAX
            )));
        }

        Ok(Self { q: raw.q })
    }
}
