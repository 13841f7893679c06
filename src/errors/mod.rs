//! Centralized error handling for the book catalog service
//!
//! All application layers report failures through the types in this module.
//! Cache backend errors are the one exception: they are absorbed inside the
//! cache adapter and never reach a request handler.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
