//! Business logic services

pub mod catalog;

pub use catalog::{CatalogService, CoverUpload};
