//! HTTP request handlers organized by domain

pub mod authors;
pub mod books;
pub mod health;
