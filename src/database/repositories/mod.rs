//! SeaORM repository implementations

pub mod book;

pub use book::BookRepository;
