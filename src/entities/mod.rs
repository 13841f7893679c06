//! SeaORM entity definitions

pub mod books;
pub mod prelude;
