//! Syllabus SQLite: relational storage engine and scraper seed reader

pub mod error;
pub mod schema;
pub mod store;
pub mod scraper;


pub use error::StoreError;
pub use store::SqliteStore;
pub use scraper::ScraperDb;
