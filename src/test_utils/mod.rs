//! Helpers for tests that need a real PostgreSQL server.

/// Embedded `PostgreSQL` instance management
pub mod embedded;

pub use embedded::{EmbeddedCatalogDb, setup_catalog_db};
