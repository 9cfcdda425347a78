//! Low-level SQL execution layer for a catalog stored in PostgreSQL or CockroachDB.
//!
//! Two pieces do the real work:
//!
//! - [`transaction::run_transaction`] wraps a unit of catalog work in
//!   `begin`/`savepoint`/`commit` and transparently re-runs it when the backend reports
//!   a serialization conflict (SQLSTATE `40001`) on release of the savepoint.
//! - [`cursor::ResultCursor`] walks query results either fully buffered or page by
//!   page, holding one result at a time, and [`registry::CursorRegistry`] hands out
//!   small integer handles to them.
//!
//! Statements are written with portable `?` placeholders; [`translation`] turns them
//! into `$n` and rewrites `LIKE` to `SIMILAR TO` before submission. Failures come back
//! classified into [`CatalogErrorCode`]s.
//!
//! ```rust,no_run
//! use catalog_sql::prelude::*;
//!
//! # async fn demo() -> Result<(), CatalogSqlError> {
//! let params = ConnectParams::new("localhost", 26257, "icat").with_credentials("irods", "");
//! let mut session = CatalogSession::new(PgConnection::connect(&params).await?);
//!
//! let coll_id = session
//!     .run_transaction(|conn| {
//!         Box::pin(async move {
//!             execute_no_result(
//!                 conn,
//!                 "insert into r_coll_main (coll_id, coll_name) values (?, ?)",
//!                 &["10020".to_string(), "/tempZone/home/alice".to_string()],
//!             )
//!             .await?;
//!             Ok(10020)
//!         })
//!     })
//!     .await?;
//!
//! let (handle, mut step) = session
//!     .open_query(
//!         "select coll_name from r_coll_main where coll_id = ?",
//!         vec![coll_id.to_string()],
//!     )
//!     .await?;
//! while step == CursorStep::HasRow {
//!     println!("{}", session.cursor(handle)?.value(0).unwrap_or_default());
//!     step = session.advance(handle).await?;
//! }
//! session.free_cursor(handle)?;
//! session.into_backend().disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod classify;
pub mod cursor;
pub mod error;
pub mod postgres;
pub mod prelude;
pub mod registry;
pub mod results;
pub mod session;
pub mod statement;
pub mod transaction;
pub mod translation;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::{CatalogErrorCode, CatalogSqlError, StatementError};
pub use postgres::{ConnectParams, PgConnection};
pub use session::CatalogSession;
pub use types::RowValues;
