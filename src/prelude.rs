//! Convenient imports for common functionality.
//!
//! Pulls in the session facade, the pieces a unit of work needs, and the error types.

pub use crate::backend::{DbFailure, SqlBackend};
pub use crate::cursor::{CursorStep, ResultCursor};
pub use crate::error::{CatalogErrorCode, CatalogSqlError, StatementError, TxStep};
pub use crate::postgres::{ConnectParams, PgConnection};
pub use crate::registry::{CursorHandle, CursorRegistry};
pub use crate::results::{CatalogRow, ResultSet};
pub use crate::session::CatalogSession;
pub use crate::statement::{StatementOutcome, StatementStatus, execute, execute_no_result};
pub use crate::transaction::{
    RetryPolicy, TransactionState, WorkFuture, run_transaction, run_transaction_tracked,
};
pub use crate::types::RowValues;
