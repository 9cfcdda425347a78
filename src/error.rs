use std::fmt;

use thiserror::Error;

use crate::registry::CursorHandle;

/// Catalog-level classification of a SQL outcome.
///
/// Callers branch on these rather than on raw SQLSTATEs. The numeric values are the
/// ones the catalog has always used, so they can be surfaced unchanged to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogErrorCode {
    /// Generic SQL failure; the raw SQLSTATE and message travel alongside for diagnostics.
    SqlFailure,
    /// The statement ran fine but matched or affected no rows.
    SuccessButWithNoInfo,
    /// A unique constraint rejected the write because the name is already taken.
    AlreadyHasItemByThatName,
}

impl CatalogErrorCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            CatalogErrorCode::SqlFailure => -806_000,
            CatalogErrorCode::SuccessButWithNoInfo => -808_000,
            CatalogErrorCode::AlreadyHasItemByThatName => -809_000,
        }
    }
}

impl fmt::Display for CatalogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CatalogErrorCode::SqlFailure => "CAT_SQL_ERR",
            CatalogErrorCode::SuccessButWithNoInfo => "CAT_SUCCESS_BUT_WITH_NO_INFO",
            CatalogErrorCode::AlreadyHasItemByThatName => "CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME",
        };
        write!(f, "{name} ({})", self.as_i32())
    }
}

/// A failed statement, reduced to a domain code plus the backend's own diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message} (sqlstate {})", .sqlstate.as_deref().unwrap_or("none"))]
pub struct StatementError {
    pub code: CatalogErrorCode,
    pub sqlstate: Option<String>,
    pub message: String,
}

/// Which transaction-control statement failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStep {
    Begin,
    Savepoint,
    ReleaseSavepoint,
    Commit,
    Rollback,
}

impl fmt::Display for TxStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            TxStep::Begin => "begin",
            TxStep::Savepoint => "savepoint",
            TxStep::ReleaseSavepoint => "release savepoint",
            TxStep::Commit => "commit",
            TxStep::Rollback => "rollback",
        };
        f.write_str(step)
    }
}

#[derive(Debug, Error)]
pub enum CatalogSqlError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    Statement(#[from] StatementError),

    #[error("{step} failure: {source}")]
    TransactionControl {
        step: TxStep,
        #[source]
        source: StatementError,
    },

    #[error("transaction still conflicting after {attempts} attempts")]
    RetryLimitExceeded { attempts: u32 },

    #[error("invalid cursor handle {0}")]
    InvalidCursorHandle(CursorHandle),

    #[error("Other database error: {0}")]
    Other(String),
}

impl CatalogSqlError {
    /// Domain code for this error; anything that did not come from a classified
    /// statement is reported as a generic SQL failure.
    #[must_use]
    pub fn code(&self) -> CatalogErrorCode {
        match self {
            CatalogSqlError::Statement(err)
            | CatalogSqlError::TransactionControl { source: err, .. } => err.code,
            _ => CatalogErrorCode::SqlFailure,
        }
    }

    /// SQLSTATE reported by the backend, when there was one.
    #[must_use]
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            CatalogSqlError::Statement(err)
            | CatalogSqlError::TransactionControl { source: err, .. } => err.sqlstate.as_deref(),
            CatalogSqlError::PostgresError(err) => {
                err.code().map(tokio_postgres::error::SqlState::code)
            }
            _ => None,
        }
    }
}
