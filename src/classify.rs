use crate::error::{CatalogErrorCode, StatementError};

/// Unique-constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Serialization conflict; the only SQLSTATE that triggers a savepoint retry.
pub const SERIALIZATION_FAILURE: &str = "40001";

/// Map a backend SQLSTATE and primary message onto a catalog domain code.
#[must_use]
pub fn classify(sqlstate: Option<&str>, message: &str) -> CatalogErrorCode {
    match sqlstate {
        Some(UNIQUE_VIOLATION) if message.contains("duplicate key") => {
            CatalogErrorCode::AlreadyHasItemByThatName
        }
        _ => CatalogErrorCode::SqlFailure,
    }
}

/// Build the structured error a caller sees for a failed statement.
#[must_use]
pub fn statement_error(sqlstate: Option<String>, message: String) -> StatementError {
    StatementError {
        code: classify(sqlstate.as_deref(), &message),
        sqlstate,
        message,
    }
}

#[must_use]
pub fn is_retryable(err: &StatementError) -> bool {
    err.sqlstate.as_deref() == Some(SERIALIZATION_FAILURE)
}
