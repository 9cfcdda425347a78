use tracing::{debug, warn};

use crate::backend::SqlBackend;
use crate::classify::statement_error;
use crate::error::{CatalogErrorCode, CatalogSqlError, StatementError};
use crate::results::ResultSet;
use crate::translation::translate;

/// Savepoint name used by the retry protocol. CockroachDB treats this name as the
/// client-side retry marker; Postgres accepts it as an ordinary savepoint.
pub const RETRY_SAVEPOINT: &str = "cockroach_restart";

pub(crate) const BEGIN: &str = "begin";
pub(crate) const COMMIT: &str = "commit";
pub(crate) const ROLLBACK: &str = "rollback";
pub(crate) const SAVEPOINT: &str = "savepoint cockroach_restart";
pub(crate) const RELEASE_SAVEPOINT: &str = "release savepoint cockroach_restart";
pub(crate) const ROLLBACK_TO_SAVEPOINT: &str = "rollback to savepoint cockroach_restart";

const TRANSACTION_CONTROL: [&str; 6] = [
    BEGIN,
    COMMIT,
    ROLLBACK,
    SAVEPOINT,
    RELEASE_SAVEPOINT,
    ROLLBACK_TO_SAVEPOINT,
];

/// Whether `sql` is exactly one of the reserved transaction-control phrases
/// (case-insensitive, no surrounding whitespace, no trailing semicolon).
#[must_use]
pub fn is_transaction_control(sql: &str) -> bool {
    TRANSACTION_CONTROL
        .iter()
        .any(|phrase| sql.eq_ignore_ascii_case(phrase))
}

/// Result of running exactly one statement.
#[derive(Debug, Clone)]
pub enum StatementOutcome {
    /// The statement ran; any returned rows are carried along.
    Success(ResultSet),
    /// The statement ran but matched or touched nothing.
    SuccessNoRows(ResultSet),
    Error(StatementError),
}

impl StatementOutcome {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, StatementOutcome::Error(_))
    }

    /// Domain code for the non-success tags, `None` for plain success.
    #[must_use]
    pub fn code(&self) -> Option<CatalogErrorCode> {
        match self {
            StatementOutcome::Success(_) => None,
            StatementOutcome::SuccessNoRows(_) => Some(CatalogErrorCode::SuccessButWithNoInfo),
            StatementOutcome::Error(err) => Some(err.code),
        }
    }

    /// Rows for either success tag; the error otherwise.
    ///
    /// # Errors
    /// Returns the classified statement error when the statement failed.
    pub fn into_result(self) -> Result<ResultSet, StatementError> {
        match self {
            StatementOutcome::Success(rs) | StatementOutcome::SuccessNoRows(rs) => Ok(rs),
            StatementOutcome::Error(err) => Err(err),
        }
    }
}

/// Status of a statement whose rows, if any, are not wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementStatus {
    Success,
    NoRows,
}

/// Translate, submit, and classify one statement.
///
/// Success with a zero command-tag row count is reported as
/// [`StatementOutcome::SuccessNoRows`], except for the reserved transaction-control
/// phrases which are always plain success.
pub async fn execute<B>(conn: &mut B, sql: &str, binds: &[String]) -> StatementOutcome
where
    B: SqlBackend + ?Sized,
{
    let sql = translate(sql);
    debug!(sql = %sql, binds = binds.len(), "submitting statement");

    match conn.submit(&sql, binds).await {
        Ok(rs) => {
            debug!(
                columns = rs.column_count(),
                rows = rs.len(),
                rows_affected = rs.rows_affected,
                "statement ok"
            );
            if rs.rows_affected == 0 && !is_transaction_control(&sql) {
                StatementOutcome::SuccessNoRows(rs)
            } else {
                StatementOutcome::Success(rs)
            }
        }
        Err(failure) => {
            log_bind_variables(binds);
            warn!(
                sql = %sql,
                sqlstate = failure.sqlstate.as_deref().unwrap_or(""),
                message = %failure.message,
                "statement failed"
            );
            StatementOutcome::Error(statement_error(failure.sqlstate, failure.message))
        }
    }
}

/// Run a statement for its effect only.
///
/// # Errors
/// Returns [`CatalogSqlError::Statement`] carrying the classified failure.
pub async fn execute_no_result<B>(
    conn: &mut B,
    sql: &str,
    binds: &[String],
) -> Result<StatementStatus, CatalogSqlError>
where
    B: SqlBackend + ?Sized,
{
    match execute(conn, sql, binds).await {
        StatementOutcome::Success(_) => Ok(StatementStatus::Success),
        StatementOutcome::SuccessNoRows(_) => Ok(StatementStatus::NoRows),
        StatementOutcome::Error(err) => Err(err.into()),
    }
}

fn log_bind_variables(binds: &[String]) {
    for (i, value) in binds.iter().enumerate() {
        warn!("bindVar[{}]={}", i + 1, value);
    }
}
