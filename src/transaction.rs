use std::num::NonZeroU32;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::SqlBackend;
use crate::classify::is_retryable;
use crate::error::{CatalogSqlError, StatementError, TxStep};
use crate::statement::{
    BEGIN, COMMIT, RELEASE_SAVEPOINT, ROLLBACK, ROLLBACK_TO_SAVEPOINT, SAVEPOINT,
    StatementOutcome, execute,
};

/// Future returned by one run of a unit of work.
pub type WorkFuture<'c, T> = BoxFuture<'c, Result<T, CatalogSqlError>>;

/// Where a session's transaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    NotStarted,
    Active,
    Committed,
    RolledBack,
}

/// How many times a unit of work may run when the backend keeps reporting
/// serialization conflicts.
///
/// The default is unbounded: short catalog operations are retried until they land.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total runs of the unit of work, first attempt included. `None` means no limit.
    pub max_attempts: Option<NonZeroU32>,
}

impl RetryPolicy {
    #[must_use]
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    #[must_use]
    pub fn with_max_attempts(max_attempts: NonZeroU32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    fn allows_another(self, attempts_so_far: u32) -> bool {
        self.max_attempts
            .is_none_or(|max| attempts_so_far < max.get())
    }
}

/// Run `work` inside `begin` / `savepoint` / `release savepoint` / `commit`,
/// re-running it after a serialization conflict on release.
///
/// See [`run_transaction_tracked`] for the protocol.
///
/// # Errors
/// Same as [`run_transaction_tracked`].
pub async fn run_transaction<B, T, F>(
    conn: &mut B,
    policy: RetryPolicy,
    work: F,
) -> Result<T, CatalogSqlError>
where
    B: SqlBackend + ?Sized,
    F: for<'c> FnMut(&'c mut B) -> WorkFuture<'c, T>,
{
    let mut state = TransactionState::NotStarted;
    run_transaction_tracked(conn, &mut state, policy, work).await
}

/// Transaction retry engine, recording every state change in `state`.
///
/// 1. `begin`, then `savepoint cockroach_restart`; either failing is returned as is.
/// 2. Run `work`. An `Err` is returned untouched and the transaction is left open
///    (`state` stays [`TransactionState::Active`]); the caller owns the cleanup.
/// 3. `release savepoint cockroach_restart`, then `commit`.
/// 4. If the release fails with SQLSTATE `40001`, `rollback to savepoint
///    cockroach_restart` and go back to 2. Any other release failure, a failed
///    rollback-to-savepoint, or an exhausted [`RetryPolicy`] ends in a full
///    `rollback`.
///
/// # Errors
/// - [`CatalogSqlError::TransactionControl`] naming the failed step.
/// - [`CatalogSqlError::RetryLimitExceeded`] when the policy ceiling is hit.
/// - Whatever `work` returned.
pub async fn run_transaction_tracked<B, T, F>(
    conn: &mut B,
    state: &mut TransactionState,
    policy: RetryPolicy,
    mut work: F,
) -> Result<T, CatalogSqlError>
where
    B: SqlBackend + ?Sized,
    F: for<'c> FnMut(&'c mut B) -> WorkFuture<'c, T>,
{
    debug!("calling begin");
    control(conn, BEGIN, TxStep::Begin).await?;
    *state = TransactionState::Active;

    debug!("calling savepoint");
    control(conn, SAVEPOINT, TxStep::Savepoint).await?;

    debug!("starting retry loop");
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        debug!(attempt = attempts, "running unit of work");

        let value = match work(conn).await {
            Ok(value) => value,
            Err(err) => {
                // no rollback here; the open transaction is the caller's to resolve
                warn!(attempt = attempts, error = %err, "unit of work failed");
                return Err(err);
            }
        };

        let release_err = match execute(conn, RELEASE_SAVEPOINT, &[]).await {
            StatementOutcome::Error(err) => err,
            StatementOutcome::Success(_) | StatementOutcome::SuccessNoRows(_) => {
                debug!("calling commit");
                if let Err(err) = control(conn, COMMIT, TxStep::Commit).await {
                    // a failed commit ends the transaction on the server
                    *state = TransactionState::RolledBack;
                    return Err(err);
                }
                *state = TransactionState::Committed;
                debug!(attempts, "committed");
                return Ok(value);
            }
        };
        warn!(attempt = attempts, error = %release_err, "release savepoint failure");

        let mut limit_hit = false;
        if is_retryable(&release_err) {
            if policy.allows_another(attempts) {
                match execute(conn, ROLLBACK_TO_SAVEPOINT, &[]).await {
                    StatementOutcome::Error(err) => {
                        warn!(error = %err, "rollback to savepoint failure");
                    }
                    StatementOutcome::Success(_) | StatementOutcome::SuccessNoRows(_) => {
                        debug!(attempt = attempts, "serialization conflict, retrying");
                        continue;
                    }
                }
            } else {
                warn!(attempts, "retry limit reached");
                limit_hit = true;
            }
        }

        return abort(conn, state, release_err, limit_hit.then_some(attempts)).await;
    }
}

async fn abort<B, T>(
    conn: &mut B,
    state: &mut TransactionState,
    release_err: StatementError,
    limit_hit_after: Option<u32>,
) -> Result<T, CatalogSqlError>
where
    B: SqlBackend + ?Sized,
{
    control(conn, ROLLBACK, TxStep::Rollback).await?;
    *state = TransactionState::RolledBack;
    match limit_hit_after {
        Some(attempts) => Err(CatalogSqlError::RetryLimitExceeded { attempts }),
        None => Err(CatalogSqlError::TransactionControl {
            step: TxStep::ReleaseSavepoint,
            source: release_err,
        }),
    }
}

async fn control<B>(conn: &mut B, sql: &str, step: TxStep) -> Result<(), CatalogSqlError>
where
    B: SqlBackend + ?Sized,
{
    match execute(conn, sql, &[]).await {
        StatementOutcome::Error(source) => {
            warn!(%step, error = %source, "{step} failure");
            Err(CatalogSqlError::TransactionControl { step, source })
        }
        StatementOutcome::Success(_) | StatementOutcome::SuccessNoRows(_) => Ok(()),
    }
}
