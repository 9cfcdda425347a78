use std::num::NonZeroUsize;

use crate::backend::SqlBackend;
use crate::cursor::{CursorStep, ResultCursor};
use crate::error::CatalogSqlError;
use crate::registry::{CursorHandle, CursorRegistry};
use crate::statement::{self, StatementOutcome, StatementStatus};
use crate::transaction::{RetryPolicy, TransactionState, WorkFuture, run_transaction_tracked};

/// One catalog database session: a connection plus the cursors and transaction
/// state that belong to it.
///
/// Everything goes through `&mut self`, so a session runs one statement, fetch, or
/// transaction at a time. Share it across tasks only behind a lock.
#[derive(Debug)]
pub struct CatalogSession<B> {
    conn: B,
    cursors: CursorRegistry,
    tx_state: TransactionState,
    retry_policy: RetryPolicy,
}

impl<B: SqlBackend> CatalogSession<B> {
    #[must_use]
    pub fn new(conn: B) -> Self {
        Self::with_retry_policy(conn, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_retry_policy(conn: B, retry_policy: RetryPolicy) -> Self {
        Self {
            conn,
            cursors: CursorRegistry::new(),
            tx_state: TransactionState::NotStarted,
            retry_policy,
        }
    }

    /// Run one statement and return its classified outcome.
    pub async fn execute(&mut self, sql: &str, binds: &[String]) -> StatementOutcome {
        statement::execute(&mut self.conn, sql, binds).await
    }

    /// Run one statement for its effect only.
    ///
    /// # Errors
    /// Returns the classified statement error.
    pub async fn execute_no_result(
        &mut self,
        sql: &str,
        binds: &[String],
    ) -> Result<StatementStatus, CatalogSqlError> {
        statement::execute_no_result(&mut self.conn, sql, binds).await
    }

    /// Run `sql` once, buffer every row, and register a cursor positioned on the first.
    ///
    /// # Errors
    /// Returns the classified statement error; no cursor is registered in that case.
    pub async fn open_query(
        &mut self,
        sql: impl Into<String>,
        binds: Vec<String>,
    ) -> Result<(CursorHandle, CursorStep), CatalogSqlError> {
        self.open(ResultCursor::buffered(sql, binds)).await
    }

    /// Page through `base_sql` with `LIMIT`/`OFFSET`, `page_size` rows at a time.
    ///
    /// # Errors
    /// Returns the classified statement error for the first page.
    pub async fn open_paged_query(
        &mut self,
        base_sql: impl Into<String>,
        binds: Vec<String>,
        offset: usize,
        page_size: NonZeroUsize,
    ) -> Result<(CursorHandle, CursorStep), CatalogSqlError> {
        self.open(ResultCursor::paginated_query(base_sql, binds, offset, page_size))
            .await
    }

    /// Page through SQL built per page by `sql_for_page(offset, page_size)`.
    ///
    /// # Errors
    /// Returns the classified statement error for the first page.
    pub async fn open_paged_with<F>(
        &mut self,
        sql_for_page: F,
        binds: Vec<String>,
        offset: usize,
        page_size: NonZeroUsize,
    ) -> Result<(CursorHandle, CursorStep), CatalogSqlError>
    where
        F: Fn(usize, usize) -> String + Send + Sync + 'static,
    {
        self.open(ResultCursor::paginated(sql_for_page, binds, offset, page_size))
            .await
    }

    async fn open(
        &mut self,
        mut cursor: ResultCursor,
    ) -> Result<(CursorHandle, CursorStep), CatalogSqlError> {
        let step = cursor.advance(&mut self.conn).await?;
        Ok((self.cursors.allocate(cursor), step))
    }

    /// Advance the cursor behind `handle`.
    ///
    /// # Errors
    /// Returns [`CatalogSqlError::InvalidCursorHandle`] for a freed handle, or the
    /// statement error from a page fetch.
    pub async fn advance(&mut self, handle: CursorHandle) -> Result<CursorStep, CatalogSqlError> {
        let cursor = self.cursors.get_mut(handle)?;
        cursor.advance(&mut self.conn).await
    }

    /// # Errors
    /// Returns [`CatalogSqlError::InvalidCursorHandle`] for a freed handle.
    pub fn cursor(&self, handle: CursorHandle) -> Result<&ResultCursor, CatalogSqlError> {
        self.cursors.get(handle)
    }

    /// # Errors
    /// Returns [`CatalogSqlError::InvalidCursorHandle`] for a freed handle.
    pub fn free_cursor(&mut self, handle: CursorHandle) -> Result<(), CatalogSqlError> {
        self.cursors.free(handle)
    }

    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.cursors.live()
    }

    /// Run `work` under the savepoint retry protocol.
    ///
    /// # Errors
    /// See [`run_transaction_tracked`].
    pub async fn run_transaction<T, F>(&mut self, work: F) -> Result<T, CatalogSqlError>
    where
        F: for<'c> FnMut(&'c mut B) -> WorkFuture<'c, T>,
    {
        run_transaction_tracked(&mut self.conn, &mut self.tx_state, self.retry_policy, work).await
    }

    #[must_use]
    pub fn transaction_state(&self) -> TransactionState {
        self.tx_state
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Direct access to the connection, e.g. for driver-specific calls.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.conn
    }

    /// Close every cursor and hand back the connection.
    pub fn into_backend(self) -> B {
        self.conn
    }
}
