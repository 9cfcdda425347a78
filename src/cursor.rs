use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::debug;

use crate::backend::SqlBackend;
use crate::error::CatalogSqlError;
use crate::results::{CatalogRow, ResultSet};
use crate::statement::{StatementOutcome, execute};

/// Builds the SQL for one page from `(offset, page_size)`.
pub type PageSql = Box<dyn Fn(usize, usize) -> String + Send + Sync>;

/// What a call to [`ResultCursor::advance`] landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// [`ResultCursor::current_row`] now points at a row.
    HasRow,
    /// No more rows; every later call reports this again without touching the backend.
    Exhausted,
}

enum Fetch {
    /// Run the query once and walk the materialized rows.
    All { sql: String },
    /// Re-run the query per page, moving the offset by the rows just consumed.
    Paged {
        sql_for_page: PageSql,
        offset: usize,
        page_size: NonZeroUsize,
    },
}

/// Lazy cursor over one or more executions of a query.
///
/// Holds at most one [`ResultSet`] at a time. While a page is held the row index is
/// inside it; once exhausted the cursor holds nothing.
pub struct ResultCursor {
    fetch: Fetch,
    binds: Vec<String>,
    page: Option<ResultSet>,
    row: usize,
    columns: Arc<Vec<String>>,
    finished: bool,
}

impl ResultCursor {
    /// Cursor that runs `sql` once on its first advance and then walks the rows.
    #[must_use]
    pub fn buffered(sql: impl Into<String>, binds: Vec<String>) -> Self {
        Self::with_fetch(Fetch::All { sql: sql.into() }, binds)
    }

    /// Cursor that fetches `page_size` rows at a time, starting at `offset`.
    #[must_use]
    pub fn paginated<F>(
        sql_for_page: F,
        binds: Vec<String>,
        offset: usize,
        page_size: NonZeroUsize,
    ) -> Self
    where
        F: Fn(usize, usize) -> String + Send + Sync + 'static,
    {
        Self::with_fetch(
            Fetch::Paged {
                sql_for_page: Box::new(sql_for_page),
                offset,
                page_size,
            },
            binds,
        )
    }

    /// Paginated cursor over `base_sql` with `LIMIT`/`OFFSET` appended per page.
    /// `base_sql` must not end with a semicolon.
    #[must_use]
    pub fn paginated_query(
        base_sql: impl Into<String>,
        binds: Vec<String>,
        offset: usize,
        page_size: NonZeroUsize,
    ) -> Self {
        let base_sql = base_sql.into();
        Self::paginated(
            move |offset, limit| format!("{base_sql} LIMIT {limit} OFFSET {offset}"),
            binds,
            offset,
            page_size,
        )
    }

    fn with_fetch(fetch: Fetch, binds: Vec<String>) -> Self {
        Self {
            fetch,
            binds,
            page: None,
            row: 0,
            columns: Arc::new(Vec::new()),
            finished: false,
        }
    }

    /// Move to the next row, fetching from the backend when needed.
    ///
    /// # Errors
    /// Returns the classified statement error when a fetch fails; the cursor is
    /// exhausted afterwards.
    pub async fn advance<B>(&mut self, conn: &mut B) -> Result<CursorStep, CatalogSqlError>
    where
        B: SqlBackend + ?Sized,
    {
        if self.finished {
            return Ok(CursorStep::Exhausted);
        }

        if let Some(page) = &self.page {
            if self.row + 1 < page.len() {
                self.row += 1;
                return Ok(CursorStep::HasRow);
            }
        }

        let sql = match &mut self.fetch {
            Fetch::All { sql } => {
                if self.page.is_some() {
                    return Ok(self.finish());
                }
                sql.clone()
            }
            Fetch::Paged {
                sql_for_page,
                offset,
                page_size,
            } => {
                if let Some(consumed) = self.page.take().map(|page| page.len()) {
                    // a short page is the last one
                    if consumed < page_size.get() {
                        return Ok(self.finish());
                    }
                    *offset += consumed;
                }
                debug!(offset = *offset, page_size = page_size.get(), "fetching page");
                sql_for_page(*offset, page_size.get())
            }
        };

        self.row = 0;
        match execute(conn, &sql, &self.binds).await {
            StatementOutcome::Success(rs) | StatementOutcome::SuccessNoRows(rs) => {
                self.columns = Arc::clone(rs.column_names());
                if rs.is_empty() {
                    Ok(self.finish())
                } else {
                    self.page = Some(rs);
                    Ok(CursorStep::HasRow)
                }
            }
            StatementOutcome::Error(err) => {
                self.finish();
                Err(err.into())
            }
        }
    }

    fn finish(&mut self) -> CursorStep {
        self.page = None;
        self.row = 0;
        self.finished = true;
        CursorStep::Exhausted
    }

    /// Row the cursor points at, if it holds one.
    #[must_use]
    pub fn current_row(&self) -> Option<&CatalogRow> {
        self.page.as_ref().and_then(|page| page.results.get(self.row))
    }

    /// Text of column `col` in the current row.
    #[must_use]
    pub fn value(&self, col: usize) -> Option<String> {
        self.current_row().and_then(|row| row.get_text(col))
    }

    /// Column count of the most recent fetch (kept after exhaustion).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_name(&self, col: usize) -> Option<&str> {
        self.columns.get(col).map(String::as_str)
    }

    #[must_use]
    pub fn has_row(&self) -> bool {
        self.page.as_ref().is_some_and(|page| !page.is_empty())
    }

    /// Rows in the currently held page (all rows for a buffered cursor).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.page.as_ref().map_or(0, ResultSet::len)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn is_paginated(&self) -> bool {
        matches!(self.fetch, Fetch::Paged { .. })
    }
}

impl fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCursor")
            .field("paginated", &self.is_paginated())
            .field("binds", &self.binds)
            .field("row", &self.row)
            .field("row_count", &self.row_count())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
