use std::collections::HashMap;
use std::sync::Arc;

use super::row::{CatalogRow, index_columns};
use crate::types::RowValues;

/// Rows returned by one statement execution.
///
/// This is the native result handle a cursor owns: dropping it releases the rows.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CatalogRow>,
    /// Row count reported in the backend's command tag (rows matched by a SELECT,
    /// rows touched by DML, zero for DDL and transaction control)
    pub rows_affected: u64,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns with room for `capacity` rows.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, capacity: usize) -> ResultSet {
        let column_index = Arc::new(index_columns(&column_names));
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// A result with no columns and no rows, as produced by DDL and transaction control.
    #[must_use]
    pub fn command(rows_affected: u64) -> ResultSet {
        ResultSet {
            rows_affected,
            ..ResultSet::default()
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Number of rows held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append a row; values are positional against the column names.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.results.push(CatalogRow {
            column_names: Arc::clone(&self.column_names),
            values: row_values,
            column_index_cache: Arc::clone(&self.column_index),
        });
    }

    /// Set the command-tag row count.
    #[must_use]
    pub fn with_rows_affected(mut self, rows_affected: u64) -> ResultSet {
        self.rows_affected = rows_affected;
        self
    }
}
