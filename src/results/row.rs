use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// One row of a query result, sharing its column names with the rest of the set.
#[derive(Debug, Clone)]
pub struct CatalogRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
    // Shared name -> index lookup, built once per result set
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl CatalogRow {
    /// Create a row, building a fresh name lookup for it.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index_cache.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Column `index` rendered as text, the way catalog code consumes values.
    #[must_use]
    pub fn get_text(&self, index: usize) -> Option<String> {
        self.values.get(index).map(RowValues::to_text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(column_names.len());
    // first occurrence wins for duplicated names, like a linear scan would
    for (i, name) in column_names.iter().enumerate() {
        map.entry(name.clone()).or_insert(i);
    }
    map
}
