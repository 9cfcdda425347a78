#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use catalog_sql::RowValues;
use catalog_sql::backend::{DbFailure, SqlBackend};
use catalog_sql::results::ResultSet;

/// In-memory stand-in for the catalog database.
///
/// Records every submitted statement with its binds. Queued one-shot failures win,
/// then exact-match canned results, then paging over `names` for SQL carrying
/// `LIMIT n OFFSET m`, and finally a generic one-row command result.
#[derive(Default)]
pub struct FakeCatalog {
    pub log: Vec<(String, Vec<String>)>,
    canned: HashMap<String, ResultSet>,
    failures: VecDeque<(String, DbFailure)>,
    names: Vec<String>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(count: usize) -> Self {
        Self {
            names: (0..count).map(|i| format!("/tempZone/home/obj{i:03}")).collect(),
            ..Self::default()
        }
    }

    pub fn respond(&mut self, sql: &str, rs: ResultSet) {
        self.canned.insert(sql.to_string(), rs);
    }

    /// Fail the next submission of `sql` (queued failures are consumed in order).
    pub fn fail_next(&mut self, sql: &str, sqlstate: &str, message: &str) {
        self.failures
            .push_back((sql.to_string(), DbFailure::new(sqlstate, message)));
    }

    pub fn statements(&self) -> Vec<&str> {
        self.log.iter().map(|(sql, _)| sql.as_str()).collect()
    }

    pub fn count(&self, sql: &str) -> usize {
        self.log.iter().filter(|(s, _)| s == sql).count()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.log.iter().filter(|(s, _)| s.contains(needle)).count()
    }

    fn page(&self, sql: &str) -> Option<ResultSet> {
        let limit = number_after(sql, "LIMIT")?;
        let offset = number_after(sql, "OFFSET").unwrap_or(0);
        let mut rs = ResultSet::with_columns(vec!["coll_name".into()], limit.min(self.names.len()));
        for name in self.names.iter().skip(offset).take(limit) {
            rs.add_row_values(vec![RowValues::Text(name.clone())]);
        }
        let n = rs.len() as u64;
        Some(rs.with_rows_affected(n))
    }
}

fn number_after(sql: &str, keyword: &str) -> Option<usize> {
    let at = sql.find(keyword)? + keyword.len();
    sql[at..].split_whitespace().next()?.parse().ok()
}

#[async_trait]
impl SqlBackend for FakeCatalog {
    async fn submit(&mut self, sql: &str, binds: &[String]) -> Result<ResultSet, DbFailure> {
        self.log.push((sql.to_string(), binds.to_vec()));

        if self.failures.front().is_some_and(|(s, _)| s == sql) {
            if let Some((_, failure)) = self.failures.pop_front() {
                return Err(failure);
            }
        }
        if let Some(rs) = self.canned.get(sql) {
            return Ok(rs.clone());
        }
        if let Some(rs) = self.page(sql) {
            return Ok(rs);
        }
        Ok(ResultSet::command(1))
    }
}

pub fn binds(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

pub fn text_rows(column: &str, values: &[&str]) -> ResultSet {
    let mut rs = ResultSet::with_columns(vec![column.to_string()], values.len());
    for v in values {
        rs.add_row_values(vec![RowValues::Text((*v).to_string())]);
    }
    let n = rs.len() as u64;
    rs.with_rows_affected(n)
}
