use async_trait::async_trait;

use crate::results::ResultSet;

/// Raw failure reported by the backend for one submitted statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbFailure {
    /// Five-character SQLSTATE; absent when the failure never reached the server
    /// (closed socket, protocol error).
    pub sqlstate: Option<String>,
    /// Primary diagnostic message.
    pub message: String,
}

impl DbFailure {
    #[must_use]
    pub fn new(sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sqlstate: Some(sqlstate.into()),
            message: message.into(),
        }
    }
}

/// One live database session able to run already-translated SQL.
///
/// Implementations submit `sql` with `binds` positionally matched to `$1..$n` and hand
/// back every returned row plus the command-tag row count. They never translate,
/// classify, or retry; that happens above this seam.
#[async_trait]
pub trait SqlBackend: Send {
    async fn submit(&mut self, sql: &str, binds: &[String]) -> Result<ResultSet, DbFailure>;
}

#[async_trait]
impl<'a, B: SqlBackend + ?Sized> SqlBackend for &'a mut B {
    async fn submit(&mut self, sql: &str, binds: &[String]) -> Result<ResultSet, DbFailure> {
        (**self).submit(sql, binds).await
    }
}

#[async_trait]
impl<B: SqlBackend + ?Sized> SqlBackend for Box<B> {
    async fn submit(&mut self, sql: &str, binds: &[String]) -> Result<ResultSet, DbFailure> {
        (**self).submit(sql, binds).await
    }
}
