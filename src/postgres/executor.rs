use std::fmt;
use std::pin::pin;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tokio::task::JoinHandle;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::{Client, NoTls, Socket};
use tracing::{debug, error};

use super::config::ConnectParams;
use super::params::text_params;
use super::query::build_result_set_from_statement;
use crate::backend::{DbFailure, SqlBackend};
use crate::error::CatalogSqlError;
use crate::results::ResultSet;

/// A live catalog session over `tokio-postgres`.
///
/// Owns the client and the background task driving its socket. Works against
/// PostgreSQL and CockroachDB alike.
pub struct PgConnection {
    client: Client,
    driver: JoinHandle<()>,
}

impl fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnection")
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}

impl PgConnection {
    /// Open a connection described by `params`, over rustls when any TLS option
    /// asks for it and plain TCP otherwise.
    ///
    /// # Errors
    /// Returns `CatalogSqlError::ConfigError` for invalid parameters or unreadable
    /// certificate files, and `CatalogSqlError::ConnectionError` if the server cannot
    /// be reached or rejects the login or the TLS handshake.
    pub async fn connect(params: &ConnectParams) -> Result<Self, CatalogSqlError> {
        let cfg = params.to_pg_config()?;
        let dialed = match params.tls_settings()? {
            Some(tls) => {
                debug!(mode = ?tls.mode, verification = ?tls.verification, "connecting over TLS");
                dial(&cfg, tls.connector()?).await
            }
            None => dial(&cfg, NoTls).await,
        };
        let (client, driver) = dialed.map_err(|e| {
            error!(
                host = %params.host,
                port = params.port,
                dbname = %params.dbname,
                user = %params.user,
                error = %e,
                "connect failed: {}",
                params.redacted_connection_string()
            );
            CatalogSqlError::ConnectionError(format!("failed to connect to catalog: {e}"))
        })?;
        debug!(host = %params.host, dbname = %params.dbname, "connected");

        Ok(Self { client, driver })
    }

    /// Close the session and wait for the socket task to wind down.
    ///
    /// # Errors
    /// Returns `CatalogSqlError::ConnectionError` if the socket task panicked.
    pub async fn disconnect(self) -> Result<(), CatalogSqlError> {
        let Self { client, driver } = self;
        drop(client);
        driver
            .await
            .map_err(|e| CatalogSqlError::ConnectionError(format!("disconnect failed: {e}")))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// The underlying driver client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

async fn dial<T>(
    cfg: &tokio_postgres::Config,
    tls: T,
) -> Result<(Client, JoinHandle<()>), tokio_postgres::Error>
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let (client, connection) = cfg.connect(tls).await?;
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!(error = %e, "catalog connection closed with error");
        }
    });
    Ok((client, driver))
}

#[async_trait]
impl SqlBackend for PgConnection {
    async fn submit(&mut self, sql: &str, binds: &[String]) -> Result<ResultSet, DbFailure> {
        run_statement(&self.client, sql, binds)
            .await
            .map_err(db_failure)
    }
}

async fn run_statement(
    client: &Client,
    sql: &str,
    binds: &[String],
) -> Result<ResultSet, tokio_postgres::Error> {
    let stmt = client.prepare(sql).await?;
    let mut stream = pin!(client.query_raw(&stmt, text_params(binds)).await?);

    let mut rows = Vec::new();
    while let Some(row) = stream.try_next().await? {
        rows.push(row);
    }
    let rows_affected = stream.rows_affected().unwrap_or(0);

    build_result_set_from_statement(&stmt, &rows, rows_affected)
}

/// Reduce a driver error to SQLSTATE plus primary message.
pub(crate) fn db_failure(err: tokio_postgres::Error) -> DbFailure {
    match err.as_db_error() {
        Some(db) => DbFailure {
            sqlstate: Some(db.code().code().to_string()),
            message: db.message().to_string(),
        },
        None => DbFailure {
            sqlstate: err.code().map(|state| state.code().to_string()),
            message: err.to_string(),
        },
    }
}
