use postgresql_embedded::PostgreSQL;

use crate::postgres::{ConnectParams, PgConnection};
use crate::statement::execute_no_result;

/// A running embedded `PostgreSQL` with a fresh catalog database.
pub struct EmbeddedCatalogDb {
    pub postgresql: PostgreSQL,
    /// Parameters that reach the new database with working credentials.
    pub params: ConnectParams,
}

impl EmbeddedCatalogDb {
    /// Open a new session against the embedded database.
    ///
    /// # Errors
    /// Propagates connection failures.
    pub async fn connect(&self) -> Result<PgConnection, crate::CatalogSqlError> {
        PgConnection::connect(&self.params).await
    }

    /// Stop the server. A failure is logged; the data directory is temporary anyway.
    pub async fn stop(self) {
        if let Err(e) = self.postgresql.stop().await {
            tracing::warn!(error = %e, "embedded postgres did not stop cleanly");
        }
    }
}

/// Set up and start an embedded `PostgreSQL`, create `dbname`, and check that a
/// session can run a statement against it.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, the database cannot
/// be created, or the connectivity check fails.
pub async fn setup_catalog_db(
    dbname: &str,
) -> Result<EmbeddedCatalogDb, Box<dyn std::error::Error>> {
    let mut postgresql = PostgreSQL::default();

    // Setup PostgreSQL binaries (bundled, so no download conflicts)
    postgresql.setup().await?;
    postgresql.start().await?;
    postgresql.create_database(dbname).await?;

    let settings = postgresql.settings();
    let mut params = ConnectParams::new(settings.host.clone(), settings.port, dbname)
        .with_credentials(settings.username.clone(), settings.password.clone());
    params.sslmode = Some("disable".to_string());

    // Quick connection test
    let mut conn = PgConnection::connect(&params).await?;
    execute_no_result(&mut conn, "select 1", &[]).await?;
    conn.disconnect().await?;

    tracing::info!(port = params.port, dbname, "embedded catalog database ready");

    Ok(EmbeddedCatalogDb { postgresql, params })
}
