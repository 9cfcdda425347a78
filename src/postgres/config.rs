use std::fmt;

use clap::Args;
use serde::{Deserialize, Serialize};

use super::tls::{TlsMode, TlsSettings};
use crate::error::CatalogSqlError;

/// Where and how to reach the catalog database.
///
/// Loadable from JSON through `serde`, or from command-line flags and environment
/// variables through `clap`. The password is never serialized and `Debug` masks it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Args)]
pub struct ConnectParams {
    #[arg(long, env = "CATALOG_DB_HOST", default_value = "localhost")]
    pub host: String,
    #[arg(long, env = "CATALOG_DB_PORT", default_value_t = 5432)]
    pub port: u16,
    #[arg(long, env = "CATALOG_DB_NAME")]
    pub dbname: String,
    #[arg(long, env = "CATALOG_DB_USER")]
    pub user: String,
    #[arg(long, env = "CATALOG_DB_PASSWORD", hide_env_values = true, default_value = "")]
    #[serde(default, skip_serializing)]
    pub password: String,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sslmode: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sslrootcert: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sslcert: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sslkey: Option<String>,
}

impl ConnectParams {
    /// Minimal parameters; TLS options start out absent.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, dbname: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            dbname: dbname.into(),
            user: String::new(),
            password: String::new(),
            sslmode: None,
            sslrootcert: None,
            sslcert: None,
            sslkey: None,
        }
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// libpq-style `key=value` connection string. TLS options appear only when set.
    ///
    /// ```rust
    /// use catalog_sql::ConnectParams;
    ///
    /// let params = ConnectParams::new("db", 5432, "cat").with_credentials("irods", "secret");
    /// assert_eq!(
    ///     params.connection_string(),
    ///     "host=db port=5432 dbname=cat user=irods password=secret"
    /// );
    /// ```
    #[must_use]
    pub fn connection_string(&self) -> String {
        self.render(&self.password)
    }

    /// Same as [`ConnectParams::connection_string`] with the password masked, for logs.
    #[must_use]
    pub fn redacted_connection_string(&self) -> String {
        self.render("XXXXX")
    }

    fn render(&self, password: &str) -> String {
        let mut out = format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.dbname, self.user, password
        );
        for (key, value) in self.tls_options() {
            if let Some(value) = value {
                out.push(' ');
                out.push_str(key);
                out.push('=');
                out.push_str(value);
            }
        }
        out
    }

    fn tls_options(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("sslmode", self.sslmode.as_deref()),
            ("sslrootcert", self.sslrootcert.as_deref()),
            ("sslcert", self.sslcert.as_deref()),
            ("sslkey", self.sslkey.as_deref()),
        ]
    }

    /// Check the fields a connection cannot do without.
    ///
    /// # Errors
    /// Returns `CatalogSqlError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), CatalogSqlError> {
        if self.host.is_empty() {
            return Err(CatalogSqlError::ConfigError("host is required".to_string()));
        }
        if self.dbname.is_empty() {
            return Err(CatalogSqlError::ConfigError("dbname is required".to_string()));
        }
        if self.user.is_empty() {
            return Err(CatalogSqlError::ConfigError("user is required".to_string()));
        }
        Ok(())
    }

    /// TLS settings derived from `sslmode` and the certificate paths; `None` for a
    /// plain-TCP connection.
    ///
    /// # Errors
    /// Returns `CatalogSqlError::ConfigError` for an unknown `sslmode` or an
    /// incomplete client identity.
    pub fn tls_settings(&self) -> Result<Option<TlsSettings>, CatalogSqlError> {
        TlsSettings::resolve(
            self.sslmode.as_deref(),
            self.sslrootcert.as_deref(),
            self.sslcert.as_deref(),
            self.sslkey.as_deref(),
        )
    }

    /// Driver configuration; the TLS connector comes from
    /// [`ConnectParams::tls_settings`].
    ///
    /// # Errors
    /// Returns `CatalogSqlError::ConfigError` for missing fields or an unknown `sslmode`.
    pub fn to_pg_config(&self) -> Result<tokio_postgres::Config, CatalogSqlError> {
        self.validate()?;
        let mode = TlsMode::parse(self.sslmode.as_deref())?;

        let mut cfg = tokio_postgres::Config::new();
        cfg.host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .ssl_mode(mode.ssl_mode())
            .application_name("catalog-sql");
        Ok(cfg)
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"XXXXX")
            .field("sslmode", &self.sslmode)
            .field("sslrootcert", &self.sslrootcert)
            .field("sslcert", &self.sslcert)
            .field("sslkey", &self.sslkey)
            .finish()
    }
}
