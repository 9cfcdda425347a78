// PostgreSQL/CockroachDB backend
//
// - config: connection parameters and connection-string rendering
// - params: bind values in the text wire format
// - query: row extraction and result building
// - tls: sslmode handling and the rustls connector
// - executor: the live connection implementing `SqlBackend`

pub mod config;
pub mod executor;
pub mod params;
pub mod query;
pub mod tls;

pub use config::ConnectParams;
pub use executor::PgConnection;
pub use params::TextParam;
pub use tls::{TlsMode, TlsSettings};
