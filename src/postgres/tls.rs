use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::verify_server_cert_signed_by_trust_anchor;
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_postgres::config::SslMode;
use tokio_postgres_rustls::MakeRustlsConnect;

use crate::error::CatalogSqlError;

/// libpq `sslmode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl TlsMode {
    /// Parse an `sslmode` value; an absent one means `prefer`, as in libpq.
    ///
    /// # Errors
    /// Returns `CatalogSqlError::ConfigError` for an unknown mode.
    pub fn parse(sslmode: Option<&str>) -> Result<Self, CatalogSqlError> {
        match sslmode {
            None | Some("prefer") => Ok(TlsMode::Prefer),
            Some("disable") => Ok(TlsMode::Disable),
            Some("allow") => Ok(TlsMode::Allow),
            Some("require") => Ok(TlsMode::Require),
            Some("verify-ca") => Ok(TlsMode::VerifyCa),
            Some("verify-full") => Ok(TlsMode::VerifyFull),
            Some(other) => Err(CatalogSqlError::ConfigError(format!("unknown sslmode {other}"))),
        }
    }

    /// Driver-level mode. Certificate checks for the `verify-*` modes happen in the
    /// connector, so the driver only needs to insist on TLS.
    #[must_use]
    pub fn ssl_mode(self) -> SslMode {
        match self {
            TlsMode::Disable => SslMode::Disable,
            TlsMode::Allow | TlsMode::Prefer => SslMode::Prefer,
            TlsMode::Require | TlsMode::VerifyCa | TlsMode::VerifyFull => SslMode::Require,
        }
    }
}

/// How much of the server certificate is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Encrypt only.
    None,
    /// Chain must lead to a trusted root; the host name is not compared.
    Chain,
    /// Chain and host name.
    Full,
}

/// Resolved TLS settings for one connection; no files are read until
/// [`TlsSettings::client_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub mode: TlsMode,
    pub verification: Verification,
    /// PEM bundle of trusted roots; the public web roots are used when absent.
    pub root_cert: Option<PathBuf>,
    /// PEM client certificate chain and private key.
    pub client_identity: Option<(PathBuf, PathBuf)>,
}

impl TlsSettings {
    /// Work out whether and how to use TLS. `None` means a plain-TCP connection:
    /// either `sslmode=disable`, or a non-demanding mode with no TLS option set.
    ///
    /// # Errors
    /// Returns `CatalogSqlError::ConfigError` for an unknown mode or when only one of
    /// `sslcert`/`sslkey` is given.
    pub fn resolve(
        sslmode: Option<&str>,
        sslrootcert: Option<&str>,
        sslcert: Option<&str>,
        sslkey: Option<&str>,
    ) -> Result<Option<Self>, CatalogSqlError> {
        let mode = TlsMode::parse(sslmode)?;
        let client_identity = match (sslcert, sslkey) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (None, None) => None,
            (Some(_), None) => {
                return Err(CatalogSqlError::ConfigError("sslcert given without sslkey".into()));
            }
            (None, Some(_)) => {
                return Err(CatalogSqlError::ConfigError("sslkey given without sslcert".into()));
            }
        };
        let root_cert = sslrootcert.map(PathBuf::from);

        let any_option = root_cert.is_some() || client_identity.is_some();
        let wants_tls = match mode {
            TlsMode::Disable => false,
            TlsMode::Allow | TlsMode::Prefer => any_option,
            TlsMode::Require | TlsMode::VerifyCa | TlsMode::VerifyFull => true,
        };
        if !wants_tls {
            if any_option {
                tracing::warn!("sslmode=disable: TLS certificate options are not used");
            }
            return Ok(None);
        }

        // libpq checks the chain under `require` whenever a root file is supplied
        let verification = match mode {
            TlsMode::VerifyFull => Verification::Full,
            TlsMode::VerifyCa => Verification::Chain,
            TlsMode::Require if root_cert.is_some() => Verification::Chain,
            _ => Verification::None,
        };

        Ok(Some(Self {
            mode,
            verification,
            root_cert,
            client_identity,
        }))
    }

    /// Load the certificate files and build the rustls client configuration.
    ///
    /// # Errors
    /// Returns `CatalogSqlError::ConfigError` when a file cannot be read or holds no
    /// usable certificate or key.
    pub fn client_config(&self) -> Result<ClientConfig, CatalogSqlError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(tls_error)?;

        let builder = match self.verification {
            Verification::Full => builder.with_root_certificates(self.root_store()?),
            Verification::Chain => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(ServerVerifier {
                    roots: Some(Arc::new(self.root_store()?)),
                    provider,
                })),
            Verification::None => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(ServerVerifier {
                    roots: None,
                    provider,
                })),
        };

        match &self.client_identity {
            Some((cert, key)) => builder
                .with_client_auth_cert(load_certs(cert)?, load_key(key)?)
                .map_err(tls_error),
            None => Ok(builder.with_no_client_auth()),
        }
    }

    /// Connector handed to `tokio_postgres::Config::connect`.
    ///
    /// # Errors
    /// See [`TlsSettings::client_config`].
    pub fn connector(&self) -> Result<MakeRustlsConnect, CatalogSqlError> {
        Ok(MakeRustlsConnect::new(self.client_config()?))
    }

    fn root_store(&self) -> Result<RootCertStore, CatalogSqlError> {
        let Some(path) = &self.root_cert else {
            return Ok(RootCertStore::from_iter(
                webpki_roots::TLS_SERVER_ROOTS.iter().cloned(),
            ));
        };
        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(load_certs(path)?);
        if added == 0 {
            return Err(CatalogSqlError::ConfigError(format!(
                "no usable root certificate in {}",
                path.display()
            )));
        }
        if ignored > 0 {
            tracing::warn!(ignored, path = %path.display(), "skipped unparsable root certificates");
        }
        Ok(roots)
    }
}

fn tls_error(err: rustls::Error) -> CatalogSqlError {
    CatalogSqlError::ConfigError(format!("TLS setup failed: {err}"))
}

fn open_pem(path: &Path) -> Result<BufReader<File>, CatalogSqlError> {
    File::open(path).map(BufReader::new).map_err(|e| {
        CatalogSqlError::ConfigError(format!("cannot read {}: {e}", path.display()))
    })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, CatalogSqlError> {
    let certs = rustls_pemfile::certs(&mut open_pem(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CatalogSqlError::ConfigError(format!("bad PEM in {}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(CatalogSqlError::ConfigError(format!(
            "no certificate found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, CatalogSqlError> {
    rustls_pemfile::private_key(&mut open_pem(path)?)
        .map_err(|e| CatalogSqlError::ConfigError(format!("bad PEM in {}: {e}", path.display())))?
        .ok_or_else(|| {
            CatalogSqlError::ConfigError(format!("no private key found in {}", path.display()))
        })
}

/// Server certificate check for `require` and `verify-ca`: the handshake signatures
/// are always verified, the chain only when `roots` is set, the host name never.
#[derive(Debug)]
struct ServerVerifier {
    roots: Option<Arc<RootCertStore>>,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for ServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if let Some(roots) = &self.roots {
            let cert = ParsedCertificate::try_from(end_entity)?;
            verify_server_cert_signed_by_trust_anchor(
                &cert,
                roots,
                intermediates,
                now,
                self.provider.signature_verification_algorithms.all,
            )?;
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
