// src/core/scanner/ssl_scanner.rs

use crate::core::error::{ProbeError, ProbeResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use native_tls::{Protocol, TlsConnector};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};
use x509_parser::prelude::*;

/// TLS feature extension; its presence in a certificate requests OCSP must-staple.
pub const MUST_STAPLE_OID: &str = "1.3.6.1.5.5.7.1.24";

/// Protocol versions a handshake can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Tls10,
    Tls11,
}

impl TlsVersion {
    fn protocol(self) -> Protocol {
        match self {
            TlsVersion::Tls10 => Protocol::Tlsv10,
            TlsVersion::Tls11 => Protocol::Tlsv11,
        }
    }
}

/// The parts of the leaf certificate the checks look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub subject_name: String,
    pub issuer_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub has_must_staple: bool,
}

impl CertificateSummary {
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        self.not_after.signed_duration_since(now).num_days()
    }

    pub fn lifetime_days(&self) -> i64 {
        self.not_after.signed_duration_since(self.not_before).num_days()
    }
}

/// Raw TLS capability used by the certificate and protocol checks.
#[async_trait]
pub trait TlsProbe: Send + Sync {
    /// Leaf certificate of `host:443`, read without verifying trust.
    async fn peer_certificate(&self, host: &str, ipv6: bool) -> ProbeResult<CertificateSummary>;

    /// Whether a fully verified handshake succeeds.
    async fn verified_handshake(&self, host: &str, ipv6: bool) -> bool;

    /// Whether a handshake pinned to exactly `version` succeeds.
    async fn handshake_with(&self, host: &str, ipv6: bool, version: TlsVersion) -> bool;
}

/// `TlsProbe` over native-tls, resolving addresses with hickory.
pub struct NativeTlsProbe {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl NativeTlsProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
            timeout,
        }
    }

    /// First address of the requested family for `host:443`.
    async fn resolve(&self, host: &str, ipv6: bool) -> Result<SocketAddr, ProbeError> {
        let lookup = self.resolver.lookup_ip(host).await.map_err(|e| ProbeError::Resolve {
            host: host.to_string(),
            detail: e.to_string(),
        })?;
        lookup
            .iter()
            .find(|ip| ip.is_ipv6() == ipv6)
            .map(|ip| SocketAddr::new(ip, 443))
            .ok_or_else(|| ProbeError::Resolve {
                host: host.to_string(),
                detail: format!("no {} address", if ipv6 { "IPv6" } else { "IPv4" }),
            })
    }

    async fn run_blocking<T, F>(&self, host: &str, ipv6: bool, work: F) -> Result<T, ProbeError>
    where
        T: Send + 'static,
        F: FnOnce(String, SocketAddr, Duration) -> Result<T, ProbeError> + Send + 'static,
    {
        let addr = self.resolve(host, ipv6).await?;
        let host_owned = host.to_string();
        let timeout = self.timeout;
        debug!(host, %addr, "Spawning blocking task for TLS connection.");
        spawn_blocking(move || work(host_owned, addr, timeout))
            .await
            .unwrap_or_else(|e| {
                error!(panic = %e, "Blocking TLS task panicked!");
                Err(ProbeError::Tls { host: host.to_string(), detail: format!("task panicked: {e}") })
            })
    }
}

#[async_trait]
impl TlsProbe for NativeTlsProbe {
    async fn peer_certificate(&self, host: &str, ipv6: bool) -> ProbeResult<CertificateSummary> {
        info!(host, "Reading peer certificate.");
        self.run_blocking(host, ipv6, |host, addr, timeout| {
            let connector = TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| ProbeError::Tls { host: host.clone(), detail: e.to_string() })?;
            read_certificate(&connector, &host, addr, timeout)
        })
        .await
    }

    async fn verified_handshake(&self, host: &str, ipv6: bool) -> bool {
        let result = self
            .run_blocking(host, ipv6, |host, addr, timeout| {
                let connector = TlsConnector::new().map_err(|e| ProbeError::Tls { host: host.clone(), detail: e.to_string() })?;
                handshake(&connector, &host, addr, timeout)
            })
            .await;
        if let Err(e) = &result {
            debug!(host, error = %e, "Verified handshake failed.");
        }
        result.is_ok()
    }

    async fn handshake_with(&self, host: &str, ipv6: bool, version: TlsVersion) -> bool {
        let result = self
            .run_blocking(host, ipv6, move |host, addr, timeout| {
                let connector = TlsConnector::builder()
                    .min_protocol_version(Some(version.protocol()))
                    .max_protocol_version(Some(version.protocol()))
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()
                    .map_err(|e| ProbeError::Tls { host: host.clone(), detail: e.to_string() })?;
                handshake(&connector, &host, addr, timeout)
            })
            .await;
        debug!(host, ?version, succeeded = result.is_ok(), "Pinned-version handshake attempted.");
        result.is_ok()
    }
}

fn connect(host: &str, addr: SocketAddr, timeout: Duration) -> Result<TcpStream, ProbeError> {
    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
        debug!(host, error = %e, "TCP connection failed");
        ProbeError::Io(e)
    })?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    Ok(stream)
}

fn handshake(connector: &TlsConnector, host: &str, addr: SocketAddr, timeout: Duration) -> Result<(), ProbeError> {
    let stream = connect(host, addr, timeout)?;
    let mut tls = connector
        .connect(host, stream)
        .map_err(|e| ProbeError::Tls { host: host.to_string(), detail: e.to_string() })?;
    let _ = tls.shutdown();
    Ok(())
}

fn read_certificate(
    connector: &TlsConnector,
    host: &str,
    addr: SocketAddr,
    timeout: Duration,
) -> ProbeResult<CertificateSummary> {
    let stream = connect(host, addr, timeout)?;
    let stream = connector.connect(host, stream).map_err(|e| {
        error!(error = %e, "TLS handshake failed");
        ProbeError::Tls { host: host.to_string(), detail: e.to_string() }
    })?;

    let Some(cert) = stream
        .peer_certificate()
        .map_err(|e| ProbeError::Certificate { host: host.to_string(), detail: e.to_string() })?
    else {
        debug!(host, "TLS connection successful, but no peer certificate provided.");
        return Ok(None);
    };

    let der = cert
        .to_der()
        .map_err(|e| ProbeError::Certificate { host: host.to_string(), detail: e.to_string() })?;
    summarize_der(&der)
        .map(Some)
        .map_err(|detail| ProbeError::Certificate { host: host.to_string(), detail })
}

/// Extracts the validity window and must-staple flag from a DER certificate.
pub fn summarize_der(der: &[u8]) -> Result<CertificateSummary, String> {
    let (_, x509) = parse_x509_certificate(der).map_err(|e| format!("X.509 Parse Error: {e}"))?;
    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Successfully parsed certificate.");

    let validity = x509.validity();
    let has_must_staple = x509
        .extensions()
        .iter()
        .any(|ext| ext.oid.to_id_string() == MUST_STAPLE_OID);

    Ok(CertificateSummary {
        subject_name: x509.subject().to_string(),
        issuer_name: x509.issuer().to_string(),
        not_before: asn1_time_to_chrono_utc(&validity.not_before),
        not_after: asn1_time_to_chrono_utc(&validity.not_after),
        has_must_staple,
    })
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_arithmetic() {
        let cert = CertificateSummary {
            subject_name: "CN=example.com".into(),
            issuer_name: "CN=Example CA".into(),
            not_before: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
            has_must_staple: false,
        };
        assert_eq!(cert.lifetime_days(), 90);
        assert_eq!(cert.days_until_expiry(Utc.with_ymd_and_hms(2026, 3, 22, 0, 0, 0).unwrap()), 10);
    }

    #[test]
    fn garbage_der_is_a_parse_error() {
        assert!(summarize_der(b"not a certificate").is_err());
    }
}
