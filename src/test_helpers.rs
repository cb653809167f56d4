// src/test_helpers.rs

//! Fixtures shared by the unit tests: an in-memory transport, a scripted TLS
//! probe and a ready-made check context.

use crate::config::{AuditConfig, DEFAULT_DOH_ENDPOINT};
use crate::core::error::{ProbeError, ProbeResult};
use crate::core::models::{ProbeResponse, RecordType, ResponseBundle, Slot};
use crate::core::registry::CheckContext;
use crate::core::scanner::dns_scanner::doh_url;
use crate::core::scanner::http_probe::{FetchOptions, Transport};
use crate::core::scanner::ssl_scanner::{CertificateSummary, TlsProbe, TlsVersion};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Transport answering from a fixed URL -> response table; unknown URLs fail.
#[derive(Default)]
pub struct StaticTransport {
    responses: HashMap<String, ProbeResponse>,
    requests: Mutex<Vec<String>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: ProbeResponse) -> Self {
        let response = if response.url.is_empty() { response.with_url(url) } else { response };
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Registers a DoH answer for `name`/`rtype` at the default endpoint.
    pub fn with_dns(self, name: &str, rtype: RecordType, json: serde_json::Value) -> Self {
        let url = doh_url(DEFAULT_DOH_ENDPOINT, name, rtype);
        self.with_response(&url, ProbeResponse::new(200).with_header("content-type", "application/dns-json").with_json(json))
    }

    /// Every URL fetched so far, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<ProbeResponse, ProbeError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.responses.get(url).cloned().ok_or_else(|| ProbeError::Network {
            url: url.to_string(),
            detail: "no fixture".into(),
        })
    }
}

/// TLS probe with scripted answers.
pub struct FakeTls {
    pub certificate: Option<CertificateSummary>,
    pub trusted: bool,
    pub accepts_tls_1_0: bool,
    pub accepts_tls_1_1: bool,
}

impl Default for FakeTls {
    fn default() -> Self {
        Self {
            certificate: Some(certificate(90, 80, true)),
            trusted: true,
            accepts_tls_1_0: false,
            accepts_tls_1_1: false,
        }
    }
}

#[async_trait]
impl TlsProbe for FakeTls {
    async fn peer_certificate(&self, _host: &str, _ipv6: bool) -> ProbeResult<CertificateSummary> {
        Ok(self.certificate.clone())
    }

    async fn verified_handshake(&self, _host: &str, _ipv6: bool) -> bool {
        self.trusted
    }

    async fn handshake_with(&self, _host: &str, _ipv6: bool, version: TlsVersion) -> bool {
        match version {
            TlsVersion::Tls10 => self.accepts_tls_1_0,
            TlsVersion::Tls11 => self.accepts_tls_1_1,
        }
    }
}

/// A certificate valid for `lifetime_days` that expires in `remaining_days`.
pub fn certificate(lifetime_days: i64, remaining_days: i64, must_staple: bool) -> CertificateSummary {
    // half a day of slack keeps whole-day arithmetic stable while tests run
    let not_after = Utc::now() + Duration::days(remaining_days) + Duration::hours(12);
    CertificateSummary {
        subject_name: "CN=example.com".into(),
        issuer_name: "CN=Test CA".into(),
        not_before: not_after - Duration::days(lifetime_days),
        not_after,
        has_must_staple: must_staple,
    }
}

pub fn context(domain: &str) -> CheckContext {
    context_with(domain, StaticTransport::new(), FakeTls::default())
}

pub fn context_with(domain: &str, transport: StaticTransport, tls: FakeTls) -> CheckContext {
    let host = domain.split('/').next().unwrap_or(domain);
    CheckContext::new(domain, host, Arc::new(transport), Arc::new(tls), Arc::new(AuditConfig::default()))
        .with_print_output(false)
}

/// Bundle holding only the primary HTTPS response.
pub fn primary(response: ProbeResponse) -> ResponseBundle {
    ResponseBundle::new().with(Slot::Response, response)
}

/// DoH-shaped response with the given answers.
pub fn dns(answers: serde_json::Value) -> ProbeResponse {
    ProbeResponse::new(200).with_json(serde_json::json!({ "Answer": answers }))
}
