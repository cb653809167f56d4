// src/core/scanner/http_probe.rs

use crate::core::error::ProbeError;
use crate::core::models::ProbeResponse;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, warn};

/// Media types whose bodies are parsed into `ProbeResponse::json`.
const JSON_MEDIA_TYPES: &[&str] = &["application/json", "application/x-javascript", "application/dns-json"];

/// Per-request options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub verify_tls: bool,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            headers: Vec::new(),
            timeout: None,
            follow_redirects: true,
        }
    }
}

impl FetchOptions {
    pub fn insecure(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn with_headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers = headers.to_vec();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The request capability every probe and secondary fetch goes through.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<ProbeResponse, ProbeError>;
}

/// `Transport` backed by reqwest.
///
/// One client per (verify, redirect) combination; the TLS and redirect
/// policies are fixed at client construction in reqwest.
pub struct ReqwestTransport {
    verified: Client,
    unverified: Client,
    verified_no_redirect: Client,
    unverified_no_redirect: Client,
    default_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(default_timeout: Duration) -> Result<Self, ProbeError> {
        let build = |verify: bool, follow: bool| {
            Client::builder()
                .danger_accept_invalid_certs(!verify)
                .redirect(if follow { Policy::limited(10) } else { Policy::none() })
                .build()
                .map_err(|e| ProbeError::Network { url: String::new(), detail: format!("client build failed: {e}") })
        };

        Ok(Self {
            verified: build(true, true)?,
            unverified: build(false, true)?,
            verified_no_redirect: build(true, false)?,
            unverified_no_redirect: build(false, false)?,
            default_timeout,
        })
    }

    fn client(&self, options: &FetchOptions) -> &Client {
        match (options.verify_tls, options.follow_redirects) {
            (true, true) => &self.verified,
            (false, true) => &self.unverified,
            (true, false) => &self.verified_no_redirect,
            (false, false) => &self.unverified_no_redirect,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<ProbeResponse, ProbeError> {
        let parsed = url::Url::parse(url).map_err(|e| ProbeError::InvalidUrl {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(n), Ok(v)) => {
                    headers.insert(n, v);
                }
                _ => warn!(header = %name, "Skipping malformed request header."),
            }
        }

        debug!(url, verify = options.verify_tls, "Sending request.");
        let response = self
            .client(options)
            .get(parsed)
            .headers(headers)
            .timeout(options.timeout.unwrap_or(self.default_timeout))
            .send()
            .await
            .map_err(|e| ProbeError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let raw = response.bytes().await.map_err(|e| ProbeError::from_reqwest(url, e))?;

        let content_encoding = headers.get("content-encoding").and_then(|v| v.first()).cloned().unwrap_or_default();
        let body = if content_encoding.contains("gzip") {
            decompress_gzip(&raw).unwrap_or_else(|e| {
                warn!(url, error = %e, "Body advertised gzip but did not decode; keeping raw bytes.");
                raw.to_vec()
            })
        } else {
            raw.to_vec()
        };

        let content_type = headers
            .get("content-type")
            .and_then(|v| v.first())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        let json = if JSON_MEDIA_TYPES.iter().any(|t| content_type.contains(t)) {
            serde_json::from_slice(&body).ok()
        } else {
            None
        };

        debug!(url, status, bytes = body.len(), "Received response.");
        Ok(ProbeResponse {
            request_url: url.to_string(),
            url: final_url,
            status,
            headers,
            body,
            json,
        })
    }
}

fn collect_headers(map: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in map {
        let value = match value.to_str() {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        };
        headers.entry(name.as_str().to_string()).or_default().push(value);
    }
    headers
}

fn decompress_gzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(raw);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
