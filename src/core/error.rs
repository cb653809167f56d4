// src/core/error.rs

use thiserror::Error;

/// Failure of a single outbound probe (HTTP fetch, DNS-over-HTTPS lookup,
/// raw TLS handshake or certificate read).
///
/// The planner never propagates these: each one becomes an absent slot in the
/// `ResponseBundle`, and the checks that read that slot decide what absence means.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request to {url} failed: {detail}")]
    Network { url: String, detail: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("invalid url {url}: {detail}")]
    InvalidUrl { url: String, detail: String },

    #[error("TLS error for {host}: {detail}")]
    Tls { host: String, detail: String },

    #[error("certificate error for {host}: {detail}")]
    Certificate { host: String, detail: String },

    #[error("could not resolve {host}: {detail}")]
    Resolve { host: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request {slot} skipped by request filter")]
    Skipped { slot: String },
}

impl ProbeError {
    /// Maps a reqwest failure to the matching variant.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout { url: url.to_string() }
        } else if err.is_builder() {
            ProbeError::InvalidUrl { url: url.to_string(), detail: err.to_string() }
        } else {
            ProbeError::Network { url: url.to_string(), detail: err.to_string() }
        }
    }
}

/// Result of a capability call that may legitimately find nothing.
pub type ProbeResult<T> = Result<Option<T>, ProbeError>;

/// Failure of a whole audit.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The primary HTTPS fetch produced nothing, so there is nothing to audit.
    #[error("No response from https://{domain}")]
    NoResponse { domain: String },
}
