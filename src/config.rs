// src/config.rs

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// DNS-over-HTTPS JSON endpoint queried with `name` and `type` parameters.
pub const DEFAULT_DOH_ENDPOINT: &str = "https://dns.google/resolve";

pub const PUBLIC_SUFFIX_LIST_URL: &str = "https://publicsuffix.org/list/public_suffix_list.dat";

/// Header set of a desktop Safari, so origins answer as they would for a visitor.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.1 Safari/605.1.15",
    ),
    ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    ("accept-language", "en-AU,en;q=0.9"),
    ("accept-encoding", "gzip"),
];

/// Tunables shared by the planner, the transport and the TLS probe.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Timeout of the root and well-known fetches.
    pub fetch_timeout: Duration,
    /// Connect/handshake timeout of raw TLS probes.
    pub tls_timeout: Duration,
    /// Timeout for any request that does not set its own.
    pub default_timeout: Duration,
    pub doh_endpoint: String,
    pub browser_headers: Vec<(String, String)>,
    pub public_suffix_url: String,
    /// Local copy of the public suffix list; preferred over the network.
    pub public_suffix_path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(3),
            tls_timeout: Duration::from_secs(5),
            default_timeout: Duration::from_secs(60),
            doh_endpoint: DEFAULT_DOH_ENDPOINT.to_string(),
            browser_headers: BROWSER_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            public_suffix_url: PUBLIC_SUFFIX_LIST_URL.to_string(),
            public_suffix_path: None,
        }
    }
}

impl AuditConfig {
    /// Defaults overridden by `READY_RS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("READY_RS_DOH_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            debug!(endpoint = %endpoint, "Using DoH endpoint from environment.");
            config.doh_endpoint = endpoint.trim().to_string();
        }

        if let Some(path) = lookup("READY_RS_PSL_PATH").filter(|v| !v.trim().is_empty()) {
            config.public_suffix_path = Some(PathBuf::from(path.trim()));
        }

        if let Some(raw) = lookup("READY_RS_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.fetch_timeout = Duration::from_secs(secs),
                _ => warn!(value = %raw, "Ignoring invalid READY_RS_TIMEOUT_SECS."),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_probe_budget() {
        let config = AuditConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.tls_timeout, Duration::from_secs(5));
        assert_eq!(config.default_timeout, Duration::from_secs(60));
        assert!(config.browser_headers.iter().any(|(k, v)| k == "accept-encoding" && v == "gzip"));
    }

    #[test]
    fn environment_overrides_are_applied() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("READY_RS_DOH_ENDPOINT", " https://cloudflare-dns.com/dns-query "),
            ("READY_RS_PSL_PATH", "/tmp/psl.dat"),
            ("READY_RS_TIMEOUT_SECS", "7"),
        ]);
        let config = AuditConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.doh_endpoint, "https://cloudflare-dns.com/dns-query");
        assert_eq!(config.public_suffix_path, Some(PathBuf::from("/tmp/psl.dat")));
        assert_eq!(config.fetch_timeout, Duration::from_secs(7));
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        let config = AuditConfig::from_lookup(|k| (k == "READY_RS_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
    }
}
