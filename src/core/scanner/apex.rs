// src/core/scanner/apex.rs

use crate::config::AuditConfig;
use crate::core::scanner::http_probe::{FetchOptions, Transport};
use publicsuffix::{List, Psl};
use tracing::{info, warn};

/// Registrable-domain lookup, resolved once at startup.
///
/// `Unavailable` is not an error: it only means the `_fld` slots are never
/// planned and every apex fallback is skipped.
pub enum ApexLookup {
    Available(Box<List>),
    Unavailable(String),
}

impl ApexLookup {
    /// Parses a public suffix list in its published text format.
    pub fn from_list_text(text: &str) -> Self {
        match text.parse::<List>() {
            Ok(list) => ApexLookup::Available(Box::new(list)),
            Err(e) => ApexLookup::Unavailable(format!("public suffix list did not parse: {e}")),
        }
    }

    /// Loads the list from `config.public_suffix_path` when set, otherwise
    /// downloads it through the transport.
    pub async fn load(config: &AuditConfig, transport: &dyn Transport) -> Self {
        if let Some(path) = &config.public_suffix_path {
            return match tokio::fs::read_to_string(path).await {
                Ok(text) => {
                    info!(path = %path.display(), "Loaded public suffix list from disk.");
                    Self::from_list_text(&text)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not read public suffix list.");
                    ApexLookup::Unavailable(format!("could not read {}: {e}", path.display()))
                }
            };
        }

        let options = FetchOptions::default().with_timeout(config.fetch_timeout * 2);
        match transport.fetch(&config.public_suffix_url, &options).await {
            Ok(response) if response.status == 200 => {
                info!(bytes = response.body.len(), "Downloaded public suffix list.");
                Self::from_list_text(&response.text())
            }
            Ok(response) => {
                warn!(status = response.status, "Public suffix list download returned an error status.");
                ApexLookup::Unavailable(format!("public suffix list returned {}", response.status))
            }
            Err(e) => {
                warn!(error = %e, "Public suffix list download failed.");
                ApexLookup::Unavailable(e.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ApexLookup::Available(_))
    }

    /// The registrable domain of `host`, if the lookup is available and knows it.
    pub fn apex(&self, host: &str) -> Option<String> {
        let ApexLookup::Available(list) = self else {
            return None;
        };
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        list.domain(host.as_bytes())
            .and_then(|d| std::str::from_utf8(d.as_bytes()).ok().map(str::to_string))
    }

    /// The apex of `host` when `host` is a strict subdomain of it.
    pub fn parent_of(&self, host: &str) -> Option<String> {
        self.apex(host)
            .filter(|apex| !apex.eq_ignore_ascii_case(host.trim_end_matches('.')))
    }
}

impl std::fmt::Debug for ApexLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApexLookup::Available(_) => write!(f, "ApexLookup::Available"),
            ApexLookup::Unavailable(reason) => write!(f, "ApexLookup::Unavailable({reason})"),
        }
    }
}
