// src/core/scanner/dns_scanner.rs

use crate::core::error::ProbeError;
use crate::core::models::{ProbeResponse, RecordType};
use crate::core::scanner::http_probe::{FetchOptions, Transport};
use tracing::{debug, warn};
use url::Url;

/// Builds the DoH JSON query URL for `name`/`rtype`.
///
/// Falls back to plain concatenation when the endpoint itself is not a valid
/// URL, so the transport reports the problem as an absent slot.
pub fn doh_url(endpoint: &str, name: &str, rtype: RecordType) -> String {
    match Url::parse_with_params(endpoint, &[("name", name), ("type", rtype.as_ref())]) {
        Ok(url) => url.to_string(),
        Err(e) => {
            warn!(endpoint, error = %e, "DoH endpoint is not a valid URL.");
            format!("{endpoint}?name={name}&type={rtype}")
        }
    }
}

/// Issues one DoH lookup through the transport.
pub async fn lookup(
    transport: &dyn Transport,
    endpoint: &str,
    name: &str,
    rtype: RecordType,
) -> Result<ProbeResponse, ProbeError> {
    let url = doh_url(endpoint, name, rtype);
    debug!(name, rtype = %rtype, "DoH lookup.");
    transport.fetch(&url, &FetchOptions::default()).await
}

/// TXT strings for `name`; a failed lookup yields an empty set.
pub async fn lookup_txt(transport: &dyn Transport, endpoint: &str, name: &str) -> Vec<String> {
    match lookup(transport, endpoint, name, RecordType::Txt).await {
        Ok(response) => response
            .dns_answers(Some(RecordType::Txt))
            .into_iter()
            .map(|a| a.data)
            .collect(),
        Err(e) => {
            warn!(name, error = %e, "TXT lookup failed.");
            Vec::new()
        }
    }
}
