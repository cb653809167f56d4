// src/core/scanner/mod.rs

//! Probe planning. Every request an audit needs is issued here, concurrently,
//! and the results are collected into a `ResponseBundle` before any check runs.

pub mod apex;
pub mod dns_scanner;
pub mod http_probe;
pub mod ssl_scanner;

use crate::config::AuditConfig;
use crate::core::error::ProbeError;
use crate::core::models::{ProbeResponse, RecordType, ResponseBundle, Slot};
use self::apex::ApexLookup;
use self::http_probe::{FetchOptions, Transport};
use futures::future::join_all;
use tracing::{debug, info, warn};
use url::Url;

/// What the planner hands to the check engine.
#[derive(Debug)]
pub struct ProbeCollection {
    pub bundle: ResponseBundle,
    pub domain_with_no_path: String,
    /// Registrable parent of the host, when the host is a strict subdomain.
    pub apex: Option<String>,
    pub is_ipv6: bool,
}

/// One request of the plan.
#[derive(Debug, Clone)]
enum Probe {
    Http { url: String, options: FetchOptions },
    Dns { name: String, rtype: RecordType },
}

/// Host portion of `domain`, which may carry a path, a port or a trailing slash.
pub fn domain_with_no_path(domain: &str) -> String {
    match Url::parse(&format!("https://{domain}")) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_string(),
            None => domain.to_string(),
        },
        Err(e) => {
            debug!(domain, error = %e, "Domain is not URL-shaped, splitting on '/'.");
            domain.split('/').next().unwrap_or(domain).to_string()
        }
    }
}

fn plan(domain: &str, host: &str, parent: Option<&str>, config: &AuditConfig) -> Vec<(Slot, Probe)> {
    let page = |url: String, verify: bool| {
        let options = FetchOptions::default()
            .with_headers(&config.browser_headers)
            .with_timeout(config.fetch_timeout);
        let options = if verify { options } else { options.insecure() };
        Probe::Http { url, options }
    };
    let dns = |name: &str, rtype: RecordType| Probe::Dns { name: name.to_string(), rtype };

    let mut requests = vec![
        (Slot::HttpResponse, page(format!("http://{domain}"), false)),
        (Slot::Response, page(format!("https://{domain}"), false)),
        (Slot::SecurityTxt, page(format!("https://{host}/.well-known/security.txt"), true)),
        (Slot::RobotsTxt, page(format!("https://{host}/robots.txt"), true)),
        (Slot::Favicon, page(format!("https://{host}/favicon.ico"), false)),
        (Slot::DnsNs, dns(host, RecordType::Ns)),
        (Slot::DnsMx, dns(host, RecordType::Mx)),
        (Slot::DnsTxt, dns(host, RecordType::Txt)),
        (Slot::DnsSpf, dns(host, RecordType::Spf)),
        (Slot::DnsCaa, dns(host, RecordType::Caa)),
        (Slot::DnsA, dns(host, RecordType::A)),
        (Slot::DnsAaaa, dns(host, RecordType::Aaaa)),
        (Slot::DnsDmarc, dns(&format!("_dmarc.{host}"), RecordType::Txt)),
    ];

    if let Some(apex) = parent {
        requests.extend([
            (Slot::ResponseFld, page(format!("https://{apex}"), false)),
            (Slot::DnsNsFld, dns(apex, RecordType::Ns)),
            (Slot::DnsMxFld, dns(apex, RecordType::Mx)),
            (Slot::DnsTxtFld, dns(apex, RecordType::Txt)),
            (Slot::DnsSpfFld, dns(apex, RecordType::Spf)),
            (Slot::DnsCaaFld, dns(apex, RecordType::Caa)),
            (Slot::DnsDmarcFld, dns(&format!("_dmarc.{apex}"), RecordType::Txt)),
        ]);
    }
    requests
}

async fn run_probe(
    slot: Slot,
    probe: &Probe,
    transport: &dyn Transport,
    config: &AuditConfig,
    request_filter: Option<&str>,
) -> Option<ProbeResponse> {
    let result = if request_filter.is_some_and(|f| !slot.as_ref().contains(f)) {
        Err(ProbeError::Skipped { slot: slot.to_string() })
    } else {
        match probe {
            Probe::Http { url, options } => transport.fetch(url, options).await,
            Probe::Dns { name, rtype } => dns_scanner::lookup(transport, &config.doh_endpoint, name, *rtype).await,
        }
    };

    match result {
        Ok(response) => {
            debug!(slot = %slot, status = response.status, "Probe answered.");
            Some(response)
        }
        Err(e @ ProbeError::Skipped { .. }) => {
            debug!(slot = %slot, reason = %e, "Probe skipped.");
            None
        }
        Err(e) => {
            warn!(slot = %slot, error = %e, "Probe failed, slot left empty.");
            None
        }
    }
}

/// Issues every planned request for `domain` and collects the answers.
///
/// Returns `None` when the primary HTTPS fetch produced nothing, unless a
/// request filter is active (filtered runs are expected to lack it).
pub async fn run_probes(
    domain: &str,
    transport: &dyn Transport,
    apex: &ApexLookup,
    config: &AuditConfig,
    request_filter: Option<&str>,
) -> Option<ProbeCollection> {
    let host = domain_with_no_path(domain);
    let parent = apex.parent_of(&host);
    let requests = plan(domain, &host, parent.as_deref(), config);
    info!(domain, host = %host, apex = ?parent, requests = requests.len(), "Starting probes.");

    let responses = join_all(
        requests
            .iter()
            .map(|(slot, probe)| run_probe(*slot, probe, transport, config, request_filter)),
    )
    .await;

    let mut bundle = ResponseBundle::new();
    for ((slot, _), response) in requests.iter().zip(responses) {
        bundle.insert(*slot, response);
    }

    let is_ipv6 = bundle.records(Slot::DnsA, RecordType::A).is_empty()
        && !bundle.records(Slot::DnsAaaa, RecordType::Aaaa).is_empty();

    if bundle.get(Slot::Response).is_none() && request_filter.is_none() {
        warn!(domain, "No response from the primary HTTPS fetch.");
        return None;
    }

    info!(domain, slots = bundle.len(), is_ipv6, "Probes complete.");
    Some(ProbeCollection {
        bundle,
        domain_with_no_path: host,
        apex: parent,
        is_ipv6,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StaticTransport;
    use serde_json::json;

    const LIST: &str = "// ===BEGIN ICANN DOMAINS===\ncom\n// ===END ICANN DOMAINS===\n";

    fn html() -> ProbeResponse {
        ProbeResponse::new(200).with_header("content-type", "text/html")
    }

    #[test]
    fn strips_path_and_port() {
        assert_eq!(domain_with_no_path("example.com"), "example.com");
        assert_eq!(domain_with_no_path("example.com/blog/post"), "example.com");
        assert_eq!(domain_with_no_path("www.example.com:8443/"), "www.example.com");
    }

    #[test]
    fn apex_slots_only_for_subdomains() {
        let config = AuditConfig::default();
        let apex_plan = plan("example.com", "example.com", None, &config);
        assert!(apex_plan.iter().all(|(slot, _)| !slot.as_ref().ends_with("_fld")));
        assert_eq!(apex_plan.len(), 13);

        let sub_plan = plan("www.example.com", "www.example.com", Some("example.com"), &config);
        assert_eq!(sub_plan.len(), 20);
        assert!(sub_plan.iter().any(|(slot, _)| *slot == Slot::DnsCaaFld));
    }

    #[test]
    fn root_fetches_skip_verification() {
        let config = AuditConfig::default();
        for (slot, probe) in plan("example.com/path", "example.com", None, &config) {
            if let Probe::Http { url, options } = probe {
                match slot {
                    Slot::HttpResponse => assert_eq!(url, "http://example.com/path"),
                    Slot::Response => {
                        assert_eq!(url, "https://example.com/path");
                        assert!(!options.verify_tls);
                    }
                    Slot::SecurityTxt => {
                        assert_eq!(url, "https://example.com/.well-known/security.txt");
                        assert!(options.verify_tls);
                    }
                    _ => {}
                }
                assert_eq!(options.timeout, Some(config.fetch_timeout));
            }
        }
    }

    #[tokio::test]
    async fn collects_responses_and_failures() {
        let transport = StaticTransport::new()
            .with_response("https://example.com", html())
            .with_dns("example.com", RecordType::A, json!({"Answer": [{"type": 1, "data": "192.0.2.1"}]}));
        let config = AuditConfig::default();
        let collection = run_probes("example.com", &transport, &ApexLookup::from_list_text(LIST), &config, None)
            .await
            .unwrap();

        assert_eq!(collection.domain_with_no_path, "example.com");
        assert_eq!(collection.apex, None);
        assert!(!collection.is_ipv6);
        assert!(collection.bundle.get(Slot::Response).is_some());
        // planned but failed
        assert!(collection.bundle.has_slot(Slot::RobotsTxt));
        assert!(collection.bundle.get(Slot::RobotsTxt).is_none());
        // never planned
        assert!(!collection.bundle.has_slot(Slot::DnsTxtFld));
    }

    #[tokio::test]
    async fn subdomains_also_probe_the_apex() {
        let transport = StaticTransport::new()
            .with_response("https://www.example.com", html())
            .with_response("https://example.com", html().with_header("strict-transport-security", "max-age=1"))
            .with_dns("www.example.com", RecordType::Aaaa, json!({"Answer": [{"type": 28, "data": "2001:db8::1"}]}));
        let config = AuditConfig::default();
        let collection = run_probes("www.example.com", &transport, &ApexLookup::from_list_text(LIST), &config, None)
            .await
            .unwrap();

        assert_eq!(collection.apex.as_deref(), Some("example.com"));
        assert!(collection.is_ipv6);
        assert!(collection.bundle.header(Slot::ResponseFld, "strict-transport-security").is_some());
        assert!(transport.requests().iter().any(|u| u.contains("name=_dmarc.example.com")));
    }

    #[tokio::test]
    async fn missing_primary_response_aborts_unless_filtered() {
        let transport = StaticTransport::new();
        let config = AuditConfig::default();
        let apex = ApexLookup::Unavailable("offline".into());
        assert!(run_probes("example.com", &transport, &apex, &config, None).await.is_none());

        let filtered = run_probes("example.com", &transport, &apex, &config, Some("dns_txt"))
            .await
            .unwrap();
        assert!(filtered.bundle.get(Slot::Response).is_none());
        // 13 unfiltered requests, then only the matching slot
        assert_eq!(transport.requests().len(), 14);
    }
}
