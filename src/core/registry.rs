// src/core/registry.rs

//! The ordered catalog of every check the auditor knows about.
//!
//! Each check is a static `CheckSpec` declared next to its implementation in
//! `core::checks`. `CHECKS` fixes the registration order, which is also the
//! order outcomes are reported in.

use crate::config::AuditConfig;
use crate::core::checks::{
    bad_response, content, cookies, cross_origin, csp, dns, email, hsts, html, leaky_headers, ns, redirect,
    report_to, ssl, status, swagger, well_known,
};
use crate::core::models::{CheckOutcome, ResponseBundle};
use crate::core::scanner::http_probe::Transport;
use crate::core::scanner::ssl_scanner::{CertificateSummary, TlsProbe};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::warn;

/// Topic a check belongs to. Organizational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckTopic {
    BadResponse,
    Content,
    Cookies,
    CrossOrigin,
    Csp,
    Dns,
    Email,
    Hsts,
    Html,
    LeakyHeaders,
    Nameservers,
    Redirect,
    ReportTo,
    Ssl,
    Status,
    ApiDocs,
    WellKnown,
}

impl fmt::Display for CheckTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckTopic::BadResponse => "Bad Responses",
            CheckTopic::Content => "Content Headers",
            CheckTopic::Cookies => "Cookies",
            CheckTopic::CrossOrigin => "Cross-Origin Isolation",
            CheckTopic::Csp => "Content-Security-Policy",
            CheckTopic::Dns => "DNS",
            CheckTopic::Email => "Email Authentication",
            CheckTopic::Hsts => "HSTS",
            CheckTopic::Html => "HTML",
            CheckTopic::LeakyHeaders => "Leaky Headers",
            CheckTopic::Nameservers => "Nameservers",
            CheckTopic::Redirect => "HTTP -> HTTPS Redirect",
            CheckTopic::ReportTo => "Report-To",
            CheckTopic::Ssl => "SSL/TLS Certificate",
            CheckTopic::Status => "HTTP Status",
            CheckTopic::ApiDocs => "API Documentation",
            CheckTopic::WellKnown => "Well-Known Files",
        };
        write!(f, "{label}")
    }
}

/// When a check is eligible to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Always,
    /// Only when the root response is HTML.
    Html,
    /// Only with the fuzz flag, since these issue speculative requests.
    Fuzz,
}

pub type StaticCheck = fn(&CheckSpec, &ResponseBundle, &CheckContext) -> CheckOutcome;

pub type ProbingCheck =
    for<'a> fn(&'a CheckSpec, &'a ResponseBundle, &'a CheckContext) -> BoxFuture<'a, Option<CheckOutcome>>;

/// How a check computes its outcome.
#[derive(Clone, Copy)]
pub enum Evaluator {
    /// Pure function of the bundle and context.
    Static(StaticCheck),
    /// May use the TLS capability or issue secondary fetches, and may decline.
    Probing(ProbingCheck),
}

/// Definition of one check.
pub struct CheckSpec {
    /// Unique across the registry; matched by the check filter.
    pub name: &'static str,
    /// Short identifier reported with the outcome; may be shared.
    pub id: &'static str,
    pub description: &'static str,
    pub topic: CheckTopic,
    pub selection: Selection,
    pub warn_on_fail: bool,
    pub evaluator: Evaluator,
}

impl CheckSpec {
    /// Outcome whose message is the bare description.
    pub fn verdict(&self, passed: bool, ctx: &CheckContext) -> CheckOutcome {
        self.outcome(passed, self.description.to_string(), ctx)
    }

    /// Outcome whose message is the description followed by the observed value.
    pub fn verdict_with(&self, passed: bool, observed: impl fmt::Display, ctx: &CheckContext) -> CheckOutcome {
        self.outcome(passed, format!("{} ({observed})", self.description), ctx)
    }

    pub fn outcome(&self, passed: bool, message: String, ctx: &CheckContext) -> CheckOutcome {
        CheckOutcome {
            passed,
            message,
            check: self.id,
            name: self.name,
            warn_on_fail: self.warn_on_fail,
            domain: ctx.domain.clone(),
        }
    }

    pub fn matches_filter(&self, filter: &str) -> bool {
        self.name.contains(filter) || self.id.contains(filter)
    }

    pub async fn evaluate(&self, bundle: &ResponseBundle, ctx: &CheckContext) -> Option<CheckOutcome> {
        match self.evaluator {
            Evaluator::Static(check) => Some(check(self, bundle, ctx)),
            Evaluator::Probing(check) => check(self, bundle, ctx).await,
        }
    }
}

impl fmt::Debug for CheckSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckSpec")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("selection", &self.selection)
            .field("warn_on_fail", &self.warn_on_fail)
            .finish()
    }
}

/// Context shared by every check of one audit.
pub struct CheckContext {
    /// The audited domain as given, possibly with a path.
    pub domain: String,
    pub domain_with_no_path: String,
    /// Registrable parent, only when the audited host is a strict subdomain.
    pub apex: Option<String>,
    pub is_ipv6: bool,
    pub print_output: bool,
    pub transport: Arc<dyn Transport>,
    pub tls: Arc<dyn TlsProbe>,
    pub config: Arc<AuditConfig>,
    certificate: OnceCell<Option<CertificateSummary>>,
}

impl CheckContext {
    pub fn new(
        domain: &str,
        domain_with_no_path: &str,
        transport: Arc<dyn Transport>,
        tls: Arc<dyn TlsProbe>,
        config: Arc<AuditConfig>,
    ) -> Self {
        Self {
            domain: domain.to_string(),
            domain_with_no_path: domain_with_no_path.to_string(),
            apex: None,
            is_ipv6: false,
            print_output: true,
            transport,
            tls,
            config,
            certificate: OnceCell::new(),
        }
    }

    pub fn with_apex(mut self, apex: Option<String>) -> Self {
        self.apex = apex;
        self
    }

    pub fn with_ipv6(mut self, is_ipv6: bool) -> Self {
        self.is_ipv6 = is_ipv6;
        self
    }

    pub fn with_print_output(mut self, print_output: bool) -> Self {
        self.print_output = print_output;
        self
    }

    /// The leaf certificate of the audited host, read at most once per audit.
    pub async fn certificate(&self) -> Option<&CertificateSummary> {
        self.certificate
            .get_or_init(|| async {
                match self.tls.peer_certificate(&self.domain_with_no_path, self.is_ipv6).await {
                    Ok(cert) => cert,
                    Err(e) => {
                        warn!(host = %self.domain_with_no_path, error = %e, "Could not read certificate.");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

/// Every check, in registration order.
pub static CHECKS: &[&CheckSpec] = &[
    &bad_response::KASADA,
    &bad_response::CLOUDFLARE,
    &redirect::HTTP_TO_HTTPS,
    &status::RESPONSE_IS_200,
    &content::INCLUDES_CONTENT_TYPE,
    &dns::AAAA_RECORD_EXISTS,
    &hsts::HEADER_INCLUDED,
    &hsts::LONG_MAX_AGE,
    &hsts::INCLUDE_SUBDOMAINS,
    &hsts::PRELOAD,
    &csp::EXISTS,
    &csp::STARTS_WITH_DEFAULT_SRC_NONE,
    &csp::DEFAULT_OR_SCRIPT_DIRECTIVE,
    &csp::NO_UNSAFE_INLINE,
    &csp::NO_UNSAFE_EVAL,
    &csp::NO_REPORT_SAMPLE,
    &csp::UPGRADE_INSECURE_REQUESTS,
    &csp::NO_REPORT_URI,
    &csp::NO_REPORT_TO,
    &csp::VALID_DIRECTIVES,
    &report_to::HEADER_NOT_INCLUDED,
    &well_known::ROBOTS_TXT,
    &well_known::SECURITY_TXT,
    &well_known::SECURITY_TXT_NOT_EXPIRED,
    &well_known::FAVICON,
    &content::GZIPPED,
    &content::CHARSET,
    &content::EXPIRES_WITHOUT_CACHE_CONTROL,
    &content::CACHE_CONTROL_INCLUDED,
    &content::NO_P3P,
    &html::REFERRER_POLICY,
    &cross_origin::RESOURCE_POLICY,
    &cross_origin::OPENER_POLICY,
    &cross_origin::EMBEDDER_POLICY,
    &leaky_headers::NO_LEAKY_HEADERS,
    &ssl::EXPIRY_MAX,
    &ssl::EXPIRY_MIN,
    &ssl::TRUSTED,
    &ssl::FAILS_WITH_TLS_1_1,
    &ssl::FAILS_WITH_TLS_1_0,
    &ssl::OCSP_MUST_STAPLE,
    &ssl::DNS_CAA,
    &ssl::DNS_CAA_ACCOUNTURI,
    &ssl::DNS_CAA_VALIDATIONMETHODS,
    &ns::MINIMUM_COUNT,
    &cookies::SAMESITE,
    &cookies::SECURE,
    &cookies::HTTPONLY,
    &email::SPF_DASH_ALL,
    &email::SPF_EXISTS,
    &email::SPF_DNS_RECORD_ABSENT,
    &email::SPF_DISALLOW_ALL,
    &email::DMARC_EXISTS,
    &email::DMARC_REJECTS,
    &email::SPF_LOOKUPS,
    &html::PERMISSIONS_POLICY,
    &html::FRAME_ANCESTORS,
    &html::NOSNIFF,
    &html::NO_X_XSS_PROTECTION,
    &html::DOCTYPE,
    &html::LANG,
    &html::META_CHARSET,
    &html::TITLE,
    &html::REL_ICON,
    &html::NO_SCHEMELESS_URLS,
    &html::SRI,
    &html::UNNECESSARY_ENTITIES,
    &html::CACHE_DURATION,
    &html::DNS_PREFETCH_OFF,
    &html::NO_CDNS,
    &html::FEED_CORS,
    &swagger::NOT_EXPOSED,
];

/// Looks a check up by its unique name.
pub fn find_check(name: &str) -> Option<&'static CheckSpec> {
    CHECKS.iter().copied().find(|c| c.name == name)
}

/// `(topic, description)` of every check, for `--doc`.
pub fn describe_checks() -> Vec<(CheckTopic, &'static str)> {
    CHECKS.iter().map(|c| (c.topic, c.description)).collect()
}
