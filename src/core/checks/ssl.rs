// src/core/checks/ssl.rs

//! Certificate, protocol and CAA checks. The certificate and handshake
//! checks go through the context's `TlsProbe`; the certificate itself is
//! read once per audit and shared.

use super::list;
use crate::core::models::{CheckOutcome, RecordType, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use crate::core::scanner::ssl_scanner::TlsVersion;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};

/// Longest validity browsers accept for a new certificate (CA/Browser Forum).
pub const EXPIRY_MAX_DAYS: i64 = 398;
/// Renewal margin; less than this left is treated as about to lapse.
pub const EXPIRY_MIN_DAYS: i64 = 5;
/// Certificates shorter-lived than this need no must-staple extension.
pub const SHORT_LIVED_DAYS: i64 = 10;

pub static EXPIRY_MAX: CheckSpec = CheckSpec {
    name: "check_ssl_expiry_should_be_less_than_one_year",
    id: "ssl_expiry_max",
    description: "SSL expiry should be less than 398 days",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Probing(check_expiry_max),
};

pub static EXPIRY_MIN: CheckSpec = CheckSpec {
    name: "check_ssl_expiry_should_be_greater_than_five_days",
    id: "ssl_expiry_min",
    description: "SSL expiry should be greater than five days",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Probing(check_expiry_min),
};

pub static TRUSTED: CheckSpec = CheckSpec {
    name: "check_ssl_certificate_should_be_trusted",
    id: "ssl_trusted",
    description: "SSL certificate should be trusted",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Probing(check_trusted),
};

pub static FAILS_WITH_TLS_1_1: CheckSpec = CheckSpec {
    name: "check_ssl_connection_fails_with_tls_1_1",
    id: "ssl_tls_1_1",
    description: "SSL connection fails when using TLS 1.1",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Probing(check_fails_with_tls_1_1),
};

pub static FAILS_WITH_TLS_1_0: CheckSpec = CheckSpec {
    name: "check_ssl_connection_fails_with_tls_1_0",
    id: "ssl_tls_1_0",
    description: "SSL connection fails when using TLS 1.0",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Probing(check_fails_with_tls_1_0),
};

pub static OCSP_MUST_STAPLE: CheckSpec = CheckSpec {
    name: "check_ssl_certificate_should_provide_ocsp_must_staple",
    id: "ssl_ocsp_must_staple",
    description: "Long-lived SSL certificate should provide OCSP must-staple",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Probing(check_ocsp_must_staple),
};

pub static DNS_CAA: CheckSpec = CheckSpec {
    name: "check_dns_caa_record_should_exist",
    id: "ssl_dns_caa",
    description: "DNS CAA should be enabled",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_dns_caa),
};

pub static DNS_CAA_ACCOUNTURI: CheckSpec = CheckSpec {
    name: "check_dns_caa_record_should_include_accounturi",
    id: "ssl_dns_caa_accounturi",
    description: "DNS CAA should include accounturi",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_dns_caa_accounturi),
};

pub static DNS_CAA_VALIDATIONMETHODS: CheckSpec = CheckSpec {
    name: "check_dns_caa_record_should_include_validationmethods",
    id: "ssl_dns_caa_validationmethods",
    description: "DNS CAA should include validationmethods",
    topic: CheckTopic::Ssl,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_dns_caa_validationmethods),
};

async fn days_until_expiry(ctx: &CheckContext) -> Option<i64> {
    ctx.certificate().await.map(|cert| cert.days_until_expiry(Utc::now()))
}

fn days_label(days: Option<i64>) -> String {
    match days {
        Some(days) => format!("{days} days"),
        None => "no certificate".to_string(),
    }
}

fn check_expiry_max<'a>(
    spec: &'a CheckSpec,
    _bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move {
        let days = days_until_expiry(ctx).await;
        Some(spec.verdict_with(days.is_some_and(|d| d < EXPIRY_MAX_DAYS), days_label(days), ctx))
    }
    .boxed()
}

fn check_expiry_min<'a>(
    spec: &'a CheckSpec,
    _bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move {
        let days = days_until_expiry(ctx).await;
        Some(spec.verdict_with(days.is_some_and(|d| d > EXPIRY_MIN_DAYS), days_label(days), ctx))
    }
    .boxed()
}

fn check_trusted<'a>(
    spec: &'a CheckSpec,
    _bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move {
        let trusted = ctx.tls.verified_handshake(&ctx.domain_with_no_path, ctx.is_ipv6).await;
        Some(spec.verdict(trusted, ctx))
    }
    .boxed()
}

async fn legacy_protocol_refused(spec: &CheckSpec, ctx: &CheckContext, version: TlsVersion) -> CheckOutcome {
    let connected = ctx.tls.handshake_with(&ctx.domain_with_no_path, ctx.is_ipv6, version).await;
    spec.verdict(!connected, ctx)
}

fn check_fails_with_tls_1_1<'a>(
    spec: &'a CheckSpec,
    _bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move { Some(legacy_protocol_refused(spec, ctx, TlsVersion::Tls11).await) }.boxed()
}

fn check_fails_with_tls_1_0<'a>(
    spec: &'a CheckSpec,
    _bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move { Some(legacy_protocol_refused(spec, ctx, TlsVersion::Tls10).await) }.boxed()
}

fn check_ocsp_must_staple<'a>(
    spec: &'a CheckSpec,
    _bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move {
        let Some(cert) = ctx.certificate().await else {
            // not being able to read the certificate at all is a hard failure
            let mut outcome = spec.verdict_with(false, "failed to load certificate", ctx);
            outcome.warn_on_fail = false;
            return Some(outcome);
        };
        let outcome = if cert.lifetime_days() < SHORT_LIVED_DAYS {
            spec.verdict_with(true, "certificate is short-lived", ctx)
        } else if cert.has_must_staple {
            spec.verdict_with(true, "includes extension", ctx)
        } else {
            spec.verdict_with(false, "missing extension", ctx)
        };
        Some(outcome)
    }
    .boxed()
}

/// CAA records of the host, or of the apex when the host has none.
fn caa_records(bundle: &ResponseBundle) -> Vec<String> {
    bundle.records_with_fallback(Slot::DnsCaa, RecordType::Caa).0
}

fn issue_records(bundle: &ResponseBundle) -> Vec<String> {
    caa_records(bundle).into_iter().filter(|r| r.contains("issue ")).collect()
}

fn check_dns_caa(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let records = caa_records(bundle);
    let passed = !records.is_empty() && records.iter().all(|r| r.contains("issue") || r.contains("iodef"));
    spec.verdict_with(passed, list(&records), ctx)
}

fn issue_records_include(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext, tag: &str) -> CheckOutcome {
    let records = issue_records(bundle);
    let passed = !records.is_empty() && records.iter().all(|r| r.contains(tag));
    spec.verdict_with(passed, list(&records), ctx)
}

fn check_dns_caa_accounturi(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    issue_records_include(spec, bundle, ctx, "accounturi=")
}

fn check_dns_caa_validationmethods(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    issue_records_include(spec, bundle, ctx, "validationmethods=")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{certificate, context, context_with, dns, FakeTls, StaticTransport};
    use serde_json::json;

    fn tls_context(tls: FakeTls) -> CheckContext {
        context_with("example.com", StaticTransport::new(), tls)
    }

    #[tokio::test]
    async fn expiry_window() {
        let bundle = ResponseBundle::new();
        let ctx = tls_context(FakeTls { certificate: Some(certificate(90, 80, true)), ..FakeTls::default() });
        let max = EXPIRY_MAX.evaluate(&bundle, &ctx).await.unwrap();
        assert!(max.passed);
        assert_eq!(max.message, "SSL expiry should be less than 398 days (80 days)");
        assert!(EXPIRY_MIN.evaluate(&bundle, &ctx).await.unwrap().passed);

        let too_long = tls_context(FakeTls { certificate: Some(certificate(800, 700, true)), ..FakeTls::default() });
        assert!(!EXPIRY_MAX.evaluate(&bundle, &too_long).await.unwrap().passed);

        let lapsing = tls_context(FakeTls { certificate: Some(certificate(90, 3, true)), ..FakeTls::default() });
        assert!(!EXPIRY_MIN.evaluate(&bundle, &lapsing).await.unwrap().passed);

        let none = tls_context(FakeTls { certificate: None, ..FakeTls::default() });
        let outcome = EXPIRY_MAX.evaluate(&bundle, &none).await.unwrap();
        assert!(!outcome.passed);
        assert!(outcome.message.contains("no certificate"));
    }

    #[tokio::test]
    async fn trust_and_legacy_protocols() {
        let bundle = ResponseBundle::new();
        let good = tls_context(FakeTls::default());
        assert!(TRUSTED.evaluate(&bundle, &good).await.unwrap().passed);
        assert!(FAILS_WITH_TLS_1_0.evaluate(&bundle, &good).await.unwrap().passed);
        assert!(FAILS_WITH_TLS_1_1.evaluate(&bundle, &good).await.unwrap().passed);

        let legacy = tls_context(FakeTls { trusted: false, accepts_tls_1_0: true, ..FakeTls::default() });
        assert!(!TRUSTED.evaluate(&bundle, &legacy).await.unwrap().passed);
        assert!(!FAILS_WITH_TLS_1_0.evaluate(&bundle, &legacy).await.unwrap().passed);
        assert!(FAILS_WITH_TLS_1_1.evaluate(&bundle, &legacy).await.unwrap().passed);
    }

    #[tokio::test]
    async fn must_staple() {
        let bundle = ResponseBundle::new();
        let stapled = tls_context(FakeTls { certificate: Some(certificate(90, 80, true)), ..FakeTls::default() });
        assert!(OCSP_MUST_STAPLE.evaluate(&bundle, &stapled).await.unwrap().passed);

        let short_lived = tls_context(FakeTls { certificate: Some(certificate(7, 5, false)), ..FakeTls::default() });
        let outcome = OCSP_MUST_STAPLE.evaluate(&bundle, &short_lived).await.unwrap();
        assert!(outcome.passed);
        assert!(outcome.message.contains("short-lived"));

        let missing = tls_context(FakeTls { certificate: Some(certificate(90, 80, false)), ..FakeTls::default() });
        assert!(OCSP_MUST_STAPLE.evaluate(&bundle, &missing).await.unwrap().is_warning());

        let unreadable = tls_context(FakeTls { certificate: None, ..FakeTls::default() });
        assert!(OCSP_MUST_STAPLE.evaluate(&bundle, &unreadable).await.unwrap().is_failure());
    }

    #[test]
    fn caa_records_and_tags() {
        let ctx = context("example.com");
        let bundle = ResponseBundle::new().with(
            Slot::DnsCaa,
            dns(json!([
                {"type": 257, "data": "0 issue \"letsencrypt.org; accounturi=https://acme-v02.api.letsencrypt.org/acme/acct/1; validationmethods=dns-01\""},
                {"type": 257, "data": "0 iodef \"mailto:security@example.com\""},
            ])),
        );
        assert!(check_dns_caa(&DNS_CAA, &bundle, &ctx).passed);
        assert!(check_dns_caa_accounturi(&DNS_CAA_ACCOUNTURI, &bundle, &ctx).passed);
        assert!(check_dns_caa_validationmethods(&DNS_CAA_VALIDATIONMETHODS, &bundle, &ctx).passed);

        let plain = ResponseBundle::new().with(Slot::DnsCaa, dns(json!([{"type": 257, "data": "0 issue \"letsencrypt.org\""}])));
        assert!(check_dns_caa(&DNS_CAA, &plain, &ctx).passed);
        assert!(check_dns_caa_accounturi(&DNS_CAA_ACCOUNTURI, &plain, &ctx).is_warning());
        assert!(check_dns_caa_validationmethods(&DNS_CAA_VALIDATIONMETHODS, &plain, &ctx).is_warning());
    }

    #[test]
    fn caa_falls_back_to_apex() {
        let ctx = context("www.example.com");
        let bundle = ResponseBundle::new()
            .with(Slot::DnsCaa, dns(json!([])))
            .with(Slot::DnsCaaFld, dns(json!([{"type": 257, "data": "0 issue \"pki.goog\""}])));
        assert!(check_dns_caa(&DNS_CAA, &bundle, &ctx).passed);

        let empty = ResponseBundle::new().with(Slot::DnsCaa, dns(json!([])));
        assert!(!check_dns_caa(&DNS_CAA, &empty, &ctx).passed);
        assert!(check_dns_caa_accounturi(&DNS_CAA_ACCOUNTURI, &empty, &ctx).is_warning());
    }
}
