// src/core/checks/bad_response.rs

//! Detectors for block and challenge pages. They run first so a blocked audit
//! is obvious before the header checks start failing.

use super::primary_body;
use crate::core::models::{CheckOutcome, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_KASADA_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}/[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

pub static KASADA: CheckSpec = CheckSpec {
    name: "check_bad_response_kasada",
    id: "bad_kasada",
    description: "Response should not contain hints of a Kasada error page",
    topic: CheckTopic::BadResponse,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_kasada),
};

pub static CLOUDFLARE: CheckSpec = CheckSpec {
    name: "check_bad_response_cloudflare",
    id: "bad_cloudflare",
    description: "Response should not contain hints of a Cloudflare captcha page",
    topic: CheckTopic::BadResponse,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_cloudflare),
};

fn check_kasada(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let blocked = bundle
        .get(Slot::Response)
        .is_some_and(|r| r.status == 429 && RE_KASADA_TOKEN.is_match(&r.text()));
    spec.verdict(!blocked, ctx)
}

fn check_cloudflare(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    spec.verdict(!primary_body(bundle).contains(r#"div id="cf-content""#), ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProbeResponse;
    use crate::test_helpers::{context, primary};

    const TOKEN: &str = "0f1e2d3c-4b5a-6978-8a9b-0c1d2e3f4a5b/9a8b7c6d-5e4f-3a2b-1c0d-9e8f7a6b5c4d";

    #[test]
    fn kasada_needs_429_and_token() {
        let ctx = context("example.com");
        let blocked = primary(ProbeResponse::new(429).with_body(format!("<script src=\"/{TOKEN}/ips.js\">")));
        let outcome = check_kasada(&KASADA, &blocked, &ctx);
        assert!(!outcome.passed);
        assert!(outcome.is_warning());

        let ok_status = primary(ProbeResponse::new(200).with_body(format!("/{TOKEN}/ips.js")));
        assert!(check_kasada(&KASADA, &ok_status, &ctx).passed);

        let no_token = primary(ProbeResponse::new(429).with_body("slow down"));
        assert!(check_kasada(&KASADA, &no_token, &ctx).passed);
    }

    #[test]
    fn cloudflare_challenge_is_a_warning() {
        let ctx = context("example.com");
        let challenge = primary(ProbeResponse::new(403).with_body(r#"<div id="cf-content">checking</div>"#));
        assert!(check_cloudflare(&CLOUDFLARE, &challenge, &ctx).is_warning());
        assert!(check_cloudflare(&CLOUDFLARE, &ResponseBundle::new(), &ctx).passed);
    }
}
