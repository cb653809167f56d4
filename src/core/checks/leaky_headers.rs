// src/core/checks/leaky_headers.rs

use super::primary_header;
use crate::core::models::{CheckOutcome, ResponseBundle};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use once_cell::sync::Lazy;
use regex::Regex;

/// Headers that commonly reveal server software, build or backend details.
pub const LEAKY_HEADERS: &[&str] = &[
    "apigw-requestid",
    "cdn-cache",
    "cf-edge-cache",
    "fastly-debug-states",
    "fly-request-id",
    "ghost-fastly",
    "served-by",
    "server",
    "x-appversion",
    "x-aspnet-version",
    "x-aspnetmvc-version",
    "x-backend-name",
    "x-backend-server",
    "x-backend",
    "x-build-id",
    "x-build",
    "x-cache-info",
    "x-cache-key",
    "x-cache-rule",
    "x-cached-by",
    "x-cdn-rule",
    "x-cdn",
    "x-cf-worker",
    "x-client-ip",
    "x-diaspora-version",
    "x-drupal-theme",
    "x-fastly-request-id",
    "x-fw-version",
    "x-generator",
    "x-github-backend",
    "x-hosted-by",
    "x-httpd",
    "x-kinja-revision",
    "x-lambda-id",
    "x-last-commmit-hash",
    "x-litespeed-cache",
    "x-nextjs-page",
    "x-nodejs",
    "x-origin-server",
    "x-powered-by-plesk",
    "x-powered-by",
    "x-powered",
    "x-protected-by",
    "x-provided-by",
    "x-section",
    "x-server-powered-by",
    "x-server",
    "x-tumblr-user",
    "x-varnish",
    "x-vercel-id",
    "x-version",
    "via",
];

// Only a value carrying something version-like counts as a leak.
static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d\.\d").unwrap());

pub static NO_LEAKY_HEADERS: CheckSpec = CheckSpec {
    name: "check_should_not_include_leaky_headers",
    id: "leaky_headers",
    description: "Headers that leak information should not be in the response",
    topic: CheckTopic::LeakyHeaders,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_leaky_headers),
};

fn check_leaky_headers(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let leaky: Vec<&str> = LEAKY_HEADERS
        .iter()
        .copied()
        .filter(|h| primary_header(bundle, h).is_some_and(|v| RE_VERSION.is_match(v)))
        .collect();
    spec.verdict_with(leaky.is_empty(), format!("[{}]", leaky.join(", ")), ctx)
}
