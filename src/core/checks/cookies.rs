// src/core/checks/cookies.rs

//! Cookie flag checks. Each `Set-Cookie` value is inspected on its own, and
//! a response that sets no cookie passes all three.

use super::list;
use crate::core::models::{CheckOutcome, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};

pub static SAMESITE: CheckSpec = CheckSpec {
    name: "check_cookies_should_be_samesite",
    id: "cookies_samesite",
    description: "Cookies should set the SameSite flag",
    topic: CheckTopic::Cookies,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_samesite),
};

pub static SECURE: CheckSpec = CheckSpec {
    name: "check_cookies_should_be_secure",
    id: "cookies_secure",
    description: "Cookies should set the Secure flag",
    topic: CheckTopic::Cookies,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_secure),
};

pub static HTTPONLY: CheckSpec = CheckSpec {
    name: "check_cookies_should_be_httponly",
    id: "cookies_httponly",
    description: "Cookies should set the HttpOnly flag",
    topic: CheckTopic::Cookies,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_httponly),
};

/// Lowercased attributes of one `Set-Cookie` value, without the name=value pair.
fn attributes(cookie: &str) -> impl Iterator<Item = String> + '_ {
    cookie.split(';').skip(1).map(|a| a.trim().to_ascii_lowercase())
}

fn every_cookie(
    spec: &CheckSpec,
    bundle: &ResponseBundle,
    ctx: &CheckContext,
    has_flag: impl Fn(&str) -> bool,
) -> CheckOutcome {
    let cookies = bundle
        .get(Slot::Response)
        .map(|r| r.header_values("set-cookie").to_vec())
        .unwrap_or_default();
    if cookies.is_empty() {
        return spec.verdict_with(true, "no cookie set", ctx);
    }
    let passed = cookies.iter().all(|c| attributes(c).any(|a| has_flag(&a)));
    spec.verdict_with(passed, list(&cookies), ctx)
}

fn check_samesite(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    every_cookie(spec, bundle, ctx, |a| a.starts_with("samesite="))
}

fn check_secure(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    every_cookie(spec, bundle, ctx, |a| a == "secure")
}

fn check_httponly(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    every_cookie(spec, bundle, ctx, |a| a == "httponly")
}
