// src/core/checks/well_known.rs

use super::observed;
use crate::core::models::{CheckOutcome, ProbeResponse, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Media types a favicon may be served with.
const ICON_TYPES: &[&str] = &["image/x-icon", "image/vnd.microsoft.icon"];

pub static ROBOTS_TXT: CheckSpec = CheckSpec {
    name: "check_robots_txt_exists",
    id: "wellknown_robots",
    description: "Robots.txt exists and is a text file",
    topic: CheckTopic::WellKnown,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_robots_txt),
};

pub static SECURITY_TXT: CheckSpec = CheckSpec {
    name: "check_security_txt_exists",
    id: "wellknown_security",
    description: "Security.txt exists and is a text file that contains required attributes",
    topic: CheckTopic::WellKnown,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_security_txt),
};

pub static SECURITY_TXT_NOT_EXPIRED: CheckSpec = CheckSpec {
    name: "check_security_txt_not_expired",
    id: "wellknown_security_not_expired",
    description: "Security.txt has an expiry date in the future",
    topic: CheckTopic::WellKnown,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_security_txt_not_expired),
};

pub static FAVICON: CheckSpec = CheckSpec {
    name: "check_favicon_is_served",
    id: "wellknown_favicon",
    description: "Favicon is served at /favicon.ico",
    topic: CheckTopic::WellKnown,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_favicon),
};

fn is_text_file(response: &ProbeResponse) -> bool {
    response.status == 200 && response.header("content-type").unwrap_or_default().contains("text/plain")
}

fn check_robots_txt(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    spec.verdict(bundle.get(Slot::RobotsTxt).is_some_and(is_text_file), ctx)
}

fn check_security_txt(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let passed = bundle.get(Slot::SecurityTxt).is_some_and(|r| {
        let body = r.text();
        is_text_file(r) && body.contains("Contact:") && body.contains("Expires:")
    });
    spec.verdict(passed, ctx)
}

/// Result of reading the `Expires:` field of a security.txt body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityTxtExpiry {
    Missing,
    Invalid(String),
    At(DateTime<Utc>),
}

/// Finds the first `Expires:` line and parses it as an ISO-8601 timestamp.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_expires(body: &str) -> SecurityTxtExpiry {
    let Some(value) = body
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Expires:"))
        .map(str::trim)
    else {
        return SecurityTxtExpiry::Missing;
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return SecurityTxtExpiry::At(at.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => SecurityTxtExpiry::At(naive.and_utc()),
        Err(_) => SecurityTxtExpiry::Invalid(value.to_string()),
    }
}

fn check_security_txt_not_expired(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let Some(response) = bundle.get(Slot::SecurityTxt) else {
        return spec.verdict_with(false, "no security.txt", ctx);
    };
    match parse_expires(&response.text()) {
        SecurityTxtExpiry::At(at) => spec.verdict_with(at > Utc::now(), at.to_rfc3339(), ctx),
        SecurityTxtExpiry::Invalid(value) => spec.verdict_with(false, format!("could not parse {value:?}"), ctx),
        SecurityTxtExpiry::Missing => spec.verdict_with(false, "no Expires line", ctx),
    }
}

fn check_favicon(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let response = bundle.get(Slot::Favicon);
    let content_type = response.and_then(|r| r.header("content-type"));
    let passed = response.is_some_and(|r| r.status == 200) && content_type.is_some_and(|ct| ICON_TYPES.contains(&ct));
    spec.verdict_with(passed, observed(content_type), ctx)
}
