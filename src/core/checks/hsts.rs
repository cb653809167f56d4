// src/core/checks/hsts.rs

use super::observed;
use crate::core::models::{CheckOutcome, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use once_cell::sync::Lazy;
use regex::Regex;

/// One year, the floor for a useful max-age (and for preload-list submission).
pub const MIN_MAX_AGE: u64 = 31_536_000;

static RE_MAX_AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^max-age=(\d+)").unwrap());

pub static HEADER_INCLUDED: CheckSpec = CheckSpec {
    name: "check_hsts_header_should_be_included_in_response",
    id: "ssl_hsts",
    description: "HSTS Header should be included in response",
    topic: CheckTopic::Hsts,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_header_included),
};

pub static LONG_MAX_AGE: CheckSpec = CheckSpec {
    name: "check_hsts_header_should_have_a_long_max_age",
    id: "ssl_hsts_duration",
    description: "HSTS Header should have a long max-age",
    topic: CheckTopic::Hsts,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_long_max_age),
};

pub static INCLUDE_SUBDOMAINS: CheckSpec = CheckSpec {
    name: "check_hsts_header_should_have_includesubdomains",
    id: "ssl_hsts_subdomains",
    description: "HSTS Header should have includeSubdomains",
    topic: CheckTopic::Hsts,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_include_subdomains),
};

pub static PRELOAD: CheckSpec = CheckSpec {
    name: "check_hsts_header_should_have_preload",
    id: "ssl_hsts_preload",
    description: "HSTS Header should have preload",
    topic: CheckTopic::Hsts,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_preload),
};

fn hsts(bundle: &ResponseBundle, slot: Slot) -> Option<&str> {
    bundle.header(slot, "strict-transport-security")
}

/// `max-age` at the very start of the header value, if it parses.
pub fn parse_max_age(value: &str) -> Option<u64> {
    RE_MAX_AGE
        .captures(value)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn has_include_subdomains(value: &str) -> bool {
    value.to_ascii_lowercase().contains("includesubdomains")
}

fn has_preload(value: &str) -> bool {
    // preload lists reject entries that do not also cover subdomains
    value.to_ascii_lowercase().contains("preload") && has_include_subdomains(value)
}

/// Evaluates `holds` on the primary header, then on the apex response's
/// header when the primary fails and an apex response exists.
fn with_apex_fallback(
    spec: &CheckSpec,
    bundle: &ResponseBundle,
    ctx: &CheckContext,
    holds: fn(&str) -> bool,
) -> CheckOutcome {
    let primary = hsts(bundle, Slot::Response);
    if primary.is_some_and(holds) {
        return spec.verdict_with(true, observed(primary), ctx);
    }

    if bundle.get(Slot::ResponseFld).is_some() {
        let apex_value = hsts(bundle, Slot::ResponseFld);
        let apex_name = ctx.apex.as_deref().unwrap_or("apex domain");
        return spec.verdict_with(
            apex_value.is_some_and(holds),
            format!("{}; fallback to {apex_name}: {}", observed(primary), observed(apex_value)),
            ctx,
        );
    }

    spec.verdict_with(false, observed(primary), ctx)
}

fn check_header_included(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let value = hsts(bundle, Slot::Response);
    spec.verdict_with(value.is_some(), observed(value), ctx)
}

fn check_long_max_age(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let value = hsts(bundle, Slot::Response);
    let passed = match value.and_then(parse_max_age) {
        Some(max_age) => max_age >= MIN_MAX_AGE,
        None => false,
    };
    spec.verdict_with(passed, observed(value), ctx)
}

fn check_include_subdomains(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    with_apex_fallback(spec, bundle, ctx, has_include_subdomains)
}

fn check_preload(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    with_apex_fallback(spec, bundle, ctx, has_preload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProbeResponse;
    use crate::test_helpers::{context, primary};

    fn with_hsts(value: &str) -> ProbeResponse {
        ProbeResponse::new(200).with_header("strict-transport-security", value)
    }

    #[test]
    fn max_age_threshold() {
        let ctx = context("example.com");
        assert!(check_long_max_age(&LONG_MAX_AGE, &primary(with_hsts("max-age=31536001")), &ctx).passed);
        assert!(check_long_max_age(&LONG_MAX_AGE, &primary(with_hsts("MAX-AGE=31536000; preload")), &ctx).passed);
        assert!(!check_long_max_age(&LONG_MAX_AGE, &primary(with_hsts("max-age=0")), &ctx).passed);
        assert!(!check_long_max_age(&LONG_MAX_AGE, &primary(ProbeResponse::new(200)), &ctx).passed);
    }

    #[test]
    fn max_age_must_lead_the_value() {
        assert_eq!(parse_max_age("max-age=63072000; includeSubDomains"), Some(63_072_000));
        assert_eq!(parse_max_age("includeSubDomains; max-age=63072000"), None);
        assert_eq!(parse_max_age("max-age=soon"), None);
        assert_eq!(parse_max_age("max-age=99999999999999999999999"), None);
    }

    #[test]
    fn header_presence() {
        let ctx = context("example.com");
        assert!(check_header_included(&HEADER_INCLUDED, &primary(with_hsts("max-age=1")), &ctx).passed);
        assert!(!check_header_included(&HEADER_INCLUDED, &ResponseBundle::new(), &ctx).passed);
    }

    #[test]
    fn include_subdomains_with_apex_fallback() {
        let ctx = context("www.example.com").with_apex(Some("example.com".into()));
        let own = primary(with_hsts("max-age=31536000; includeSubDomains"));
        assert!(check_include_subdomains(&INCLUDE_SUBDOMAINS, &own, &ctx).passed);

        let fallback = primary(with_hsts("max-age=31536000"))
            .with(Slot::ResponseFld, with_hsts("max-age=31536000; includeSubDomains"));
        let outcome = check_include_subdomains(&INCLUDE_SUBDOMAINS, &fallback, &ctx);
        assert!(outcome.passed);
        assert!(outcome.message.contains("fallback to example.com"));

        let neither = primary(with_hsts("max-age=31536000"));
        assert!(!check_include_subdomains(&INCLUDE_SUBDOMAINS, &neither, &ctx).passed);

        let apex_lacks_it = primary(with_hsts("max-age=31536000")).with(Slot::ResponseFld, with_hsts("max-age=31536000"));
        assert!(!check_include_subdomains(&INCLUDE_SUBDOMAINS, &apex_lacks_it, &ctx).passed);
    }

    #[test]
    fn preload_requires_include_subdomains() {
        let ctx = context("example.com");
        assert!(check_preload(&PRELOAD, &primary(with_hsts("max-age=63072000; includeSubDomains; preload")), &ctx).passed);
        assert!(!check_preload(&PRELOAD, &primary(with_hsts("max-age=63072000; preload")), &ctx).passed);

        let fallback = primary(with_hsts("max-age=63072000"))
            .with(Slot::ResponseFld, with_hsts("max-age=63072000; includeSubDomains; preload"));
        assert!(check_preload(&PRELOAD, &fallback, &ctx).passed);
    }
}
