// src/core/checks/csp.rs

//! Content-Security-Policy checks.
//!
//! The policy comes from the response header, or from a
//! `<meta http-equiv="Content-Security-Policy">` tag when the header is
//! missing. "No CSP" is distinct from an empty policy, and every check here
//! fails when there is no policy at all.

use crate::core::models::{CheckOutcome, ProbeResponse, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use scraper::{Html, Selector};
use tracing::debug;

const MESSAGE_LIMIT: usize = 200;

/// Directive names a policy may use.
pub const VALID_DIRECTIVE_NAMES: &[&str] = &[
    "base-uri",
    "block-all-mixed-content",
    "child-src",
    "connect-src",
    "default-src",
    "font-src",
    "form-action",
    "frame-ancestors",
    "frame-src",
    "img-src",
    "manifest-src",
    "media-src",
    "navigate-to",
    "object-src",
    "plugin-types",
    "prefetch-src",
    "report-to",
    "report-uri",
    "require-sri-for",
    "require-trusted-types-for",
    "sandbox",
    "script-src",
    "script-src-attr",
    "script-src-elem",
    "style-src",
    "style-src-attr",
    "style-src-elem",
    "trusted-types",
    "upgrade-insecure-requests",
    "worker-src",
];

pub static EXISTS: CheckSpec = CheckSpec {
    name: "check_csp_should_exist",
    id: "csp",
    description: "Content-Security-Policy header should exist",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_exists),
};

pub static STARTS_WITH_DEFAULT_SRC_NONE: CheckSpec = CheckSpec {
    name: "check_csp_should_start_with_defaultsrc_none",
    id: "csp_defaultsrc_none",
    description: "Content-Security-Policy header should start with default-src 'none'",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_starts_with_default_src_none),
};

pub static DEFAULT_OR_SCRIPT_DIRECTIVE: CheckSpec = CheckSpec {
    name: "check_csp_includes_default_or_script_directive",
    id: "csp_required_directives",
    description: "Content-Security-Policy must include either default-src or script-src",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_default_or_script_directive),
};

pub static NO_UNSAFE_INLINE: CheckSpec = CheckSpec {
    name: "check_csp_must_not_include_unsafe_inline",
    id: "csp_no_unsafe_inline",
    description: "Content-Security-Policy header must not include unsafe-inline",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_no_unsafe_inline),
};

// Shares its identifier with NO_UNSAFE_INLINE.
pub static NO_UNSAFE_EVAL: CheckSpec = CheckSpec {
    name: "check_csp_must_not_include_unsafe_eval",
    id: "csp_no_unsafe_inline",
    description: "Content-Security-Policy header must not include unsafe-eval",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_no_unsafe_eval),
};

pub static NO_REPORT_SAMPLE: CheckSpec = CheckSpec {
    name: "check_csp_must_not_include_report_sample",
    id: "csp_no_report_sample",
    description: "Content-Security-Policy header must not include report-sample",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_no_report_sample),
};

pub static UPGRADE_INSECURE_REQUESTS: CheckSpec = CheckSpec {
    name: "check_csp_upgrade_insecure_requests",
    id: "csp_upgrade_insecure_requests",
    description: "Content-Security-Policy header should include upgrade-insecure-requests",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_upgrade_insecure_requests),
};

pub static NO_REPORT_URI: CheckSpec = CheckSpec {
    name: "check_csp_must_not_include_reporturi",
    id: "csp_report_uri",
    description: "Content-Security-Policy header must not include report-uri",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_no_report_uri),
};

pub static NO_REPORT_TO: CheckSpec = CheckSpec {
    name: "check_csp_should_not_include_reportto",
    id: "csp_report_to",
    description: "Content-Security-Policy header should not include report-to",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_no_report_to),
};

pub static VALID_DIRECTIVES: CheckSpec = CheckSpec {
    name: "check_csp_should_only_include_valid_directives",
    id: "csp_valid_directives",
    description: "Content-Security-Policy header only includes valid directives",
    topic: CheckTopic::Csp,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_valid_directives),
};

/// The policy in force for `response`: header first, then a meta tag.
pub fn extract_csp(response: Option<&ProbeResponse>) -> Option<String> {
    let response = response?;
    if let Some(value) = response.header("content-security-policy") {
        return Some(value.to_string());
    }
    if response.body.is_empty() {
        return None;
    }

    let document = Html::parse_document(&response.text());
    let Ok(selector) = Selector::parse("meta[http-equiv]") else {
        return None;
    };
    let policy = document
        .select(&selector)
        .find(|el| {
            el.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("content-security-policy"))
        })
        .map(|el| el.value().attr("content").unwrap_or_default().to_string());
    if policy.is_some() {
        debug!("Using Content-Security-Policy from a meta tag.");
    }
    policy
}

/// The policy cut to a printable length; empty when there is none.
pub fn truncate(csp: Option<&str>) -> String {
    let Some(csp) = csp else {
        return String::new();
    };
    if csp.chars().count() > MESSAGE_LIMIT {
        let head: String = csp.chars().take(MESSAGE_LIMIT).collect();
        format!("{head}...")
    } else {
        csp.to_string()
    }
}

/// Lowercased directive names, one per non-empty `;` segment.
pub fn directive_names(csp: &str) -> Vec<String> {
    csp.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.split_whitespace().next())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Shared shape of the substring checks: no policy fails, otherwise `holds`
/// decides. The message carries the truncated policy.
fn policy_check(
    spec: &CheckSpec,
    bundle: &ResponseBundle,
    ctx: &CheckContext,
    holds: impl Fn(&str) -> bool,
) -> CheckOutcome {
    let csp = extract_csp(bundle.get(Slot::Response));
    let passed = csp.as_deref().is_some_and(holds);
    spec.verdict_with(passed, truncate(csp.as_deref()), ctx)
}

fn check_exists(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |_| true)
}

fn check_starts_with_default_src_none(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |csp| csp.starts_with("default-src 'none'"))
}

fn check_default_or_script_directive(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |csp| csp.contains("default-src") || csp.contains("script-src"))
}

fn check_no_unsafe_inline(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |csp| !csp.contains("unsafe-inline"))
}

fn check_no_unsafe_eval(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |csp| !csp.contains("unsafe-eval"))
}

fn check_no_report_sample(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |csp| !csp.contains("report-sample"))
}

fn check_upgrade_insecure_requests(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |csp| csp.contains("upgrade-insecure-requests"))
}

fn check_no_report_uri(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |csp| !csp.contains("report-uri https://"))
}

fn check_no_report_to(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    policy_check(spec, bundle, ctx, |csp| !csp.contains("report-to"))
}

fn check_valid_directives(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let Some(csp) = extract_csp(bundle.get(Slot::Response)) else {
        return spec.verdict_with(false, "no policy", ctx);
    };
    let names = directive_names(&csp);
    let invalid: Vec<&String> = names
        .iter()
        .filter(|n| !VALID_DIRECTIVE_NAMES.contains(&n.as_str()))
        .collect();
    let detail = if invalid.is_empty() {
        format!("[{}]", names.join(", "))
    } else {
        format!(
            "[{}]; invalid: [{}]",
            names.join(", "),
            invalid.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        )
    };
    spec.verdict_with(invalid.is_empty(), detail, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{context, primary};

    const STRICT: &str = "default-src 'none'; script-src 'self'; upgrade-insecure-requests; frame-ancestors 'none'";

    fn with_csp(policy: &str) -> ResponseBundle {
        primary(ProbeResponse::new(200).with_header("content-security-policy", policy))
    }

    #[test]
    fn policy_from_header_or_meta_tag() {
        let header = ProbeResponse::new(200).with_header("Content-Security-Policy", "default-src 'self'");
        assert_eq!(extract_csp(Some(&header)).as_deref(), Some("default-src 'self'"));

        let meta = ProbeResponse::new(200).with_body(
            r#"<html><head><meta http-equiv="content-security-policy" content="default-src 'none'"></head></html>"#,
        );
        assert_eq!(extract_csp(Some(&meta)).as_deref(), Some("default-src 'none'"));

        let empty_meta = ProbeResponse::new(200).with_body(r#"<meta http-equiv="Content-Security-Policy">"#);
        assert_eq!(extract_csp(Some(&empty_meta)).as_deref(), Some(""));

        let nothing = ProbeResponse::new(200).with_body("<html><head></head></html>");
        assert_eq!(extract_csp(Some(&nothing)), None);
        assert_eq!(extract_csp(None), None);
    }

    #[test]
    fn truncation_at_two_hundred_chars() {
        let long = "a".repeat(250);
        let cut = truncate(Some(&long));
        assert_eq!(cut.len(), 203);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate(Some("short")), "short");
        assert_eq!(truncate(None), "");
    }

    #[test]
    fn no_policy_fails_every_check() {
        let ctx = context("example.com");
        let bundle = primary(ProbeResponse::new(200));
        let checks = [
            check_exists,
            check_starts_with_default_src_none,
            check_default_or_script_directive,
            check_no_unsafe_inline,
            check_no_unsafe_eval,
            check_no_report_sample,
            check_upgrade_insecure_requests,
            check_no_report_uri,
            check_valid_directives,
        ];
        for check in checks {
            assert!(!check(&EXISTS, &bundle, &ctx).passed);
        }
        assert!(check_no_report_to(&NO_REPORT_TO, &bundle, &ctx).is_warning());
    }

    #[test]
    fn strict_policy_passes() {
        let ctx = context("example.com");
        let bundle = with_csp(STRICT);
        assert!(check_exists(&EXISTS, &bundle, &ctx).passed);
        assert!(check_starts_with_default_src_none(&STARTS_WITH_DEFAULT_SRC_NONE, &bundle, &ctx).passed);
        assert!(check_default_or_script_directive(&DEFAULT_OR_SCRIPT_DIRECTIVE, &bundle, &ctx).passed);
        assert!(check_no_unsafe_inline(&NO_UNSAFE_INLINE, &bundle, &ctx).passed);
        assert!(check_no_unsafe_eval(&NO_UNSAFE_EVAL, &bundle, &ctx).passed);
        assert!(check_no_report_sample(&NO_REPORT_SAMPLE, &bundle, &ctx).passed);
        assert!(check_upgrade_insecure_requests(&UPGRADE_INSECURE_REQUESTS, &bundle, &ctx).passed);
        assert!(check_no_report_uri(&NO_REPORT_URI, &bundle, &ctx).passed);
        assert!(check_no_report_to(&NO_REPORT_TO, &bundle, &ctx).passed);
        assert!(check_valid_directives(&VALID_DIRECTIVES, &bundle, &ctx).passed);
    }

    #[test]
    fn unsafe_sources_and_reporting() {
        let ctx = context("example.com");
        let bundle = with_csp(
            "script-src 'self' 'unsafe-inline' 'unsafe-eval' 'report-sample'; report-uri https://r.example/csp; report-to csp",
        );
        let inline = check_no_unsafe_inline(&NO_UNSAFE_INLINE, &bundle, &ctx);
        let eval = check_no_unsafe_eval(&NO_UNSAFE_EVAL, &bundle, &ctx);
        assert!(!inline.passed && !eval.passed);
        assert_eq!(inline.check, eval.check);
        assert_ne!(inline.name, eval.name);
        assert!(!check_no_report_sample(&NO_REPORT_SAMPLE, &bundle, &ctx).passed);
        assert!(!check_no_report_uri(&NO_REPORT_URI, &bundle, &ctx).passed);
        assert!(check_no_report_to(&NO_REPORT_TO, &bundle, &ctx).is_warning());
        assert!(!check_starts_with_default_src_none(&STARTS_WITH_DEFAULT_SRC_NONE, &bundle, &ctx).passed);

        let relative_report_uri = with_csp("default-src 'none'; report-uri /csp");
        assert!(check_no_report_uri(&NO_REPORT_URI, &relative_report_uri, &ctx).passed);
    }

    #[test]
    fn invalid_directive_is_reported() {
        let ctx = context("example.com");
        let bundle = with_csp("default-src 'none'; upgrade-insecure-requests; invalid-directive;");
        let outcome = check_valid_directives(&VALID_DIRECTIVES, &bundle, &ctx);
        assert!(!outcome.passed);
        assert!(outcome.message.contains("invalid: [invalid-directive]"));
    }

    #[test]
    fn directive_names_skip_empty_segments_and_fold_case() {
        assert_eq!(
            directive_names(" Default-Src 'none' ;; img-src https: ; "),
            vec!["default-src".to_string(), "img-src".to_string()]
        );
        let ctx = context("example.com");
        assert!(check_valid_directives(&VALID_DIRECTIVES, &with_csp("default-src 'none';"), &ctx).passed);
    }
}
