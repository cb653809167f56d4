// src/core/engine.rs

//! Check selection, execution and scoring.

use crate::core::models::{CheckOutcome, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, Selection, CHECKS};
use tracing::{debug, info};

/// Points deducted per scoring failure.
pub const FAILURE_PENALTY: i32 = 3;

/// Whether the primary response declares an HTML content type.
pub fn is_html(bundle: &ResponseBundle) -> bool {
    bundle
        .header(Slot::Response, "content-type")
        .is_some_and(|ct| ct.contains("html"))
}

/// Every check eligible for this bundle, in registration order.
pub fn select_checks(bundle: &ResponseBundle, fuzz: bool) -> Vec<&'static CheckSpec> {
    let html = is_html(bundle);
    let selected: Vec<&'static CheckSpec> = CHECKS
        .iter()
        .copied()
        .filter(|check| match check.selection {
            Selection::Always => true,
            Selection::Html => html,
            Selection::Fuzz => fuzz,
        })
        .collect();
    debug!(html, fuzz, selected = selected.len(), "Checks selected.");
    selected
}

/// Runs `checks` one after another.
///
/// Checks not matching `filter` (by name or identifier) are skipped. A check
/// that declines produces no outcome. `on_outcome` sees every outcome as soon
/// as it is produced.
pub async fn execute(
    checks: &[&'static CheckSpec],
    bundle: &ResponseBundle,
    ctx: &CheckContext,
    filter: Option<&str>,
    mut on_outcome: impl FnMut(&CheckOutcome),
) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::with_capacity(checks.len());
    for check in checks {
        if filter.is_some_and(|f| !check.matches_filter(f)) {
            continue;
        }
        match check.evaluate(bundle, ctx).await {
            Some(outcome) => {
                debug!(check = check.name, passed = outcome.passed, "Check evaluated.");
                on_outcome(&outcome);
                outcomes.push(outcome);
            }
            None => debug!(check = check.name, "Check declined."),
        }
    }
    info!(
        domain = %ctx.domain,
        total = outcomes.len(),
        failures = outcomes.iter().filter(|o| o.is_failure()).count(),
        warnings = outcomes.iter().filter(|o| o.is_warning()).count(),
        "Checks executed."
    );
    outcomes
}

/// `100 - 3 x scoring failures`. Warnings are free; there is no floor.
pub fn score(outcomes: &[CheckOutcome]) -> i32 {
    let failures = outcomes.iter().filter(|o| o.is_failure()).count() as i32;
    100 - FAILURE_PENALTY * failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProbeResponse;
    use crate::test_helpers::{context, primary};

    fn outcome(passed: bool, warn_on_fail: bool) -> CheckOutcome {
        CheckOutcome {
            passed,
            message: String::new(),
            check: "test",
            name: "check_test",
            warn_on_fail,
            domain: "example.com".into(),
        }
    }

    #[test]
    fn score_ignores_warnings() {
        assert_eq!(score(&[]), 100);
        let outcomes = vec![outcome(true, false), outcome(false, true), outcome(false, true)];
        assert_eq!(score(&outcomes), 100);
        let outcomes = vec![outcome(false, false), outcome(false, false), outcome(false, true)];
        assert_eq!(score(&outcomes), 94);
    }

    #[test]
    fn score_has_no_floor() {
        let outcomes: Vec<_> = (0..40).map(|_| outcome(false, false)).collect();
        assert_eq!(score(&outcomes), -20);
    }

    #[test]
    fn html_checks_need_html_content_type() {
        let html = primary(ProbeResponse::new(200).with_header("content-type", "text/html; charset=utf-8"));
        let json = primary(ProbeResponse::new(200).with_header("content-type", "application/json"));
        let none = ResponseBundle::new();

        assert!(is_html(&html));
        assert!(!is_html(&json));
        assert!(!is_html(&none));

        let with_html = select_checks(&html, false);
        let without_html = select_checks(&json, false);
        assert!(with_html.iter().any(|c| c.id == "html_doctype"));
        assert!(!without_html.iter().any(|c| c.selection == Selection::Html));
        assert!(without_html.iter().any(|c| c.id == "html_referrer_policy"));
        assert!(!with_html.iter().any(|c| c.selection == Selection::Fuzz));
    }

    #[test]
    fn fuzz_flag_adds_fuzz_checks() {
        let json = primary(ProbeResponse::new(200).with_header("content-type", "application/json"));
        let fuzzed = select_checks(&json, true);
        assert_eq!(fuzzed.last().map(|c| c.id), Some("api_docs_swagger"));
        assert_eq!(fuzzed.len(), select_checks(&json, false).len() + 1);
    }

    #[tokio::test]
    async fn execution_keeps_order_and_applies_filter() {
        let ctx = context("example.com");
        let bundle = primary(ProbeResponse::new(200).with_header("content-type", "text/plain"));
        let checks = select_checks(&bundle, false);

        let mut seen = Vec::new();
        let outcomes = execute(&checks, &bundle, &ctx, Some("include_content_type"), |o| seen.push(o.name)).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].check, "http_content_type");
        assert_eq!(seen, vec!["check_http_response_should_include_content_type"]);

        let csp = execute(&checks, &bundle, &ctx, Some("csp"), |_| {}).await;
        let names: Vec<_> = csp.iter().map(|o| o.name).collect();
        let expected: Vec<_> = checks.iter().filter(|c| c.matches_filter("csp")).map(|c| c.name).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn declined_checks_are_omitted() {
        let ctx = context("example.com");
        let mut bundle = ResponseBundle::new();
        bundle.insert(Slot::Response, None);
        let checks = vec![&crate::core::checks::swagger::NOT_EXPOSED];
        assert!(execute(&checks, &bundle, &ctx, None, |_| {}).await.is_empty());
    }
}
