// src/core/checks/report_to.rs

use super::{observed, primary_header};
use crate::core::models::{CheckOutcome, ResponseBundle};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};

pub static HEADER_NOT_INCLUDED: CheckSpec = CheckSpec {
    name: "check_report_to_header_must_not_be_included_in_response",
    id: "report_to",
    description: "Report-To Header must not be included in response",
    topic: CheckTopic::ReportTo,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_report_to_absent),
};

/// An empty header value counts as absent.
fn check_report_to_absent(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let value = primary_header(bundle, "report-to");
    spec.verdict_with(value.is_none_or(str::is_empty), observed(value), ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProbeResponse;
    use crate::test_helpers::{context, primary};

    #[test]
    fn report_to_must_be_absent() {
        let ctx = context("example.com");
        assert!(check_report_to_absent(&HEADER_NOT_INCLUDED, &primary(ProbeResponse::new(200)), &ctx).passed);

        let empty = primary(ProbeResponse::new(200).with_header("report-to", ""));
        assert!(check_report_to_absent(&HEADER_NOT_INCLUDED, &empty, &ctx).passed);

        let set = primary(ProbeResponse::new(200).with_header("report-to", r#"{"group":"csp","max_age":10886400}"#));
        assert!(!check_report_to_absent(&HEADER_NOT_INCLUDED, &set, &ctx).passed);
    }
}
