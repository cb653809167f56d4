// src/core/checks/status.rs

use crate::core::models::{CheckOutcome, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};

pub static RESPONSE_IS_200: CheckSpec = CheckSpec {
    name: "check_http_response_should_be_200",
    id: "https_status",
    description: "Response should be a 200",
    topic: CheckTopic::Status,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_http_response_should_be_200),
};

fn check_http_response_should_be_200(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    match bundle.get(Slot::Response) {
        Some(r) => spec.verdict_with(r.status == 200, format!("{} - {}", r.status, r.url), ctx),
        None => spec.verdict_with(false, "no response", ctx),
    }
}
