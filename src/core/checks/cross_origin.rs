// src/core/checks/cross_origin.rs

//! Cross-origin isolation headers. All three are advisory.

use super::{observed, primary_header};
use crate::core::models::{CheckOutcome, ResponseBundle};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};

pub static RESOURCE_POLICY: CheckSpec = CheckSpec {
    name: "check_cross_origin_resource_policy_should_be_sameorigin",
    id: "http_corp",
    description: "Cross-Origin-Resource-Policy header should be same-origin",
    topic: CheckTopic::CrossOrigin,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_resource_policy),
};

pub static OPENER_POLICY: CheckSpec = CheckSpec {
    name: "check_cross_origin_opener_policy_should_be_sameorigin",
    id: "http_coop",
    description: "Cross-Origin-Opener-Policy header should be same-origin",
    topic: CheckTopic::CrossOrigin,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_opener_policy),
};

pub static EMBEDDER_POLICY: CheckSpec = CheckSpec {
    name: "check_cross_origin_embedder_policy_should_be_require_corp",
    id: "http_coep",
    description: "Cross-Origin-Embedder-Policy header should be require-corp",
    topic: CheckTopic::CrossOrigin,
    selection: Selection::Always,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_embedder_policy),
};

fn header_equals(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext, header: &str, expected: &str) -> CheckOutcome {
    let value = primary_header(bundle, header);
    spec.verdict_with(value == Some(expected), observed(value), ctx)
}

fn check_resource_policy(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    header_equals(spec, bundle, ctx, "cross-origin-resource-policy", "same-origin")
}

fn check_opener_policy(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    header_equals(spec, bundle, ctx, "cross-origin-opener-policy", "same-origin")
}

fn check_embedder_policy(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    header_equals(spec, bundle, ctx, "cross-origin-embedder-policy", "require-corp")
}
