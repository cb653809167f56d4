// src/core/checks/content.rs

use super::{observed, primary_header};
use crate::core::models::{CheckOutcome, ResponseBundle};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};

pub static INCLUDES_CONTENT_TYPE: CheckSpec = CheckSpec {
    name: "check_http_response_should_include_content_type",
    id: "http_content_type",
    description: "Response should include a Content-Type",
    topic: CheckTopic::Content,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_includes_content_type),
};

pub static GZIPPED: CheckSpec = CheckSpec {
    name: "check_http_response_should_be_gzipped",
    id: "http_gzipped",
    description: "Response should be gzipped",
    topic: CheckTopic::Content,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_gzipped),
};

pub static CHARSET: CheckSpec = CheckSpec {
    name: "check_http_content_type_header_contains_charset",
    id: "http_charset",
    description: "Content-Type header should contain charset",
    topic: CheckTopic::Content,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_charset),
};

pub static EXPIRES_WITHOUT_CACHE_CONTROL: CheckSpec = CheckSpec {
    name: "check_http_expires_header_not_used_without_cache_control",
    id: "http_expires",
    description: "Expires header should not be used without Cache-Control",
    topic: CheckTopic::Content,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_expires_without_cache_control),
};

pub static CACHE_CONTROL_INCLUDED: CheckSpec = CheckSpec {
    name: "check_http_cache_control_is_included",
    id: "http_expires",
    description: "Cache-Control header should be included in the response",
    topic: CheckTopic::Content,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_cache_control_included),
};

pub static NO_P3P: CheckSpec = CheckSpec {
    name: "check_http_p3p_header_is_not_set",
    id: "http_p3p",
    description: "P3P header is deprecated and should not be returned",
    topic: CheckTopic::Content,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_no_p3p),
};

fn check_includes_content_type(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let content_type = primary_header(bundle, "content-type");
    spec.verdict_with(content_type.is_some(), observed(content_type), ctx)
}

fn check_gzipped(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let encoding = primary_header(bundle, "content-encoding").unwrap_or_default();
    spec.verdict_with(encoding.contains("gzip"), encoding, ctx)
}

fn check_charset(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let content_type = primary_header(bundle, "content-type").unwrap_or_default();
    spec.verdict_with(content_type.contains("charset="), content_type, ctx)
}

fn check_expires_without_cache_control(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let expires = primary_header(bundle, "expires");
    let cache_control = primary_header(bundle, "cache-control");
    spec.verdict_with(
        expires.is_none() || cache_control.is_some(),
        format!("Expires: {}, Cache-Control: {}", observed(expires), observed(cache_control)),
        ctx,
    )
}

fn check_cache_control_included(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let cache_control = primary_header(bundle, "cache-control");
    spec.verdict_with(cache_control.is_some(), observed(cache_control), ctx)
}

fn check_no_p3p(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let p3p = primary_header(bundle, "p3p");
    spec.verdict_with(p3p.is_none(), observed(p3p), ctx)
}
