// src/core/checks/redirect.rs

use crate::core::models::{CheckOutcome, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};

pub static HTTP_TO_HTTPS: CheckSpec = CheckSpec {
    name: "check_http_to_https_redirect",
    id: "redirect_http",
    description: "HTTP -> HTTPS redirection",
    topic: CheckTopic::Redirect,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_http_to_https_redirect),
};

/// Fails when the plain-HTTP fetch does not land on https. Without any HTTP
/// response there is nothing to judge, so that case is only a warning.
fn check_http_to_https_redirect(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    match bundle.get(Slot::HttpResponse) {
        Some(response) => spec.verdict_with(response.url.starts_with("https://"), &response.url, ctx),
        None => {
            let mut outcome = spec.verdict_with(false, "no HTTP response", ctx);
            outcome.warn_on_fail = true;
            outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProbeResponse;
    use crate::test_helpers::context;

    #[test]
    fn redirect_to_https_passes() {
        let ctx = context("example.com");
        let bundle = ResponseBundle::new().with(Slot::HttpResponse, ProbeResponse::new(200).with_url("https://example.com/"));
        let outcome = check_http_to_https_redirect(&HTTP_TO_HTTPS, &bundle, &ctx);
        assert!(outcome.passed);
        assert_eq!(outcome.message, "HTTP -> HTTPS redirection (https://example.com/)");
    }

    #[test]
    fn staying_on_http_fails() {
        let ctx = context("example.com");
        let bundle = ResponseBundle::new().with(Slot::HttpResponse, ProbeResponse::new(200).with_url("http://example.com/"));
        assert!(check_http_to_https_redirect(&HTTP_TO_HTTPS, &bundle, &ctx).is_failure());
    }

    #[test]
    fn missing_http_response_only_warns() {
        let ctx = context("example.com");
        let mut bundle = ResponseBundle::new();
        bundle.insert(Slot::HttpResponse, None);
        let outcome = check_http_to_https_redirect(&HTTP_TO_HTTPS, &bundle, &ctx);
        assert!(outcome.is_warning());
        assert!(outcome.message.contains("no HTTP response"));
    }
}
