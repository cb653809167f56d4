// src/core/checks/swagger.rs

use crate::core::models::{CheckOutcome, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use crate::core::scanner::http_probe::FetchOptions;
use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, info};
use url::Url;

/// Paths where Swagger UI and OpenAPI documents are commonly served.
pub const SWAGGER_PATHS: &[&str] = &[
    "core/latest/swagger-ui/index.html",
    "csp/gateway/slc/api/swagger-ui.html",
    "swagger",
    "swagger-resources",
    "swagger-ui",
    "swagger-ui.html",
    "swagger.json",
    "swagger.yaml",
    "swagger/index.html",
    "swagger/swagger-ui.htm",
    "swagger/swagger-ui.html",
    "swagger/ui",
    "swagger/v1/swagger.json",
    "swaggerui",
];

pub static NOT_EXPOSED: CheckSpec = CheckSpec {
    name: "check_swagger_should_not_return_200",
    id: "api_docs_swagger",
    description: "Swagger URLs should not return 200",
    topic: CheckTopic::ApiDocs,
    selection: Selection::Fuzz,
    warn_on_fail: false,
    evaluator: Evaluator::Probing(check_not_exposed),
};

/// Requests every known documentation path relative to the page URL.
/// Declines when there is no page URL to resolve against.
fn check_not_exposed<'a>(
    spec: &'a CheckSpec,
    bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move {
        let base = bundle.get(Slot::Response).and_then(|r| Url::parse(&r.url).ok())?;
        let targets: Vec<String> = SWAGGER_PATHS
            .iter()
            .filter_map(|path| base.join(path).ok())
            .map(|url| url.to_string())
            .collect();

        let options = FetchOptions::default()
            .insecure()
            .with_headers(&ctx.config.browser_headers)
            .with_timeout(ctx.config.fetch_timeout);
        let responses = join_all(targets.iter().map(|url| ctx.transport.fetch(url, &options))).await;

        let exposed: Vec<String> = targets
            .iter()
            .zip(responses)
            .filter_map(|(target, result)| match result {
                Ok(response) if response.status < 299 => Some(format!("{target} {}", response.status)),
                Ok(_) => None,
                Err(e) => {
                    debug!(url = %target, error = %e, "Documentation probe failed.");
                    None
                }
            })
            .collect();

        info!(probed = targets.len(), exposed = exposed.len(), "API documentation paths probed.");
        Some(spec.verdict_with(exposed.is_empty(), super::list(&exposed), ctx))
    }
    .boxed()
}
