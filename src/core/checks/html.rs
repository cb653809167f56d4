// src/core/checks/html.rs

//! Header and markup checks that only make sense for HTML documents, plus the
//! Referrer-Policy check which runs for every response.
//!
//! Markup is parsed with `scraper` inside synchronous helpers. `Html` is not
//! `Send`, so the probing feed check collects its URLs before any `.await`.

use super::{list, observed, primary_body, primary_header};
use crate::core::checks::csp::{extract_csp, truncate};
use crate::core::models::{CheckOutcome, ProbeResponse, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use crate::core::scanner::http_probe::FetchOptions;
use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use url::Url;

/// Longest Cache-Control max-age accepted for an HTML document.
pub const MAX_CACHE_SECONDS: u64 = 86_400;

/// Entities that cannot be replaced by the literal character.
const NECESSARY_ENTITIES: &[&str] = &["nbsp", "amp", "quot", "lt", "gt"];

/// Public CDN hosts whose use leaks visitors to a third party.
pub const CDN_HOSTS: &[&str] = &[
    "ajax.aspnetcdn.com",
    "ajax.googleapis.com",
    "cdn.jsdelivr.net",
    "cdnjs.cloudflare.com",
    "code.jquery.com",
    "maxcdn.bootstrapcdn.com",
    "stackpath.bootstrapcdn.com",
    "unpkg.com",
    "use.fontawesome.com",
];

const FEED_TYPES: &[&str] = &["application/rss+xml", "application/feed+json"];

static RE_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").unwrap());
static RE_CACHE_MAX_AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)max-age=(\d+)").unwrap());

pub static REFERRER_POLICY: CheckSpec = CheckSpec {
    name: "check_referrer_policy_should_be_set",
    id: "html_referrer_policy",
    description: "Referrer-Policy should be set",
    topic: CheckTopic::Html,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_referrer_policy),
};

pub static PERMISSIONS_POLICY: CheckSpec = CheckSpec {
    name: "check_permissions_policy_should_exist",
    id: "html_permissions_policy",
    description: "Permissions-Policy should exist if the response is HTML",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_permissions_policy),
};

pub static FRAME_ANCESTORS: CheckSpec = CheckSpec {
    name: "check_frame_ancestors_should_exist",
    id: "html_frame_ancestors",
    description: "frame-ancestors should be in CSP or X-Frame-Options should exist if the response is HTML",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_frame_ancestors),
};

pub static NOSNIFF: CheckSpec = CheckSpec {
    name: "check_x_content_type_options_should_be_nosniff",
    id: "html_x_content_type_options_nosniff",
    description: "X-Content-Type-Options should be \"nosniff\"",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_nosniff),
};

pub static NO_X_XSS_PROTECTION: CheckSpec = CheckSpec {
    name: "check_x_xss_protection_should_not_exist",
    id: "html_x_xss_protection",
    description: "X-XSS-Protection header should not exist",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_no_x_xss_protection),
};

pub static DOCTYPE: CheckSpec = CheckSpec {
    name: "check_html_starts_with_doctype",
    id: "html_doctype",
    description: "HTML should start with \"<!doctype html>\"",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_doctype),
};

pub static LANG: CheckSpec = CheckSpec {
    name: "check_html_tag_includes_lang",
    id: "html_tag_includes_lang",
    description: "<html> tag should include lang",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_lang),
};

pub static META_CHARSET: CheckSpec = CheckSpec {
    name: "check_html_meta_charset",
    id: "html_meta_charset",
    description: "HTML should include meta charset tag",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_meta_charset),
};

pub static TITLE: CheckSpec = CheckSpec {
    name: "check_html_includes_title",
    id: "html_includes_title",
    description: "HTML should include title",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_title),
};

pub static REL_ICON: CheckSpec = CheckSpec {
    name: "check_html_includes_rel_icon",
    id: "html_rel_icon",
    description: "HTML should include link with rel=\"icon\"",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_rel_icon),
};

pub static NO_SCHEMELESS_URLS: CheckSpec = CheckSpec {
    name: "check_html_should_not_use_schemeless_urls",
    id: "html_schemeless",
    description: "HTML should not use schemeless urls for links or hrefs",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_no_schemeless_urls),
};

pub static SRI: CheckSpec = CheckSpec {
    name: "check_html_script_tags_use_sri",
    id: "html_sri_js",
    description: "All script tags should use subresource integrity",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_sri),
};

pub static UNNECESSARY_ENTITIES: CheckSpec = CheckSpec {
    name: "check_html_should_not_use_unnecessary_entities",
    id: "html_unnecessary_entities",
    description: "HTML should not use unnecessary HTML entities",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: true,
    evaluator: Evaluator::Static(check_unnecessary_entities),
};

pub static CACHE_DURATION: CheckSpec = CheckSpec {
    name: "check_html_should_not_be_cached_for_more_than_24_hours",
    id: "html_cache_duration",
    description: "HTML should not be cached for more than 24 hours",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_cache_duration),
};

pub static DNS_PREFETCH_OFF: CheckSpec = CheckSpec {
    name: "check_x_dns_prefetch_control_is_off",
    id: "html_x_dns_prefetch",
    description: "X-DNS-Prefetch-Control should be set to off",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_dns_prefetch_off),
};

pub static NO_CDNS: CheckSpec = CheckSpec {
    name: "check_cdns_should_not_be_used",
    id: "html_cdns",
    description: "Public CDNs should not be used for scripts or stylesheets",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_no_cdns),
};

pub static FEED_CORS: CheckSpec = CheckSpec {
    name: "check_rss_should_return_cors_header",
    id: "html_rss_cors",
    description: "RSS and JSON feeds should return Access-Control-Allow-Origin header",
    topic: CheckTopic::Html,
    selection: Selection::Html,
    warn_on_fail: false,
    evaluator: Evaluator::Probing(check_feed_cors),
};

fn check_referrer_policy(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let policy = primary_header(bundle, "referrer-policy");
    spec.verdict_with(policy.is_some(), observed(policy), ctx)
}

fn check_permissions_policy(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let policy = primary_header(bundle, "permissions-policy");
    spec.verdict_with(policy.is_some(), observed(policy), ctx)
}

fn check_frame_ancestors(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let frame_options = primary_header(bundle, "x-frame-options");
    let csp = extract_csp(bundle.get(Slot::Response));
    let passed = frame_options.is_some() || csp.as_deref().is_some_and(|c| c.contains("frame-ancestors"));
    spec.verdict_with(
        passed,
        format!("X-Frame-Options: {}, CSP: {}", observed(frame_options), truncate(csp.as_deref())),
        ctx,
    )
}

fn check_nosniff(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let value = primary_header(bundle, "x-content-type-options");
    spec.verdict_with(value == Some("nosniff"), observed(value), ctx)
}

fn check_no_x_xss_protection(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let value = primary_header(bundle, "x-xss-protection");
    spec.verdict_with(value.is_none(), observed(value), ctx)
}

fn check_doctype(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let body = primary_body(bundle);
    spec.verdict(body.trim().to_lowercase().starts_with("<!doctype html>"), ctx)
}

/// The opening `<html ...>` tag as written, with single quotes normalized.
fn html_tag(body: &str) -> Option<String> {
    let (_, rest) = body.split_once("<html")?;
    let attributes = rest.split('>').next().unwrap_or_default().replace('\'', "\"");
    Some(format!("<html{attributes}>"))
}

fn check_lang(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let tag = html_tag(&primary_body(bundle));
    let passed = tag.as_deref().is_some_and(|t| t.contains("lang="));
    spec.verdict_with(passed, tag.as_deref().unwrap_or("no tag"), ctx)
}

fn check_meta_charset(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    spec.verdict(primary_body(bundle).to_lowercase().contains("<meta charset="), ctx)
}

fn check_title(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    spec.verdict(primary_body(bundle).to_lowercase().contains("<title>"), ctx)
}

fn has_rel_icon(body: &str) -> bool {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("link[rel]") else {
        return false;
    };
    document.select(&selector).any(|link| {
        link.value()
            .attr("rel")
            .is_some_and(|rel| rel.split_whitespace().any(|token| token.eq_ignore_ascii_case("icon")))
    })
}

fn check_rel_icon(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    spec.verdict(has_rel_icon(&primary_body(bundle)), ctx)
}

fn check_no_schemeless_urls(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let body = primary_body(bundle);
    spec.verdict(!body.contains("=\"//") && !body.contains("='//"), ctx)
}

/// `src` of every external script lacking an `integrity` attribute.
fn scripts_without_integrity(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("script[src]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter(|script| script.value().attr("integrity").is_none())
        .filter_map(|script| script.value().attr("src").map(str::to_string))
        .collect()
}

fn check_sri(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let missing = scripts_without_integrity(&primary_body(bundle));
    if missing.is_empty() {
        spec.verdict(true, ctx)
    } else {
        spec.verdict_with(false, format!("missing on {}", list(&missing)), ctx)
    }
}

/// Distinct named entities in `body` outside the necessary set, sorted.
pub fn unnecessary_entities(body: &str) -> Vec<String> {
    let found: BTreeSet<&str> = RE_ENTITY
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|name| !NECESSARY_ENTITIES.contains(name))
        .collect();
    found.into_iter().map(str::to_string).collect()
}

fn check_unnecessary_entities(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let entities = unnecessary_entities(&primary_body(bundle));
    spec.verdict_with(entities.is_empty(), list(&entities), ctx)
}

fn check_cache_duration(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let cache_control = primary_header(bundle, "cache-control");
    let max_age = cache_control
        .and_then(|value| RE_CACHE_MAX_AGE.captures(value))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());
    spec.verdict_with(
        max_age.is_some_and(|age| age <= MAX_CACHE_SECONDS),
        observed(cache_control),
        ctx,
    )
}

fn check_dns_prefetch_off(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let value = primary_header(bundle, "x-dns-prefetch-control");
    spec.verdict_with(value == Some("off"), observed(value), ctx)
}

/// Script and stylesheet URLs served from a known public CDN.
fn cdn_references(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let mut found = Vec::new();
    for (query, attribute) in [("script[src]", "src"), ("link[href]", "href")] {
        if let Ok(selector) = Selector::parse(query) {
            found.extend(
                document
                    .select(&selector)
                    .filter_map(|el| el.value().attr(attribute))
                    .filter(|url| CDN_HOSTS.iter().any(|host| url.contains(*host)))
                    .map(str::to_string),
            );
        }
    }
    found
}

fn check_no_cdns(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let cdns = cdn_references(&primary_body(bundle));
    spec.verdict_with(cdns.is_empty(), list(&cdns), ctx)
}

/// Absolute URLs of the RSS and JSON feeds a page advertises.
///
/// Relative and protocol-relative hrefs resolve against the page URL, or
/// against `https://<fallback_host>/` when the page URL is unusable.
pub fn feed_urls(response: &ProbeResponse, fallback_host: &str) -> Vec<String> {
    let base = Url::parse(&response.url).or_else(|_| Url::parse(&format!("https://{fallback_host}/")));
    let Ok(base) = base else {
        warn!(url = %response.url, "No base URL to resolve feed links against.");
        return Vec::new();
    };

    let document = Html::parse_document(&response.text());
    let Ok(selector) = Selector::parse("link[rel][type][href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter(|link| {
            let el = link.value();
            let alternate = el
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|t| t.eq_ignore_ascii_case("alternate")));
            let feed = el
                .attr("type")
                .is_some_and(|t| FEED_TYPES.iter().any(|f| t.trim().eq_ignore_ascii_case(f)));
            alternate && feed
        })
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|url| url.to_string())
        .collect()
}

fn check_feed_cors<'a>(
    spec: &'a CheckSpec,
    bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move {
        let feeds = bundle
            .get(Slot::Response)
            .map(|r| feed_urls(r, &ctx.domain_with_no_path))
            .unwrap_or_default();

        let options = FetchOptions::default()
            .with_headers(&ctx.config.browser_headers)
            .with_timeout(ctx.config.fetch_timeout);
        let mut missing = Vec::new();
        for feed in &feeds {
            match ctx.transport.fetch(feed, &options).await {
                Ok(response) if response.has_header("access-control-allow-origin") => {
                    debug!(feed = %feed, "Feed answers with CORS header.");
                }
                Ok(_) => missing.push(feed.clone()),
                Err(e) => {
                    warn!(feed = %feed, error = %e, "Feed fetch failed.");
                    missing.push(feed.clone());
                }
            }
        }

        Some(spec.verdict_with(
            missing.is_empty(),
            format!("feeds: {}, missing header: {}", list(&feeds), list(&missing)),
            ctx,
        ))
    }
    .boxed()
}
