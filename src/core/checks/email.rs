// src/core/checks/email.rs

//! SPF and DMARC checks.

use super::list;
use crate::core::models::{CheckOutcome, RecordType, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};
use crate::core::scanner::dns_scanner::lookup_txt;
use crate::core::scanner::http_probe::Transport;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use tracing::{debug, info};

/// RFC 7208 caps an SPF evaluation at ten DNS-querying terms.
pub const SPF_LOOKUP_LIMIT: usize = 10;
/// How deep include/redirect chains are followed.
pub const SPF_MAX_DEPTH: usize = 13;

pub static SPF_DASH_ALL: CheckSpec = CheckSpec {
    name: "check_spf_dash_all",
    id: "email_spf_dash_all",
    description: "Domains that do not send email should have an SPF record of \"v=spf1 -all\"",
    topic: CheckTopic::Email,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_spf_dash_all),
};

pub static SPF_EXISTS: CheckSpec = CheckSpec {
    name: "check_spf_record_should_exist",
    id: "email_spf",
    description: "SPF TXT record should exist",
    topic: CheckTopic::Email,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_spf_exists),
};

pub static SPF_DNS_RECORD_ABSENT: CheckSpec = CheckSpec {
    name: "check_spf_dns_record_does_not_exist",
    id: "email_spf_dns",
    description: "SPF DNS record is deprecated and should not exist",
    topic: CheckTopic::Email,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_spf_dns_record_absent),
};

pub static SPF_DISALLOW_ALL: CheckSpec = CheckSpec {
    name: "check_spf_txt_record_should_disallow_all",
    id: "email_spf_disallow_all",
    description: "SPF TXT record should contain \"-all\"",
    topic: CheckTopic::Email,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_spf_disallow_all),
};

pub static DMARC_EXISTS: CheckSpec = CheckSpec {
    name: "check_dmarc_record_should_exist",
    id: "email_dmarc_exists",
    description: "DMARC record should exist",
    topic: CheckTopic::Email,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_dmarc_exists),
};

pub static DMARC_REJECTS: CheckSpec = CheckSpec {
    name: "check_dmarc_record_should_reject_failures",
    id: "email_dmarc_none",
    description: "DMARC record should reject failures",
    topic: CheckTopic::Email,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_dmarc_rejects),
};

pub static SPF_LOOKUPS: CheckSpec = CheckSpec {
    name: "check_spf_uses_less_than_10_requests",
    id: "email_spf_lookups",
    description: "SPF should not require more than 10 DNS lookups",
    topic: CheckTopic::Email,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Probing(check_spf_lookups),
};

fn is_spf(record: &str) -> bool {
    record.starts_with("v=spf")
}

/// SPF TXT records of the host, or of the apex when the host publishes none.
fn spf_records(bundle: &ResponseBundle) -> Vec<String> {
    bundle
        .filtered_records_with_fallback(Slot::DnsTxt, RecordType::Txt, is_spf)
        .0
}

fn dmarc_records(bundle: &ResponseBundle) -> Vec<String> {
    bundle.records_with_fallback(Slot::DnsDmarc, RecordType::Txt).0
}

/// A null MX ("0 .") announces that the domain accepts no mail.
fn accepts_mail(mx_records: &[String]) -> bool {
    mx_records.iter().any(|mx| {
        let mut parts = mx.split_whitespace();
        !matches!((parts.next(), parts.next(), parts.next()), (Some("0"), Some("."), None))
    })
}

fn check_spf_dash_all(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let mx = bundle.records(Slot::DnsMx, RecordType::Mx);
    if accepts_mail(&mx) {
        return spec.verdict_with(true, format!("MX: {}", list(&mx)), ctx);
    }
    let spf = spf_records(bundle);
    let passed = !spf.is_empty() && spf.iter().all(|r| r.trim().eq_ignore_ascii_case("v=spf1 -all"));
    spec.verdict_with(passed, format!("MX: {}, SPF: {}", list(&mx), list(&spf)), ctx)
}

fn check_spf_exists(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let records = spf_records(bundle);
    spec.verdict_with(!records.is_empty(), list(&records), ctx)
}

fn check_spf_dns_record_absent(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let records = bundle.records(Slot::DnsSpf, RecordType::Spf);
    spec.verdict_with(records.is_empty(), list(&records), ctx)
}

fn check_spf_disallow_all(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let records = spf_records(bundle);
    let passed = !records.is_empty() && records.iter().all(|r| r.contains("-all"));
    spec.verdict_with(passed, list(&records), ctx)
}

fn check_dmarc_exists(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let records = dmarc_records(bundle);
    let passed = !records.is_empty() && records.iter().all(|r| r.starts_with("v=DMARC1"));
    spec.verdict_with(passed, list(&records), ctx)
}

fn check_dmarc_rejects(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let records = dmarc_records(bundle);
    let passed = records
        .iter()
        .any(|r| r.split(';').any(|tag| tag.trim().eq_ignore_ascii_case("p=reject")));
    spec.verdict_with(passed, list(&records), ctx)
}

/// Domains named by `include:` and `redirect=` terms of one SPF record.
pub fn spf_targets(record: &str) -> Vec<String> {
    record
        .split_whitespace()
        .skip(1)
        .filter_map(|term| {
            let term = term.trim_start_matches(['+', '-', '~', '?']);
            let lower = term.to_ascii_lowercase();
            let target = if lower.starts_with("include:") {
                &term["include:".len()..]
            } else if lower.starts_with("redirect=") {
                &term["redirect=".len()..]
            } else {
                return None;
            };
            let target = target.trim_end_matches('.').to_ascii_lowercase();
            (!target.is_empty()).then_some(target)
        })
        .collect()
}

/// Every (domain, record) pair reached by following include/redirect terms
/// from `root_records`, depth first.
///
/// A domain is looked up at most once, and nothing deeper than
/// `SPF_MAX_DEPTH` is followed, so the walk always terminates.
pub async fn walk_spf_chain(
    transport: &dyn Transport,
    endpoint: &str,
    root: &str,
    root_records: &[String],
) -> Vec<(String, String)> {
    let mut visited: HashSet<String> = HashSet::from([root.to_ascii_lowercase()]);
    let mut pending: Vec<(String, usize)> = root_records
        .iter()
        .flat_map(|r| spf_targets(r))
        .rev()
        .map(|target| (target, 1))
        .collect();
    let mut chain = Vec::new();

    while let Some((domain, depth)) = pending.pop() {
        if depth > SPF_MAX_DEPTH {
            debug!(domain = %domain, depth, "SPF chain too deep, not following.");
            continue;
        }
        if !visited.insert(domain.clone()) {
            continue;
        }
        let records: Vec<String> = lookup_txt(transport, endpoint, &domain)
            .await
            .into_iter()
            .filter(|r| is_spf(r))
            .collect();
        for record in records {
            for target in spf_targets(&record).into_iter().rev() {
                pending.push((target, depth + 1));
            }
            chain.push((domain.clone(), record));
        }
    }

    info!(root, lookups = chain.len(), "SPF chain walked.");
    chain
}

fn check_spf_lookups<'a>(
    spec: &'a CheckSpec,
    bundle: &'a ResponseBundle,
    ctx: &'a CheckContext,
) -> BoxFuture<'a, Option<CheckOutcome>> {
    async move {
        let records = spf_records(bundle);
        let chain = walk_spf_chain(
            ctx.transport.as_ref(),
            &ctx.config.doh_endpoint,
            &ctx.domain_with_no_path,
            &records,
        )
        .await;
        let domains: Vec<String> = chain.iter().map(|(domain, _)| domain.clone()).collect();
        Some(spec.verdict_with(
            chain.len() <= SPF_LOOKUP_LIMIT,
            format!("{} lookups: {}", chain.len(), list(&domains)),
            ctx,
        ))
    }
    .boxed()
}
