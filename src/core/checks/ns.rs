// src/core/checks/ns.rs

use super::list;
use crate::core::models::{CheckOutcome, RecordType, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};

pub static MINIMUM_COUNT: CheckSpec = CheckSpec {
    name: "check_at_least_two_nameservers_configured",
    id: "ns_minimum_count",
    description: "At least two nameservers should be provided",
    topic: CheckTopic::Nameservers,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_nameserver_count),
};

/// Subdomains usually carry no NS records of their own, so the apex answer
/// stands in when the host has none.
fn check_nameserver_count(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let (nameservers, _) = bundle.records_with_fallback(Slot::DnsNs, RecordType::Ns);
    spec.verdict_with(nameservers.len() > 1, list(&nameservers), ctx)
}
