// src/core/checks/dns.rs

use super::list;
use crate::core::models::{CheckOutcome, RecordType, ResponseBundle, Slot};
use crate::core::registry::{CheckContext, CheckSpec, CheckTopic, Evaluator, Selection};

pub static AAAA_RECORD_EXISTS: CheckSpec = CheckSpec {
    name: "check_aaaa_record_exists",
    id: "dns_aaaa",
    description: "An AAAA DNS record exists",
    topic: CheckTopic::Dns,
    selection: Selection::Always,
    warn_on_fail: false,
    evaluator: Evaluator::Static(check_aaaa_record_exists),
};

fn check_aaaa_record_exists(spec: &CheckSpec, bundle: &ResponseBundle, ctx: &CheckContext) -> CheckOutcome {
    let records = bundle.records(Slot::DnsAaaa, RecordType::Aaaa);
    spec.verdict_with(!records.is_empty(), list(&records), ctx)
}
