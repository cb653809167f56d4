// src/core/models.rs

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use strum::{AsRefStr, Display, EnumIter};

// --- Probe Responses ---

/// Outcome of one outbound request, captured once and never modified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeResponse {
    /// URL the request was issued for.
    pub request_url: String,
    /// Final URL after any redirects.
    pub url: String,
    pub status: u16,
    /// Lowercased header names; repeated headers keep every value in arrival order.
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
    /// Parsed body, present only when the content-type is a JSON media type.
    pub json: Option<serde_json::Value>,
}

impl ProbeResponse {
    pub fn new(status: u16) -> Self {
        Self { status, ..Default::default() }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        if self.request_url.is_empty() {
            self.request_url = url.to_string();
        }
        self.url = url.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.entry(name.to_ascii_lowercase()).or_default().push(value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(mut self, json: serde_json::Value) -> Self {
        self.json = Some(json);
        self
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    /// Every value received for a header.
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Records of a DNS-over-HTTPS answer, optionally restricted to one RR type.
    ///
    /// Entries without a `type` field are kept whatever the filter.
    pub fn dns_answers(&self, rtype: Option<RecordType>) -> Vec<DnsAnswer> {
        let Some(answers) = self
            .json
            .as_ref()
            .and_then(|j| j.get("Answer"))
            .and_then(|a| a.as_array())
        else {
            return Vec::new();
        };

        answers
            .iter()
            .filter_map(DnsAnswer::from_json)
            .filter(|a| match (rtype, a.rtype) {
                (Some(wanted), Some(found)) => wanted.code() == found,
                _ => true,
            })
            .collect()
    }
}

// --- DNS ---

/// Resource-record types requested over DNS-over-HTTPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Ns,
    Mx,
    Txt,
    Aaaa,
    Spf,
    Caa,
}

impl RecordType {
    pub fn code(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
            RecordType::Spf => 99,
            RecordType::Caa => 257,
        }
    }
}

/// One entry of the `Answer` array of a DoH JSON response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsAnswer {
    pub data: String,
    pub rtype: Option<u16>,
}

impl DnsAnswer {
    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self { data: s.clone(), rtype: None }),
            serde_json::Value::Object(map) => {
                let data = map.get("data")?.as_str()?;
                let rtype = map.get("type").and_then(|t| t.as_u64()).and_then(|t| u16::try_from(t).ok());
                Some(Self { data: unquote_txt(data), rtype })
            }
            _ => None,
        }
    }
}

/// Some resolvers return TXT data as quoted character-strings (`"a" "b"`).
fn unquote_txt(data: &str) -> String {
    let trimmed = data.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\" \"", "").replace("\"\"", "")
    } else {
        trimmed.to_string()
    }
}

// --- Response Bundle ---

/// Named slots of the response bundle.
///
/// The `*Fld` slots hold the same lookups made against the registrable
/// (apex) domain and exist only when the audited host is a strict subdomain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
pub enum Slot {
    #[strum(serialize = "http_response")]
    HttpResponse,
    #[strum(serialize = "response")]
    Response,
    #[strum(serialize = "response_fld")]
    ResponseFld,
    #[strum(serialize = "security_txt_response")]
    SecurityTxt,
    #[strum(serialize = "robots_txt_response")]
    RobotsTxt,
    #[strum(serialize = "favicon_response")]
    Favicon,
    #[strum(serialize = "dns_ns_response")]
    DnsNs,
    #[strum(serialize = "dns_mx_response")]
    DnsMx,
    #[strum(serialize = "dns_txt_response")]
    DnsTxt,
    #[strum(serialize = "dns_spf_response")]
    DnsSpf,
    #[strum(serialize = "dns_caa_response")]
    DnsCaa,
    #[strum(serialize = "dns_a_response")]
    DnsA,
    #[strum(serialize = "dns_aaaa_response")]
    DnsAaaa,
    #[strum(serialize = "dns_dmarc_response")]
    DnsDmarc,
    #[strum(serialize = "dns_ns_response_fld")]
    DnsNsFld,
    #[strum(serialize = "dns_mx_response_fld")]
    DnsMxFld,
    #[strum(serialize = "dns_spf_response_fld")]
    DnsSpfFld,
    #[strum(serialize = "dns_txt_response_fld")]
    DnsTxtFld,
    #[strum(serialize = "dns_dmarc_response_fld")]
    DnsDmarcFld,
    #[strum(serialize = "dns_caa_response_fld")]
    DnsCaaFld,
}

impl Slot {
    /// The apex-domain counterpart of a primary slot, if one exists.
    pub fn fallback(self) -> Option<Slot> {
        match self {
            Slot::Response => Some(Slot::ResponseFld),
            Slot::DnsNs => Some(Slot::DnsNsFld),
            Slot::DnsMx => Some(Slot::DnsMxFld),
            Slot::DnsSpf => Some(Slot::DnsSpfFld),
            Slot::DnsTxt => Some(Slot::DnsTxtFld),
            Slot::DnsDmarc => Some(Slot::DnsDmarcFld),
            Slot::DnsCaa => Some(Slot::DnsCaaFld),
            _ => None,
        }
    }
}

/// Everything fetched for one audit, keyed by slot.
///
/// A slot that was planned but could not be fetched is present with `None`;
/// a slot that was never planned (apex slots for an apex domain) is missing.
#[derive(Debug, Clone, Default)]
pub struct ResponseBundle {
    slots: HashMap<Slot, Option<ProbeResponse>>,
}

impl ResponseBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: Slot, response: Option<ProbeResponse>) {
        self.slots.insert(slot, response);
    }

    /// Builder form of `insert`, mostly for fixtures.
    pub fn with(mut self, slot: Slot, response: ProbeResponse) -> Self {
        self.insert(slot, Some(response));
        self
    }

    pub fn get(&self, slot: Slot) -> Option<&ProbeResponse> {
        self.slots.get(&slot).and_then(Option::as_ref)
    }

    /// Whether the slot was planned at all, regardless of fetch success.
    pub fn has_slot(&self, slot: Slot) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Header of the response held in `slot`; an absent response has no headers.
    pub fn header(&self, slot: Slot, name: &str) -> Option<&str> {
        self.get(slot).and_then(|r| r.header(name))
    }

    /// `data` of every DoH answer in `slot` of the given type.
    pub fn records(&self, slot: Slot, rtype: RecordType) -> Vec<String> {
        self.get(slot)
            .map(|r| r.dns_answers(Some(rtype)).into_iter().map(|a| a.data).collect())
            .unwrap_or_default()
    }

    /// Records from `slot`, or from its apex counterpart when the primary set
    /// is empty and the apex slot was planned. The flag reports the fallback.
    pub fn records_with_fallback(&self, slot: Slot, rtype: RecordType) -> (Vec<String>, bool) {
        self.filtered_records_with_fallback(slot, rtype, |_| true)
    }

    /// Like `records_with_fallback`, applying `keep` before deciding whether
    /// the primary set is empty.
    pub fn filtered_records_with_fallback(
        &self,
        slot: Slot,
        rtype: RecordType,
        keep: impl Fn(&str) -> bool,
    ) -> (Vec<String>, bool) {
        let primary: Vec<String> = self.records(slot, rtype).into_iter().filter(|r| keep(r)).collect();
        if !primary.is_empty() {
            return (primary, false);
        }
        match slot.fallback() {
            Some(fld) if self.has_slot(fld) => {
                let apex: Vec<String> = self.records(fld, rtype).into_iter().filter(|r| keep(r)).collect();
                let used = !apex.is_empty();
                (apex, used)
            }
            _ => (primary, false),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// --- Check Outcomes ---

/// The verdict of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub passed: bool,
    pub message: String,
    /// Short identifier; several checks may share one.
    pub check: &'static str,
    /// Name of the check that produced the outcome; unique across the registry.
    pub name: &'static str,
    pub warn_on_fail: bool,
    pub domain: String,
}

impl CheckOutcome {
    /// A failure that does not count against the score.
    pub fn is_warning(&self) -> bool {
        !self.passed && self.warn_on_fail
    }

    /// A failure that costs points.
    pub fn is_failure(&self) -> bool {
        !self.passed && !self.warn_on_fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_are_case_insensitive() {
        let r = ProbeResponse::new(200).with_header("Content-Type", "text/html");
        assert_eq!(r.header("content-type"), Some("text/html"));
        assert_eq!(r.header("CONTENT-TYPE"), Some("text/html"));
        assert!(r.header("x-missing").is_none());
    }

    #[test]
    fn dns_answers_filter_by_type_and_accept_bare_strings() {
        let r = ProbeResponse::new(200).with_json(json!({
            "Answer": [
                {"name": "example.com.", "type": 5, "data": "alias.example.net."},
                {"name": "example.com.", "type": 28, "data": "2001:db8::1"},
                {"data": ""},
            ]
        }));
        let aaaa = r.dns_answers(Some(RecordType::Aaaa));
        assert_eq!(aaaa.len(), 2);
        assert_eq!(aaaa[0].data, "2001:db8::1");

        let bare = ProbeResponse::new(200).with_json(json!({"Answer": ["ns1.example.com", "ns2.example.com"]}));
        assert_eq!(bare.dns_answers(Some(RecordType::Ns)).len(), 2);
    }

    #[test]
    fn quoted_txt_data_is_unquoted() {
        let r = ProbeResponse::new(200).with_json(json!({
            "Answer": [{"type": 16, "data": "\"v=spf1 include:a.example\" \" -all\""}]
        }));
        assert_eq!(r.dns_answers(Some(RecordType::Txt))[0].data, "v=spf1 include:a.example -all");
    }

    #[test]
    fn fallback_only_when_primary_empty_and_apex_planned() {
        let empty = ProbeResponse::new(200).with_json(json!({"Answer": []}));
        let apex = ProbeResponse::new(200).with_json(json!({"Answer": [{"type": 2, "data": "ns1.example.com."}]}));

        let bundle = ResponseBundle::new().with(Slot::DnsNs, empty.clone()).with(Slot::DnsNsFld, apex.clone());
        let (records, used) = bundle.records_with_fallback(Slot::DnsNs, RecordType::Ns);
        assert_eq!(records, vec!["ns1.example.com."]);
        assert!(used);

        let primary = ProbeResponse::new(200).with_json(json!({"Answer": [{"type": 2, "data": "ns9.example.org."}]}));
        let bundle = ResponseBundle::new().with(Slot::DnsNs, primary).with(Slot::DnsNsFld, apex);
        let (records, used) = bundle.records_with_fallback(Slot::DnsNs, RecordType::Ns);
        assert_eq!(records, vec!["ns9.example.org."]);
        assert!(!used);

        let bundle = ResponseBundle::new().with(Slot::DnsNs, empty);
        assert_eq!(bundle.records_with_fallback(Slot::DnsNs, RecordType::Ns), (Vec::new(), false));
    }

    #[test]
    fn slot_names_match_bundle_keys() {
        assert_eq!(Slot::DnsTxtFld.to_string(), "dns_txt_response_fld");
        assert_eq!(Slot::Response.as_ref(), "response");
        assert_eq!(RecordType::Aaaa.to_string(), "AAAA");
    }
}
