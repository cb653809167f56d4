// src/core/checks/mod.rs

//! Check implementations, one file per topic. Each file declares its checks as
//! `pub static` `CheckSpec`s; `core::registry::CHECKS` fixes their order.

pub mod bad_response;
pub mod content;
pub mod cookies;
pub mod cross_origin;
pub mod csp;
pub mod dns;
pub mod email;
pub mod hsts;
pub mod html;
pub mod leaky_headers;
pub mod ns;
pub mod redirect;
pub mod report_to;
pub mod ssl;
pub mod status;
pub mod swagger;
pub mod well_known;

use crate::core::models::{ResponseBundle, Slot};

/// How an absent value is shown inside outcome messages.
pub(crate) fn observed(value: Option<&str>) -> &str {
    value.unwrap_or("none")
}

/// A header of the primary HTTPS response.
pub(crate) fn primary_header<'a>(bundle: &'a ResponseBundle, name: &str) -> Option<&'a str> {
    bundle.header(Slot::Response, name)
}

/// Body of the primary HTTPS response; empty when it is absent.
pub(crate) fn primary_body(bundle: &ResponseBundle) -> String {
    bundle.get(Slot::Response).map(|r| r.text()).unwrap_or_default()
}

/// Formats a list of values the way outcome messages show them.
pub(crate) fn list(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}
