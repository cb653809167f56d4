// src/ui/json.rs

//! Machine-readable report. Outcomes are kept as a list because several
//! checks share an identifier.

use crate::core::models::CheckOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Serialize)]
pub struct JsonCheck<'a> {
    pub check: &'a str,
    pub name: &'a str,
    pub passed: bool,
    pub warn_on_fail: bool,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub domain: &'a str,
    pub score: i32,
    pub checks: Vec<JsonCheck<'a>>,
    pub when: String,
}

impl<'a> JsonReport<'a> {
    pub fn new(domain: &'a str, score: i32, outcomes: &'a [CheckOutcome], when: DateTime<Utc>) -> Self {
        Self {
            domain,
            score,
            checks: outcomes
                .iter()
                .map(|o| JsonCheck {
                    check: o.check,
                    name: o.name,
                    passed: o.passed,
                    warn_on_fail: o.warn_on_fail,
                    message: &o.message,
                })
                .collect(),
            when: when.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn to_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
