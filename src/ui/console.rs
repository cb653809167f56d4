// src/ui/console.rs

use crate::core::models::{CheckOutcome, ProbeResponse};
use crate::core::registry::{describe_checks, CheckTopic};
use crossterm::style::{StyledContent, Stylize};
use std::collections::BTreeMap;

/// Status tag of an outcome: passed, scoring failure, or warning.
pub fn tag(outcome: &CheckOutcome) -> &'static str {
    if outcome.passed {
        "[ OK ]"
    } else if outcome.warn_on_fail {
        "[WARN]"
    } else {
        "[FAIL]"
    }
}

fn styled_tag(outcome: &CheckOutcome) -> StyledContent<&'static str> {
    let tag = tag(outcome);
    if outcome.passed {
        tag.green()
    } else if outcome.warn_on_fail {
        tag.yellow()
    } else {
        tag.red()
    }
}

/// One report line, uncoloured.
pub fn outcome_line(outcome: &CheckOutcome) -> String {
    format!("{} {}", tag(outcome), outcome.message)
}

pub fn print_outcome(outcome: &CheckOutcome) {
    println!("{} {}", styled_tag(outcome), outcome.message);
}

/// Status line and headers of a response, headers sorted by name.
pub fn header_lines(response: &ProbeResponse) -> Vec<String> {
    let mut lines = vec![format!("HTTP {} {}", response.status, response.url)];
    for (name, values) in &response.headers {
        for value in values {
            lines.push(format!("{name}: {value}"));
        }
    }
    lines
}

pub fn print_headers(response: &ProbeResponse) {
    for line in header_lines(response) {
        println!("{line}");
    }
    println!();
}

/// Body of a response; parsed JSON is pretty-printed.
pub fn content_text(response: &ProbeResponse) -> String {
    match &response.json {
        Some(json) => serde_json::to_string_pretty(json).unwrap_or_else(|_| response.text()),
        None => response.text(),
    }
}

pub fn print_content(response: &ProbeResponse) {
    println!("{}", content_text(response));
    println!();
}

/// Every check description, grouped under its topic.
pub fn doc_lines() -> Vec<String> {
    let mut by_topic: BTreeMap<CheckTopic, Vec<&'static str>> = BTreeMap::new();
    for (topic, description) in describe_checks() {
        by_topic.entry(topic).or_default().push(description);
    }

    let mut lines = Vec::new();
    for (topic, descriptions) in by_topic {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(topic.to_string());
        lines.extend(descriptions.into_iter().map(|d| format!("- {d}")));
    }
    lines
}

pub fn print_doc() {
    for line in doc_lines() {
        println!("{line}");
    }
}

pub fn print_score(score: i32) {
    let text = format!("Score: {score}/100");
    if score >= 90 {
        println!("{}", text.green().bold());
    } else if score >= 70 {
        println!("{}", text.yellow().bold());
    } else {
        println!("{}", text.red().bold());
    }
}
