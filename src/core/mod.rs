// src/core/mod.rs

/// Individual checks, one file per topic.
pub mod checks;

/// Selection, execution and scoring of checks.
pub mod engine;

pub mod error;

/// Probe responses, the response bundle and check outcomes.
pub mod models;

/// The ordered check catalog and the context checks run with.
pub mod registry;

/// Request planning plus the HTTP, DNS-over-HTTPS and TLS capabilities.
pub mod scanner;
