// src/ui/mod.rs

//! Terminal and JSON rendering of audit results.

pub mod console;
pub mod json;
