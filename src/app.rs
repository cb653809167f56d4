// src/app.rs

//! One audit from domain to scored outcomes: probes, selection, execution.

use crate::config::AuditConfig;
use crate::core::engine::{execute, score, select_checks};
use crate::core::error::{AuditError, ProbeError};
use crate::core::models::{CheckOutcome, ProbeResponse, Slot};
use crate::core::registry::CheckContext;
use crate::core::scanner::apex::ApexLookup;
use crate::core::scanner::http_probe::{ReqwestTransport, Transport};
use crate::core::scanner::run_probes;
use crate::core::scanner::ssl_scanner::{NativeTlsProbe, TlsProbe};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Run-level switches.
#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    /// Also run checks that issue speculative requests.
    pub fuzz: bool,
    /// Only run checks whose name or identifier contains this.
    pub check_filter: Option<String>,
    /// Only issue requests whose slot name contains this.
    pub request_filter: Option<String>,
    pub print_output: bool,
}

/// Everything one audit produced.
#[derive(Debug)]
pub struct AuditReport {
    pub domain: String,
    pub outcomes: Vec<CheckOutcome>,
    pub score: i32,
    /// The primary HTTPS response, for `--headers` and `--content`.
    pub response: Option<ProbeResponse>,
    pub when: DateTime<Utc>,
}

impl AuditReport {
    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// Holds the capabilities shared by every audit of a process.
pub struct App {
    config: Arc<AuditConfig>,
    transport: Arc<dyn Transport>,
    tls: Arc<dyn TlsProbe>,
    apex: Arc<ApexLookup>,
}

impl App {
    /// Builds the network-backed capabilities and loads the public suffix list.
    pub async fn new(config: AuditConfig) -> Result<Self, ProbeError> {
        let transport = ReqwestTransport::new(config.default_timeout)?;
        let apex = ApexLookup::load(&config, &transport).await;
        let tls = NativeTlsProbe::new(config.tls_timeout);
        Ok(Self::with_capabilities(config, Arc::new(transport), Arc::new(tls), apex))
    }

    pub fn with_capabilities(
        config: AuditConfig,
        transport: Arc<dyn Transport>,
        tls: Arc<dyn TlsProbe>,
        apex: ApexLookup,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            tls,
            apex: Arc::new(apex),
        }
    }

    /// Audits `domain`. `on_outcome` sees each outcome as soon as it exists.
    pub async fn audit(
        &self,
        domain: &str,
        options: &AuditOptions,
        on_outcome: impl FnMut(&CheckOutcome),
    ) -> Result<AuditReport, AuditError> {
        info!(domain, fuzz = options.fuzz, "Starting audit.");
        let request_filter = options.request_filter.as_deref();
        let collection = run_probes(domain, self.transport.as_ref(), &self.apex, &self.config, request_filter)
            .await
            .ok_or_else(|| AuditError::NoResponse { domain: domain.to_string() })?;

        let ctx = CheckContext::new(
            domain,
            &collection.domain_with_no_path,
            Arc::clone(&self.transport),
            Arc::clone(&self.tls),
            Arc::clone(&self.config),
        )
        .with_apex(collection.apex.clone())
        .with_ipv6(collection.is_ipv6)
        .with_print_output(options.print_output);

        let checks = select_checks(&collection.bundle, options.fuzz);
        let outcomes = execute(&checks, &collection.bundle, &ctx, options.check_filter.as_deref(), on_outcome).await;
        let score = score(&outcomes);
        info!(domain, score, outcomes = outcomes.len(), "Audit finished.");

        Ok(AuditReport {
            domain: domain.to_string(),
            response: collection.bundle.get(Slot::Response).cloned(),
            outcomes,
            score,
            when: Utc::now(),
        })
    }
}
