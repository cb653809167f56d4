// src/cli.rs

use crate::app::AuditOptions;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ready", version, about = "Checks a website's readiness: security headers, TLS, DNS, email and HTML hygiene")]
pub struct Cli {
    /// Domain to audit, optionally followed by a path (example.com/blog)
    pub domain: Option<String>,

    /// Output the headers from the HTTPS request made to the domain
    #[arg(long)]
    pub headers: bool,

    /// Output the content from the HTTPS request made to the domain
    #[arg(long)]
    pub content: bool,

    /// Include checks that fuzz urls (only run this on your own domain)
    #[arg(long)]
    pub fuzz: bool,

    /// Provide JSON output
    #[arg(long)]
    pub json: bool,

    /// No text output
    #[arg(long)]
    pub quiet: bool,

    /// Print a score out of 100 for this domain
    #[arg(long)]
    pub score: bool,

    /// Print the list of checks and exit
    #[arg(long)]
    pub doc: bool,

    /// Only run checks whose name or identifier contains this
    #[arg(long, value_name = "X")]
    pub check_filter: Option<String>,

    /// Only make requests whose slot name contains this
    #[arg(long, value_name = "X")]
    pub request_filter: Option<String>,
}

impl Cli {
    pub fn audit_options(&self) -> AuditOptions {
        AuditOptions {
            fuzz: self.fuzz,
            check_filter: self.check_filter.clone().filter(|f| !f.is_empty()),
            request_filter: self.request_filter.clone().filter(|f| !f.is_empty()),
            print_output: !self.quiet,
        }
    }

    /// Outcome lines can stream while checks run only when nothing has to be
    /// printed before them.
    pub fn streams_outcomes(&self) -> bool {
        !self.quiet && !self.headers && !self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_filters() {
        let cli = Cli::parse_from(["ready", "--fuzz", "--check-filter=csp", "--request-filter", "dns", "example.com"]);
        assert_eq!(cli.domain.as_deref(), Some("example.com"));
        let options = cli.audit_options();
        assert!(options.fuzz);
        assert_eq!(options.check_filter.as_deref(), Some("csp"));
        assert_eq!(options.request_filter.as_deref(), Some("dns"));
        assert!(options.print_output);
        assert!(cli.streams_outcomes());
    }

    #[test]
    fn empty_filters_are_ignored() {
        let cli = Cli::parse_from(["ready", "--check-filter=", "--quiet", "--headers", "example.com"]);
        let options = cli.audit_options();
        assert_eq!(options.check_filter, None);
        assert!(!options.print_output);
        assert!(!cli.streams_outcomes());
    }

    #[test]
    fn domain_is_optional() {
        let cli = Cli::parse_from(["ready", "--doc"]);
        assert!(cli.doc);
        assert_eq!(cli.domain, None);
    }
}
