// src/main.rs

use clap::{CommandFactory, Parser};
use color_eyre::eyre::Result;
use ready_rs::app::App;
use ready_rs::cli::Cli;
use ready_rs::config::AuditConfig;
use ready_rs::logging;
use ready_rs::ui::console;
use ready_rs::ui::json::JsonReport;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if cli.doc {
        console::print_doc();
        return Ok(());
    }

    let Some(domain) = cli.domain.as_deref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let log_path = logging::initialize_logging()?;
    info!(log = %log_path.display(), domain, "ready starting.");

    let app = App::new(AuditConfig::from_env()).await?;
    let streaming = cli.streams_outcomes();
    let report = match app
        .audit(domain, &cli.audit_options(), |outcome| {
            if streaming {
                console::print_outcome(outcome);
            }
        })
        .await
    {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Audit aborted.");
            println!("{e}");
            return Ok(());
        }
    };

    if let Some(response) = &report.response {
        if cli.headers {
            console::print_headers(response);
        }
        if cli.content {
            console::print_content(response);
        }
    }
    if !cli.quiet && !streaming {
        report.outcomes.iter().for_each(console::print_outcome);
    }

    if cli.json {
        let json = JsonReport::new(&report.domain, report.score, &report.outcomes, report.when);
        println!("{}", json.to_pretty()?);
    }

    if cli.score {
        console::print_score(report.score);
    }

    Ok(())
}
