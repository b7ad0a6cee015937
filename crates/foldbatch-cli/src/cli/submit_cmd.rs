//! CLI handler for `foldbatch submit <manifest>`.

use std::path::Path;

use anyhow::{bail, Result};
use foldbatch::{
    Completion, ManifestLayout, Settings, SubmissionDriver, SubmissionOutcome, SubmissionReport,
};

use crate::cli::{nothing_to_do, output, read_manifest};
use crate::operator::{ConsoleOperator, Operator, Unattended};
use crate::session::{self, SessionArgs};

/// Run the submit command.
pub async fn run(
    manifest_path: &Path,
    layout: Option<ManifestLayout>,
    session_args: &SessionArgs,
    no_wait: bool,
    settings: &Settings,
) -> Result<()> {
    let manifest = read_manifest(manifest_path, layout, settings)?;
    if nothing_to_do(&manifest, manifest_path) {
        return Ok(());
    }

    let end: &dyn Operator = if no_wait { &Unattended } else { &ConsoleOperator };
    let form = session::open(session_args, settings, &ConsoleOperator).await?;

    let result = SubmissionDriver::new(&form, settings).run(&manifest).await;
    session::close(form, end).await?;
    let report = result?;

    if output::is_json() {
        output::print_json(&report);
    } else if !output::is_quiet() {
        print_summary(&report);
    }

    if !report.success() {
        bail!("no entry of {} was submitted", manifest_path.display());
    }
    Ok(())
}

fn print_summary(report: &SubmissionReport) {
    println!();
    for entry in &report.entries {
        let status = match &entry.outcome {
            SubmissionOutcome::Submitted {
                completion: Completion::Confirmed,
            } => "submitted".to_string(),
            SubmissionOutcome::Submitted {
                completion: Completion::Provisional,
            } => "submitted (dialog did not close)".to_string(),
            SubmissionOutcome::SkippedValidationFailed => {
                format!("skipped: rejected after {} attempts", entry.attempts)
            }
            SubmissionOutcome::SkippedElementMissing { step } => {
                format!("skipped: missing element at {step}")
            }
        };
        println!("  {:<32} {status}", entry.name);
    }
    println!();
    println!(
        "  {} submitted ({} provisional), {} skipped",
        report.submitted(),
        report.provisional(),
        report.skipped()
    );
}
