//! CLI handler for `foldbatch download <manifest>`.

use std::path::Path;

use anyhow::{bail, Result};
use foldbatch::{DownloadMatcher, DownloadReport, ManifestLayout, Settings};

use crate::cli::{nothing_to_do, output, read_manifest};
use crate::operator::{ConsoleOperator, Operator, Unattended};
use crate::session::{self, SessionArgs};

/// Run the download command.
pub async fn run(
    manifest_path: &Path,
    layout: Option<ManifestLayout>,
    output_dir: Option<&Path>,
    session_args: &SessionArgs,
    no_wait: bool,
    settings: &Settings,
) -> Result<()> {
    let manifest = read_manifest(manifest_path, layout, settings)?;
    if nothing_to_do(&manifest, manifest_path) {
        return Ok(());
    }
    let output_dir = crate::config::resolve_output_dir(output_dir);

    let end: &dyn Operator = if no_wait { &Unattended } else { &ConsoleOperator };
    let form = session::open(session_args, settings, &ConsoleOperator).await?;

    let result = DownloadMatcher::new(&form, settings, &output_dir)
        .run(&manifest)
        .await;
    session::close(form, end).await?;
    let report = result?;

    if output::is_json() {
        output::print_json(&report);
    } else if !output::is_quiet() {
        print_summary(&report, &output_dir);
    }

    if !report.success() {
        bail!("{} download(s) failed", report.failures.len());
    }
    Ok(())
}

fn print_summary(report: &DownloadReport, output_dir: &Path) {
    println!();
    println!(
        "  Saved {} of {} listed job(s) to {}",
        report.artifacts.len(),
        report.listed.len(),
        output_dir.display()
    );
    for artifact in &report.artifacts {
        println!(
            "    {:<32} {:>10} bytes",
            artifact.task_name, artifact.bytes
        );
    }
    if !report.missing.is_empty() {
        println!("  Not listed remotely: {}", report.missing.join(", "));
    }
    if !report.duplicates.is_empty() {
        println!("  Listed more than once: {}", report.duplicates.join(", "));
    }
    for failure in &report.failures {
        println!("  [!!] {}: {}", failure.task_name, failure.reason);
    }
}
