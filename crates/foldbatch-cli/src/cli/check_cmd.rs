//! CLI handler for `foldbatch check <manifest>`: parse without a browser.

use std::path::Path;

use anyhow::Result;
use foldbatch::{ManifestLayout, Settings};

use crate::cli::{output, read_manifest};

/// Run the check command.
pub async fn run(manifest_path: &Path, layout: Option<ManifestLayout>, settings: &Settings) -> Result<()> {
    let manifest = read_manifest(manifest_path, layout, settings)?;
    let duplicates = manifest.duplicate_names();
    let unsafe_names = manifest.unsafe_names();

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "path": manifest_path,
            "entries": manifest.entries(),
            "duplicate_names": duplicates,
            "unsafe_names": unsafe_names,
        }));
        return Ok(());
    }

    if !output::is_quiet() {
        println!("  {} entries in {}", manifest.len(), manifest_path.display());
        println!();
        for entry in &manifest {
            println!("    {:<32} {:>6} residues", entry.name, entry.payload.chars().count());
        }
        println!();
    }
    if !duplicates.is_empty() {
        println!("  [!!] Duplicate names: {}", duplicates.join(", "));
    }
    if !unsafe_names.is_empty() {
        println!(
            "  [!!] Names that cannot be saved as files: {}",
            unsafe_names.join(", ")
        );
    }
    if duplicates.is_empty() && unsafe_names.is_empty() && !output::is_quiet() {
        println!("  [OK] Manifest looks good");
    }
    Ok(())
}
