//! CLI subcommand implementations for the foldbatch binary.

pub mod check_cmd;
pub mod doctor;
pub mod download_cmd;
pub mod output;
pub mod submit_cmd;

use std::path::Path;

use anyhow::{Context, Result};
use foldbatch::{Manifest, ManifestLayout, ManifestReader, Settings};

/// Report an empty manifest. Commands stop before opening a browser
/// when this returns true.
pub fn nothing_to_do(manifest: &Manifest, path: &Path) -> bool {
    if !manifest.is_empty() {
        return false;
    }
    tracing::warn!(path = %path.display(), "Manifest has no entries");
    if !output::is_quiet() {
        println!("  Manifest {} has no entries.", path.display());
    }
    true
}

/// Read a manifest with the layout from the command line, falling back to
/// the one in settings.
pub fn read_manifest(
    path: &Path,
    layout: Option<ManifestLayout>,
    settings: &Settings,
) -> Result<Manifest> {
    let reader = ManifestReader::new(layout.unwrap_or(settings.manifest_layout));
    reader
        .parse(path)
        .with_context(|| format!("could not load manifest ({:?} layout)", reader.layout()))
}
