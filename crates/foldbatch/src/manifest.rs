//! Manifest file parsing.
//!
//! Two layouts are supported:
//! - `Alternating`: non-blank lines pair up as name, payload, name, payload...
//!   Blank lines are skipped, never treated as record separators.
//! - `BlankDelimited`: records are separated by blank lines. A record holds
//!   a name line followed by a payload line; a third line inside a record
//!   starts the next record instead of being merged into the payload.
//!
//! A name with no payload is dropped with a warning in both layouts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{FoldError, FoldResult, Manifest, ManifestEntry};

/// Record layout of a manifest file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestLayout {
    #[default]
    Alternating,
    BlankDelimited,
}

impl std::str::FromStr for ManifestLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alternating" => Ok(ManifestLayout::Alternating),
            "blank-delimited" => Ok(ManifestLayout::BlankDelimited),
            other => Err(format!(
                "unknown manifest layout '{other}' (expected alternating or blank-delimited)"
            )),
        }
    }
}

/// Parses manifest files into ordered entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestReader {
    layout: ManifestLayout,
}

impl ManifestReader {
    pub fn new(layout: ManifestLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> ManifestLayout {
        self.layout
    }

    /// Read and parse a manifest file.
    pub fn parse(&self, path: impl AsRef<Path>) -> FoldResult<Manifest> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| FoldError::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = self.parse_str(&text);
        tracing::info!(
            path = %path.display(),
            entries = manifest.len(),
            "Read manifest"
        );
        Ok(manifest)
    }

    /// Parse manifest text already in memory.
    pub fn parse_str(&self, text: &str) -> Manifest {
        let entries = match self.layout {
            ManifestLayout::Alternating => parse_alternating(text),
            ManifestLayout::BlankDelimited => parse_blank_delimited(text),
        };

        let manifest = Manifest::new(entries);
        for name in manifest.duplicate_names() {
            tracing::warn!(entry = %name, "Manifest name appears more than once");
        }
        for name in manifest.unsafe_names() {
            tracing::warn!(entry = %name, "Manifest name is not usable as a file name");
        }
        manifest
    }
}

fn parse_alternating(text: &str) -> Vec<ManifestEntry> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .collect();

    let mut entries = Vec::with_capacity(lines.len() / 2);
    let mut pairs = lines.chunks_exact(2);
    for pair in pairs.by_ref() {
        let (_, name) = pair[0];
        let (_, payload) = pair[1];
        entries.push(ManifestEntry::new(name, payload));
    }
    if let [(line_no, name)] = pairs.remainder() {
        tracing::warn!(line = line_no, entry = %name, "No payload follows this name; dropped");
    }
    entries
}

fn flush_record(
    name: &mut Option<(usize, &str)>,
    payload: &mut Option<&str>,
    entries: &mut Vec<ManifestEntry>,
) {
    match (name.take(), payload.take()) {
        (Some((_, n)), Some(p)) => entries.push(ManifestEntry::new(n, p)),
        (Some((line_no, n)), None) => {
            tracing::warn!(line = line_no, entry = %n, "No payload follows this name; dropped");
        }
        _ => {}
    }
}

fn parse_blank_delimited(text: &str) -> Vec<ManifestEntry> {
    let mut entries = Vec::new();
    let mut name: Option<(usize, &str)> = None;
    let mut payload: Option<&str> = None;

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            flush_record(&mut name, &mut payload, &mut entries);
            continue;
        }
        match (name, payload) {
            (None, _) => name = Some((i + 1, line)),
            (Some(_), None) => payload = Some(line),
            (Some(_), Some(_)) => {
                flush_record(&mut name, &mut payload, &mut entries);
                name = Some((i + 1, line));
            }
        }
    }
    flush_record(&mut name, &mut payload, &mut entries);
    entries
}
