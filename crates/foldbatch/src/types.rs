//! Core data types for manifests, remote rows, run outcomes and errors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One named payload read from a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub payload: String,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Whether `name` can be used verbatim as a local file stem.
    pub fn has_safe_file_stem(&self) -> bool {
        is_safe_file_stem(&self.name)
    }
}

/// True when `name` contains no path separators and is not a relative
/// directory component.
pub fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// An ordered, immutable list of manifest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    /// Entry names in manifest order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Names that occur more than once, each reported once, in order of
    /// their second occurrence.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut dups = Vec::new();
        for name in self.names() {
            if !seen.insert(name) && !dups.iter().any(|d: &String| d == name) {
                dups.push(name.to_string());
            }
        }
        dups
    }

    /// Names that cannot be persisted as `<name>.zip`.
    pub fn unsafe_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.has_safe_file_stem())
            .map(|e| e.name.clone())
            .collect()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// How the job-name dialog closed after confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The confirmation surface closed within its timeout.
    Confirmed,
    /// The surface never reported closing; the job may or may not exist.
    Provisional,
}

/// Per-entry result of a submission run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Submitted { completion: Completion },
    SkippedValidationFailed,
    SkippedElementMissing { step: String },
}

impl SubmissionOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmissionOutcome::Submitted { .. })
    }
}

/// Opaque reference to an element on the remote surface.
///
/// Handles are only meaningful to the `RemoteForm` that issued them and
/// may go stale when the surface re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A row of the remote job listing as observed at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteJobRow {
    pub display_name: String,
    pub row: ElementHandle,
}

/// A job archive written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedArtifact {
    pub task_name: String,
    pub local_path: PathBuf,
    pub bytes: u64,
}

/// Errors that can occur while reading manifests or driving the remote
/// surface.
#[derive(thiserror::Error, Debug)]
pub enum FoldError {
    #[error("Cannot read manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("Remote form rejected input for {0}")]
    ValidationRejected(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FoldError {
    pub fn timeout(what: impl Into<String>, timeout: std::time::Duration) -> Self {
        FoldError::Timeout {
            what: what.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Errors that stop a whole run rather than a single entry or step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FoldError::ManifestIo { .. } | FoldError::Precondition(_)
        )
    }
}

/// Convenience result type.
pub type FoldResult<T> = Result<T, FoldError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(names: &[&str]) -> Manifest {
        Manifest::new(names.iter().map(|n| ManifestEntry::new(*n, "MKV")).collect())
    }

    #[test]
    fn test_duplicate_names_reported_once() {
        let m = manifest(&["A", "B", "A", "C", "A", "B"]);
        assert_eq!(m.duplicate_names(), vec!["A".to_string(), "B".to_string()]);
        assert!(manifest(&["A", "B"]).duplicate_names().is_empty());
    }

    #[test]
    fn test_safe_file_stem() {
        assert!(is_safe_file_stem("job_01"));
        assert!(is_safe_file_stem("fold-A.v2"));
        assert!(!is_safe_file_stem("a/b"));
        assert!(!is_safe_file_stem("a\\b"));
        assert!(!is_safe_file_stem(".."));
        assert!(!is_safe_file_stem(""));

        let m = manifest(&["ok", "../escape"]);
        assert_eq!(m.unsafe_names(), vec!["../escape".to_string()]);
    }

    #[test]
    fn test_fatal_classification() {
        let io = FoldError::ManifestIo {
            path: PathBuf::from("x.txt"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(io.is_fatal());
        assert!(FoldError::Precondition("no add button".into()).is_fatal());
        assert!(!FoldError::ElementNotFound("dialog".into()).is_fatal());
        assert!(!FoldError::timeout("dialog", std::time::Duration::from_secs(5)).is_fatal());
        assert!(!FoldError::ValidationRejected("A".into()).is_fatal());
    }

    #[test]
    fn test_outcome_serialization_tag() {
        let json = serde_json::to_value(SubmissionOutcome::Submitted {
            completion: Completion::Provisional,
        })
        .unwrap();
        assert_eq!(json["type"], "submitted");
        assert_eq!(json["completion"], "provisional");
    }
}
