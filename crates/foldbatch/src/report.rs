//! Run reports for submission and download passes.
//!
//! Reports live only for the duration of a run; they are logged and can
//! be printed as JSON, never written next to the artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::submit::EntryState;
use crate::types::{Completion, DownloadedArtifact, SubmissionOutcome};

/// What happened to one manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryReport {
    pub name: String,
    pub outcome: SubmissionOutcome,
    /// Number of verified-prefix attempts made.
    pub attempts: u16,
    /// Every state the entry passed through, in order.
    pub states: Vec<EntryState>,
}

impl EntryReport {
    pub fn reached(&self, state: &EntryState) -> bool {
        self.states.iter().any(|s| s == state)
    }
}

/// Result of a submission pass over a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub entries: Vec<EntryReport>,
}

impl SubmissionReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn submitted(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_submitted()).count()
    }

    /// Entries whose dialog never confirmed closing.
    pub fn provisional(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                e.outcome
                    == SubmissionOutcome::Submitted {
                        completion: Completion::Provisional,
                    }
            })
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.len() - self.submitted()
    }

    pub fn entry(&self, name: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// A run succeeds when the manifest was empty or anything was submitted.
    pub fn success(&self) -> bool {
        self.entries.is_empty() || self.submitted() > 0
    }
}

/// A matched row that could not be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadFailure {
    pub task_name: String,
    pub reason: String,
}

/// Result of a download pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Display names of every listed row, in listing order.
    pub listed: Vec<String>,
    pub artifacts: Vec<DownloadedArtifact>,
    /// Listed rows absent from the manifest.
    pub unlisted: Vec<String>,
    /// Manifest names with no listed row.
    pub missing: Vec<String>,
    /// Later rows sharing a name with an already matched row.
    pub duplicates: Vec<String>,
    pub failures: Vec<DownloadFailure>,
}

impl DownloadReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            listed: Vec::new(),
            artifacts: Vec::new(),
            unlisted: Vec::new(),
            missing: Vec::new(),
            duplicates: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}
