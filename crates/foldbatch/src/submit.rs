//! Batch submission of manifest entries.
//!
//! Each entry walks an explicit state machine:
//!
//! ```text
//! Idle → EntityCreated → PartialInput → Enabled ──→ FullInput → Finalizing → Done
//!            ↑                  │
//!            └── NotEnabled ◄───┘   (retry while attempt < max_retries, else Failed)
//! ```
//!
//! The first `prefix_len` characters are typed one key at a time so the
//! page's validator arms; the remainder goes in larger keystroke batches
//! once the save button reports enabled. A failing entry never stops the
//! batch.

use serde::{Deserialize, Serialize};

use crate::config::{Locators, Settings, SubmitOptions, Timings};
use crate::finalize::JobFinalizer;
use crate::remote::{settle, RemoteForm};
use crate::report::{EntryReport, SubmissionReport};
use crate::types::{
    Completion, ElementHandle, FoldError, FoldResult, Manifest, ManifestEntry, SubmissionOutcome,
};

/// Position of one entry in the submission state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntryState {
    Idle,
    EntityCreated { attempt: u8 },
    PartialInput { attempt: u8 },
    Enabled,
    NotEnabled { attempt: u8 },
    FullInput,
    Finalizing,
    Done { completion: Completion },
    Failed { outcome: SubmissionOutcome },
}

impl EntryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryState::Done { .. } | EntryState::Failed { .. })
    }

    fn missing(step: &str) -> Self {
        EntryState::Failed {
            outcome: SubmissionOutcome::SkippedElementMissing {
                step: step.to_string(),
            },
        }
    }
}

/// Per-entry working state carried between transitions.
struct EntryRun<'e> {
    entry: &'e ManifestEntry,
    input: Option<ElementHandle>,
    attempts: u16,
    states: Vec<EntryState>,
}

/// Submits manifest entries one after another on a single remote form.
pub struct SubmissionDriver<'a, R: RemoteForm + ?Sized> {
    remote: &'a R,
    locators: &'a Locators,
    timings: &'a Timings,
    options: &'a SubmitOptions,
    finalizer: JobFinalizer<'a, R>,
}

impl<'a, R: RemoteForm + ?Sized> SubmissionDriver<'a, R> {
    pub fn new(remote: &'a R, settings: &'a Settings) -> Self {
        Self {
            remote,
            locators: &settings.locators,
            timings: &settings.timings,
            options: &settings.submit,
            finalizer: JobFinalizer::new(remote, settings),
        }
    }

    /// Submit every entry in order.
    ///
    /// Only a missing "add entity" control aborts the run; every other
    /// failure is recorded on its entry and the next entry proceeds. No
    /// deduplication against earlier runs happens here.
    pub async fn run(&self, manifest: &Manifest) -> FoldResult<SubmissionReport> {
        let mut report = SubmissionReport::start();
        tracing::info!(run_id = %report.run_id, entries = manifest.len(), "Starting submission");

        if let Err(e) = self.finalizer.reset().await {
            tracing::debug!("Initial clear skipped: {e}");
        }

        self.remote
            .wait_visible(&self.locators.add_entity, self.timings.element_timeout())
            .await
            .map_err(|e| {
                FoldError::Precondition(format!(
                    "'{}' control never appeared: {e}",
                    self.locators.add_entity
                ))
            })?;

        for (i, entry) in manifest.iter().enumerate() {
            tracing::info!(entry = %entry.name, index = i + 1, total = manifest.len(), "Submitting");
            let entry_report = self.submit_entry(entry).await;
            match &entry_report.outcome {
                SubmissionOutcome::Submitted { completion } => {
                    tracing::info!(entry = %entry.name, ?completion, "Submitted");
                }
                outcome => {
                    tracing::warn!(entry = %entry.name, ?outcome, "Skipped");
                }
            }
            report.entries.push(entry_report);
        }

        report.finish();
        tracing::info!(
            submitted = report.submitted(),
            provisional = report.provisional(),
            skipped = report.skipped(),
            "Submission finished"
        );
        Ok(report)
    }

    /// Drive a single entry to a terminal state.
    pub async fn submit_entry(&self, entry: &ManifestEntry) -> EntryReport {
        // Handles never outlive the entry that resolved them.
        self.remote.release_handles().await;
        let mut run = EntryRun {
            entry,
            input: None,
            attempts: 0,
            states: vec![EntryState::Idle],
        };

        let mut state = EntryState::Idle;
        let outcome = loop {
            state = self.step(&mut run, state).await;
            tracing::debug!(entry = %entry.name, ?state, "Transition");
            run.states.push(state.clone());
            match &state {
                EntryState::Done { completion } => {
                    break SubmissionOutcome::Submitted {
                        completion: *completion,
                    }
                }
                EntryState::Failed { outcome } => break outcome.clone(),
                _ => {}
            }
        };

        EntryReport {
            name: entry.name.clone(),
            outcome,
            attempts: run.attempts,
            states: run.states,
        }
    }

    async fn step(&self, run: &mut EntryRun<'_>, state: EntryState) -> EntryState {
        let name = &run.entry.name;
        match state {
            EntryState::Idle => match self.create_entity().await {
                Ok(input) => {
                    run.input = Some(input);
                    EntryState::EntityCreated { attempt: 0 }
                }
                Err(e) => {
                    tracing::warn!(entry = %name, step = "add_entity", "{e}");
                    EntryState::missing("add_entity")
                }
            },

            EntryState::EntityCreated { attempt } => {
                run.attempts = u16::from(attempt) + 1;
                let Some(input) = run.input else {
                    return EntryState::missing("sequence_input");
                };
                match self.type_prefix(&input, &run.entry.payload).await {
                    Ok(()) => EntryState::PartialInput { attempt },
                    Err(e) => {
                        tracing::warn!(entry = %name, step = "prefix", attempt, "{e}");
                        EntryState::missing("prefix")
                    }
                }
            }

            EntryState::PartialInput { attempt } => {
                match self
                    .remote
                    .wait_enabled(&self.locators.save_job, self.timings.validation_timeout())
                    .await
                {
                    Ok(true) => EntryState::Enabled,
                    Ok(false) => EntryState::NotEnabled { attempt },
                    Err(e) => {
                        tracing::debug!(entry = %name, "Enabled check failed: {e}");
                        EntryState::NotEnabled { attempt }
                    }
                }
            }

            EntryState::NotEnabled { attempt } => {
                if attempt >= self.options.max_retries {
                    tracing::warn!(
                        entry = %name,
                        attempts = u16::from(attempt) + 1,
                        "{}",
                        FoldError::ValidationRejected(name.clone())
                    );
                    self.cleanup(name).await;
                    return EntryState::Failed {
                        outcome: SubmissionOutcome::SkippedValidationFailed,
                    };
                }
                tracing::info!(entry = %name, attempt, "Save button still disabled; retyping prefix");
                let Some(input) = run.input else {
                    return EntryState::missing("sequence_input");
                };
                match self.remote.clear(&input).await {
                    Ok(()) => EntryState::EntityCreated {
                        attempt: attempt + 1,
                    },
                    Err(e) => {
                        tracing::warn!(entry = %name, step = "retry_clear", "{e}");
                        EntryState::missing("retry_clear")
                    }
                }
            }

            EntryState::Enabled => {
                let Some(input) = run.input else {
                    return EntryState::missing("sequence_input");
                };
                match self.type_remainder(&input, &run.entry.payload).await {
                    Ok(()) => EntryState::FullInput,
                    Err(e) => {
                        tracing::warn!(entry = %name, step = "remainder", "{e}");
                        self.cleanup(name).await;
                        EntryState::missing("remainder")
                    }
                }
            }

            EntryState::FullInput => EntryState::Finalizing,

            EntryState::Finalizing => match self.finalizer.finalize(name).await {
                Ok(completion) => EntryState::Done { completion },
                Err(e) => {
                    tracing::warn!(entry = %name, step = "finalize", "{e}");
                    self.cleanup(name).await;
                    EntryState::missing("finalize")
                }
            },

            terminal @ (EntryState::Done { .. } | EntryState::Failed { .. }) => terminal,
        }
    }

    /// Click "add entity" and return the newest sequence field.
    async fn create_entity(&self) -> FoldResult<ElementHandle> {
        let add = self
            .remote
            .wait_visible(&self.locators.add_entity, self.timings.element_timeout())
            .await?;
        self.remote.click(&add).await?;
        self.remote
            .wait_visible(&self.locators.sequence_input, self.timings.element_timeout())
            .await
    }

    async fn type_prefix(&self, input: &ElementHandle, payload: &str) -> FoldResult<()> {
        self.remote.click(input).await?;
        for ch in payload.chars().take(self.options.prefix_len) {
            let mut buf = [0u8; 4];
            self.remote
                .type_incremental(input, ch.encode_utf8(&mut buf), self.timings.prefix_key_delay())
                .await?;
            settle(self.timings.prefix_gap()).await;
        }
        Ok(())
    }

    async fn type_remainder(&self, input: &ElementHandle, payload: &str) -> FoldResult<()> {
        let rest: Vec<char> = payload.chars().skip(self.options.prefix_len).collect();
        if rest.is_empty() {
            return Ok(());
        }
        self.remote.click(input).await?;
        for chunk in rest.chunks(self.options.chunk_size.max(1)) {
            let chunk: String = chunk.iter().collect();
            self.remote
                .type_incremental(input, &chunk, std::time::Duration::ZERO)
                .await?;
        }
        Ok(())
    }

    /// Best-effort reset after a failed entry.
    async fn cleanup(&self, name: &str) {
        if let Err(e) = self.finalizer.reset().await {
            tracing::debug!(entry = %name, "Cleanup clear failed: {e}");
        }
    }
}
