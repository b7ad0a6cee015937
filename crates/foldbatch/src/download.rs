//! Retrieval of finished job archives that match a manifest.
//!
//! The listing is filtered, read once, and every row whose display name is
//! in the manifest is downloaded to `<output_dir>/<name>.zip`. Rows are a
//! snapshot; the page may re-render between reading a row and acting on
//! it, so each row action is bounded and fails on its own.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::config::{Locator, Locators, Settings, Timings};
use crate::remote::{settle, RemoteForm};
use crate::report::{DownloadFailure, DownloadReport};
use crate::types::{
    is_safe_file_stem, DownloadedArtifact, ElementHandle, FoldError, FoldResult, Manifest,
    RemoteJobRow,
};

/// Matches listed jobs against a manifest and downloads the hits.
pub struct DownloadMatcher<'a, R: RemoteForm + ?Sized> {
    remote: &'a R,
    locators: &'a Locators,
    timings: &'a Timings,
    filters: &'a [String],
    output_dir: PathBuf,
}

impl<'a, R: RemoteForm + ?Sized> DownloadMatcher<'a, R> {
    pub fn new(remote: &'a R, settings: &'a Settings, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            locators: &settings.locators,
            timings: &settings.timings,
            filters: &settings.filters,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Filter the listing, then download every row named in `manifest`.
    ///
    /// Fails only when the output directory cannot be created or the job
    /// table never renders.
    pub async fn run(&self, manifest: &Manifest) -> FoldResult<DownloadReport> {
        let mut report = DownloadReport::start();
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tracing::info!(
            run_id = %report.run_id,
            output_dir = %self.output_dir.display(),
            "Starting download"
        );

        self.apply_filters().await;
        let rows = self.list_rows().await?;

        let wanted: HashSet<&str> = manifest.names().collect();
        let mut matched: HashSet<String> = HashSet::new();

        for row in &rows {
            let name = row.display_name.as_str();
            report.listed.push(name.to_string());

            if !wanted.contains(name) {
                tracing::debug!(task = %name, "Not in manifest; skipped");
                report.unlisted.push(name.to_string());
                continue;
            }
            if !matched.insert(name.to_string()) {
                tracing::warn!(task = %name, "Another row with this name was already handled; skipped");
                report.duplicates.push(name.to_string());
                continue;
            }
            if !is_safe_file_stem(name) {
                tracing::warn!(task = %name, "Name is not a safe file name; not saved");
                report.failures.push(DownloadFailure {
                    task_name: name.to_string(),
                    reason: "name contains a path separator".to_string(),
                });
                continue;
            }

            match self.download_row(row).await {
                Ok(artifact) => {
                    tracing::info!(
                        task = %name,
                        path = %artifact.local_path.display(),
                        bytes = artifact.bytes,
                        "Downloaded"
                    );
                    report.artifacts.push(artifact);
                }
                Err(e) => {
                    tracing::warn!(task = %name, "Download failed: {e}");
                    report.failures.push(DownloadFailure {
                        task_name: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.remote.release_handles().await;

        let listed: HashSet<&str> = report.listed.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        report.missing = manifest
            .names()
            .filter(|n| !listed.contains(n) && seen.insert(*n))
            .map(str::to_string)
            .collect();

        report.finish();
        tracing::info!(
            downloaded = report.artifacts.len(),
            missing = report.missing.len(),
            failed = report.failures.len(),
            "Download finished"
        );
        Ok(report)
    }

    /// Click each filter chip in turn, letting the listing re-render after
    /// each one. Chips that cannot be found are skipped.
    pub async fn apply_filters(&self) {
        for label in self.filters {
            let chip = self.locators.filter(label);
            let clicked = match self.remote.click_scripted(&chip).await {
                Ok(true) => true,
                Ok(false) => false,
                Err(e) => {
                    tracing::debug!(filter = %label, "Scripted filter click failed: {e}");
                    false
                }
            };
            let clicked = clicked || self.click_chip_directly(&chip).await;
            if clicked {
                tracing::info!(filter = %label, "Applied filter");
            } else {
                tracing::warn!(filter = %label, "Filter chip not found");
            }
            settle(self.timings.filter_settle()).await;
        }
    }

    async fn click_chip_directly(&self, chip: &Locator) -> bool {
        match self.remote.probe_visible(chip, self.timings.row_timeout()).await {
            Some(el) => self.remote.click(&el).await.is_ok(),
            None => false,
        }
    }

    /// Read the display name of every rendered row. Rows whose name cell
    /// is not visible are skipped.
    pub async fn list_rows(&self) -> FoldResult<Vec<RemoteJobRow>> {
        self.remote
            .wait_visible(&self.locators.job_table, self.timings.listing_timeout())
            .await
            .map_err(|e| FoldError::Precondition(format!("job table never appeared: {e}")))?;

        let handles = self.remote.query_all(&self.locators.job_rows).await?;
        tracing::info!(rows = handles.len(), "Read job listing");

        let mut rows = Vec::with_capacity(handles.len());
        for (i, row) in handles.into_iter().enumerate() {
            match self.row_name(&row).await {
                Ok(display_name) => rows.push(RemoteJobRow { display_name, row }),
                Err(e) => tracing::warn!(row = i + 1, "Could not read task name: {e}"),
            }
        }
        Ok(rows)
    }

    async fn row_name(&self, row: &ElementHandle) -> FoldResult<String> {
        let cell = self
            .remote
            .wait_visible_within(row, &self.locators.row_name, self.timings.row_timeout())
            .await?;
        Ok(self.remote.text_content(&cell).await?.trim().to_string())
    }

    async fn download_row(&self, row: &RemoteJobRow) -> FoldResult<DownloadedArtifact> {
        let actions = self
            .remote
            .wait_visible_within(&row.row, &self.locators.row_actions, self.timings.row_timeout())
            .await?;
        self.remote.click(&actions).await?;

        let item = self
            .remote
            .wait_visible(&self.locators.download_item, self.timings.row_timeout())
            .await?;
        let mut stream = self
            .remote
            .download(&item, self.timings.download_timeout())
            .await?;

        let local_path = self.artifact_path(&row.display_name);
        let mut file = tokio::fs::File::create(&local_path).await?;
        let bytes = tokio::io::copy(&mut stream, &mut file).await?;
        file.flush().await?;

        Ok(DownloadedArtifact {
            task_name: row.display_name.clone(),
            local_path,
            bytes,
        })
    }

    /// Where the archive for `task_name` is written. Existing files are
    /// overwritten.
    pub fn artifact_path(&self, task_name: &str) -> PathBuf {
        self.output_dir.join(format!("{task_name}.zip"))
    }
}
