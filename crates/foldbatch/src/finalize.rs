//! Job finalization: name the job, set the seed toggle, confirm, reset.
//!
//! Each step waits on its own element with its own timeout. Clicks that
//! the page may intercept fall back to a scripted click by locator.

use crate::config::{Locator, Locators, Settings, Timings};
use crate::remote::{settle, RemoteForm};
use crate::types::{Completion, ElementHandle, FoldError, FoldResult};

/// Drives the preview dialog for one job.
pub struct JobFinalizer<'a, R: RemoteForm + ?Sized> {
    remote: &'a R,
    locators: &'a Locators,
    timings: &'a Timings,
    seed_toggle_on: bool,
}

impl<'a, R: RemoteForm + ?Sized> JobFinalizer<'a, R> {
    pub fn new(remote: &'a R, settings: &'a Settings) -> Self {
        Self {
            remote,
            locators: &settings.locators,
            timings: &settings.timings,
            seed_toggle_on: settings.submit.seed_toggle_on,
        }
    }

    /// Finalize the job currently entered in the form under `job_name`.
    ///
    /// Returns `Completion::Provisional` when the dialog did not close in
    /// time after confirmation. The job may still have been created.
    pub async fn finalize(&self, job_name: &str) -> FoldResult<Completion> {
        let dialog = self.open_preview().await?;

        let field = self.job_name_field(&dialog).await?;
        self.remote.clear(&field).await?;
        self.remote
            .type_incremental(&field, job_name, self.timings.job_name_key_delay())
            .await?;
        tracing::debug!(entry = %job_name, "Entered job name");

        self.ensure_toggle(&dialog).await?;

        self.click_or_script(&self.locators.confirm_submit, "confirm")
            .await?;
        settle(self.timings.confirm_settle()).await;

        let completion = match self
            .remote
            .wait_hidden(&self.locators.preview_dialog, self.timings.dialog_close_timeout())
            .await
        {
            Ok(()) => Completion::Confirmed,
            Err(e) => {
                tracing::warn!(
                    entry = %job_name,
                    "Dialog did not close after confirm ({e}); treating job as submitted"
                );
                Completion::Provisional
            }
        };

        if let Err(e) = self.reset().await {
            tracing::warn!(entry = %job_name, "Could not reset the form: {e}");
        }

        Ok(completion)
    }

    /// Click "continue and preview" and wait for the dialog.
    async fn open_preview(&self) -> FoldResult<ElementHandle> {
        self.click_or_script(&self.locators.continue_preview, "preview")
            .await?;
        self.remote
            .wait_visible(&self.locators.preview_dialog, self.timings.element_timeout())
            .await
    }

    /// Locate the job-name field inside the dialog, focusing it by script
    /// when the primary selector does not resolve.
    async fn job_name_field(&self, dialog: &ElementHandle) -> FoldResult<ElementHandle> {
        match self
            .remote
            .wait_visible_within(
                dialog,
                &self.locators.job_name_input,
                self.timings.dialog_field_timeout(),
            )
            .await
        {
            Ok(field) => Ok(field),
            Err(e) => {
                tracing::debug!("Job name field not found directly ({e}); focusing by script");
                if !self
                    .remote
                    .focus_scripted(&self.locators.job_name_fallback)
                    .await?
                {
                    return Err(FoldError::ElementNotFound(
                        self.locators.job_name_fallback.to_string(),
                    ));
                }
                self.remote
                    .wait_visible_within(
                        dialog,
                        &self.locators.focused_input,
                        self.timings.element_timeout(),
                    )
                    .await
            }
        }
    }

    /// Bring the seed toggle into the required state. Clicks only when the
    /// current `aria-checked` differs; returns whether a click was issued.
    pub async fn ensure_toggle(&self, dialog: &ElementHandle) -> FoldResult<bool> {
        let toggle = self
            .remote
            .wait_visible_within(dialog, &self.locators.seed_toggle, self.timings.element_timeout())
            .await?;
        let checked = self
            .remote
            .read_attribute(&toggle, "aria-checked")
            .await?
            .is_some_and(|v| v == "true");
        if checked == self.seed_toggle_on {
            return Ok(false);
        }
        self.remote.click(&toggle).await?;
        tracing::debug!(on = self.seed_toggle_on, "Switched seed toggle");
        Ok(true)
    }

    /// Click "Clear" so the next entry starts from an empty form.
    pub async fn reset(&self) -> FoldResult<()> {
        self.click_or_script(&self.locators.clear, "clear").await?;
        settle(self.timings.reset_settle()).await;
        Ok(())
    }

    async fn click_or_script(&self, locator: &Locator, step: &str) -> FoldResult<()> {
        let primary = match self
            .remote
            .wait_visible(locator, self.timings.element_timeout())
            .await
        {
            Ok(el) => self.remote.click(&el).await,
            Err(e) => Err(e),
        };
        match primary {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(step, "Direct click failed ({e}); trying scripted click");
                if self.remote.click_scripted(locator).await? {
                    Ok(())
                } else {
                    Err(FoldError::ElementNotFound(locator.to_string()))
                }
            }
        }
    }
}
