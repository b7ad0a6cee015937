//! Locator table, pacing constants and run settings.
//!
//! The defaults target the AlphaFold Server job form. Every selector and
//! delay can be overridden from a settings file, so the drivers never
//! hard-code a particular page layout.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::manifest::ManifestLayout;
use crate::types::{FoldError, FoldResult};

/// Default service entry point.
pub const DEFAULT_SERVICE_URL: &str = "https://alphafoldserver.com/";

/// Describes how to find an element: a CSS selector, optionally narrowed
/// to elements whose trimmed text contains `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub css: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Take the last match instead of the first.
    #[serde(default)]
    pub last: bool,
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
            last: false,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn last(mut self) -> Self {
        self.last = true;
        self
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.css)?;
        if let Some(text) = &self.text {
            write!(f, " \"{}\"", text.trim())?;
        }
        if self.last {
            write!(f, " (last)")?;
        }
        Ok(())
    }
}

/// Every element the drivers interact with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locators {
    pub login: Locator,
    pub add_entity: Locator,
    pub clear: Locator,
    pub sequence_input: Locator,
    /// Button whose `disabled` attribute signals validator acceptance.
    pub save_job: Locator,
    pub continue_preview: Locator,
    pub preview_dialog: Locator,
    /// Job-name field, looked up inside the preview dialog.
    pub job_name_input: Locator,
    /// Page-wide lookup used by the scripted fallback to focus the field.
    pub job_name_fallback: Locator,
    pub focused_input: Locator,
    /// Seed toggle, looked up inside the preview dialog.
    pub seed_toggle: Locator,
    pub confirm_submit: Locator,
    /// Filter chip; the chip label is supplied per filter.
    pub filter_chip: Locator,
    pub job_table: Locator,
    pub job_rows: Locator,
    /// Name cell, looked up inside a row.
    pub row_name: Locator,
    /// Row action-menu trigger, looked up inside a row.
    pub row_actions: Locator,
    pub download_item: Locator,
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            login: Locator::css("span").with_text("Continue with Google"),
            add_entity: Locator::css("button").with_text("Add entity"),
            clear: Locator::css("button").with_text("Clear"),
            sequence_input: Locator::css("textarea.sequence-input").last(),
            save_job: Locator::css("button").with_text("Save job"),
            continue_preview: Locator::css("span").with_text("Continue and preview job"),
            preview_dialog: Locator::css("gdm-af-preview-dialog"),
            job_name_input: Locator::css("input[required]"),
            job_name_fallback: Locator::css("input[required].mat-mdc-input-element"),
            focused_input: Locator::css("input:focus"),
            seed_toggle: Locator::css(r#"button.mdc-switch[role="switch"]"#),
            confirm_submit: Locator::css("span").with_text("Confirm and submit job"),
            filter_chip: Locator::css("span.mdc-evolution-chip__text-label"),
            job_table: Locator::css("table.mat-mdc-table"),
            job_rows: Locator::css("table.mat-mdc-table tbody tr"),
            row_name: Locator::css("td.mat-column-name"),
            row_actions: Locator::css("button.mat-mdc-menu-trigger.fold-actions"),
            download_item: Locator::css("a.mat-mdc-menu-item[download]"),
        }
    }
}

impl Locators {
    /// The filter chip locator narrowed to one label.
    pub fn filter(&self, label: &str) -> Locator {
        self.filter_chip.clone().with_text(label)
    }
}

/// Waits and pacing delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub element_timeout_ms: u64,
    pub dialog_field_timeout_ms: u64,
    pub prefix_key_delay_ms: u64,
    pub prefix_gap_ms: u64,
    pub validation_timeout_ms: u64,
    pub job_name_key_delay_ms: u64,
    pub confirm_settle_ms: u64,
    pub dialog_close_timeout_ms: u64,
    pub reset_settle_ms: u64,
    pub filter_settle_ms: u64,
    pub listing_timeout_ms: u64,
    pub row_timeout_ms: u64,
    pub download_timeout_ms: u64,
    pub login_probe_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            element_timeout_ms: 5_000,
            dialog_field_timeout_ms: 10_000,
            prefix_key_delay_ms: 200,
            prefix_gap_ms: 300,
            validation_timeout_ms: 3_000,
            job_name_key_delay_ms: 100,
            confirm_settle_ms: 6_000,
            dialog_close_timeout_ms: 5_000,
            reset_settle_ms: 1_000,
            filter_settle_ms: 1_000,
            listing_timeout_ms: 10_000,
            row_timeout_ms: 2_000,
            download_timeout_ms: 120_000,
            login_probe_timeout_ms: 3_000,
            poll_interval_ms: 100,
        }
    }
}

impl Timings {
    /// No pacing or settling at all. Timeouts stay non-zero so a single
    /// probe still happens.
    pub fn immediate() -> Self {
        Self {
            element_timeout_ms: 1,
            dialog_field_timeout_ms: 1,
            prefix_key_delay_ms: 0,
            prefix_gap_ms: 0,
            validation_timeout_ms: 1,
            job_name_key_delay_ms: 0,
            confirm_settle_ms: 0,
            dialog_close_timeout_ms: 1,
            reset_settle_ms: 0,
            filter_settle_ms: 0,
            listing_timeout_ms: 1,
            row_timeout_ms: 1,
            download_timeout_ms: 1,
            login_probe_timeout_ms: 1,
            poll_interval_ms: 1,
        }
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn dialog_field_timeout(&self) -> Duration {
        Duration::from_millis(self.dialog_field_timeout_ms)
    }

    pub fn prefix_key_delay(&self) -> Duration {
        Duration::from_millis(self.prefix_key_delay_ms)
    }

    pub fn prefix_gap(&self) -> Duration {
        Duration::from_millis(self.prefix_gap_ms)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }

    pub fn job_name_key_delay(&self) -> Duration {
        Duration::from_millis(self.job_name_key_delay_ms)
    }

    pub fn confirm_settle(&self) -> Duration {
        Duration::from_millis(self.confirm_settle_ms)
    }

    pub fn dialog_close_timeout(&self) -> Duration {
        Duration::from_millis(self.dialog_close_timeout_ms)
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }

    pub fn filter_settle(&self) -> Duration {
        Duration::from_millis(self.filter_settle_ms)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_timeout_ms)
    }

    pub fn row_timeout(&self) -> Duration {
        Duration::from_millis(self.row_timeout_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn login_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.login_probe_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Knobs for the two-phase sequence entry and the job dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitOptions {
    /// Characters typed one at a time before the validator is checked.
    pub prefix_len: usize,
    /// Characters per keystroke batch for the remainder.
    pub chunk_size: usize,
    /// Extra prefix attempts after the first is rejected.
    pub max_retries: u8,
    /// Required state of the seed toggle.
    pub seed_toggle_on: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            prefix_len: 4,
            chunk_size: 10,
            max_retries: 1,
            seed_toggle_on: true,
        }
    }
}

/// Filter chips clicked before the job listing is read.
pub fn default_filters() -> Vec<String> {
    ["Saved draft", "In progress", "Examples", "Failed"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Everything a run can be configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service_url: String,
    pub manifest_layout: ManifestLayout,
    pub locators: Locators,
    pub timings: Timings,
    pub submit: SubmitOptions,
    pub filters: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            manifest_layout: ManifestLayout::default(),
            locators: Locators::default(),
            timings: Timings::default(),
            submit: SubmitOptions::default(),
            filters: default_filters(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> FoldResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FoldError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read settings {}: {e}", path.display()),
            ))
        })?;
        let settings: Settings = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let json = r#"{
            "timings": { "confirm_settle_ms": 250 },
            "locators": { "add_entity": { "css": "button.add" } },
            "filters": ["Failed"]
        }"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.timings.confirm_settle_ms, 250);
        assert_eq!(s.timings.element_timeout_ms, 5_000);
        assert_eq!(s.locators.add_entity, Locator::css("button.add"));
        assert_eq!(s.locators.clear, Locators::default().clear);
        assert_eq!(s.filters, vec!["Failed".to_string()]);
        assert_eq!(s.service_url, DEFAULT_SERVICE_URL);
        assert_eq!(s.submit.prefix_len, 4);
    }

    #[test]
    fn test_layout_in_settings() {
        let s: Settings = serde_json::from_str(r#"{ "manifest_layout": "blank-delimited" }"#).unwrap();
        assert_eq!(s.manifest_layout, ManifestLayout::BlankDelimited);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foldbatch.json");
        std::fs::write(&path, r#"{ "service_url": "http://localhost:8080/" }"#).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.service_url, "http://localhost:8080/");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(FoldError::Json(_))));
    }

    #[test]
    fn test_locator_display() {
        let l = Locator::css("button").with_text(" Clear ");
        assert_eq!(l.to_string(), "button \"Clear\"");
        assert_eq!(
            Locators::default().sequence_input.to_string(),
            "textarea.sequence-input (last)"
        );
    }

    #[test]
    fn test_filter_locator() {
        let loc = Locators::default().filter("Failed");
        assert_eq!(loc.css, "span.mdc-evolution-chip__text-label");
        assert_eq!(loc.text.as_deref(), Some("Failed"));
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let t = Timings {
            poll_interval_ms: 0,
            ..Timings::default()
        };
        assert_eq!(t.poll_interval(), Duration::from_millis(1));
    }
}
