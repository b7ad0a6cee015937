//! Foldbatch: batch submission and retrieval of fold jobs through a
//! browser-rendered job form.

pub mod config;
pub mod download;
pub mod finalize;
pub mod manifest;
pub mod remote;
pub mod report;
pub mod submit;
pub mod types;

pub use config::{Locator, Locators, Settings, SubmitOptions, Timings};
pub use download::DownloadMatcher;
pub use finalize::JobFinalizer;
pub use manifest::{ManifestLayout, ManifestReader};
pub use remote::{poll_until, ArtifactStream, RemoteForm};
pub use report::{DownloadFailure, DownloadReport, EntryReport, SubmissionReport};
pub use submit::{EntryState, SubmissionDriver};
pub use types::*;
