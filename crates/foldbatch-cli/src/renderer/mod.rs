//! Browser-backed implementation of the remote form.
//!
//! `ChromiumForm` drives one headed Chromium tab through chromiumoxide and
//! implements [`foldbatch::RemoteForm`] on top of it.

pub mod chromium;
pub mod script;

use std::path::PathBuf;

pub use chromium::{find_chromium, ChromiumForm};

/// How to launch the browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Browser executable; discovered with [`find_chromium`] when unset.
    pub chrome: Option<PathBuf>,
    /// Persistent profile that keeps the signed-in session.
    pub profile_dir: PathBuf,
    pub headless: bool,
}

impl LaunchOptions {
    pub fn new(profile_dir: PathBuf) -> Self {
        Self {
            chrome: None,
            profile_dir,
            headless: false,
        }
    }
}
