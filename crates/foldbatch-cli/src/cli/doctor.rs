//! Environment readiness check.

use std::path::Path;

use anyhow::Result;

use crate::config;
use crate::renderer::find_chromium;
use crate::session::{self, SessionArgs};

/// Check the browser, settings file, profile and output directory.
pub async fn run(config_path: Option<&Path>, session_args: &SessionArgs) -> Result<()> {
    println!("Foldbatch Doctor");
    println!("================");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    // Browser
    let chrome = session_args.chrome.clone().or_else(find_chromium);
    match &chrome {
        Some(path) if path.exists() => println!("[OK] Chrome found: {}", path.display()),
        Some(path) => println!("[!!] Chrome path does not exist: {}", path.display()),
        None => println!("[!!] Chrome NOT found. Pass --chrome or set FOLDBATCH_CHROME_PATH."),
    }

    // Settings
    let settings_ok = match config::resolve_settings_path(config_path) {
        Some(path) => match foldbatch::Settings::load(&path) {
            Ok(settings) => {
                println!("[OK] Settings: {}", path.display());
                println!("     Service: {}", settings.service_url);
                true
            }
            Err(e) => {
                println!("[!!] Settings {} invalid: {e}", path.display());
                false
            }
        },
        None => {
            println!("[OK] Settings: built-in defaults");
            true
        }
    };

    // Profile
    let profile = session::profile_dir(session_args);
    if session::profile_exists(&profile) {
        println!("[OK] Browser profile: {}", profile.display());
    } else {
        println!(
            "[??] Browser profile not initialised yet: {} (sign in on first run)",
            profile.display()
        );
    }

    // Output directory
    let out = config::resolve_output_dir(None);
    println!("[OK] Download directory: {}", out.display());

    println!();
    let ready = chrome.as_deref().is_some_and(Path::exists) && settings_ok;
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
