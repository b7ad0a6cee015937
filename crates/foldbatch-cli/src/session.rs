//! Browser session bootstrap: launch, open the service, get signed in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use foldbatch::{RemoteForm, Settings};

use crate::operator::Operator;
use crate::renderer::{ChromiumForm, LaunchOptions};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Browser flags shared by the `submit` and `download` commands.
#[derive(Debug, Clone, Default)]
pub struct SessionArgs {
    pub url: Option<String>,
    pub profile: Option<PathBuf>,
    pub chrome: Option<PathBuf>,
}

impl SessionArgs {
    fn launch_options(&self) -> LaunchOptions {
        let profile = crate::config::resolve_profile_dir(self.profile.as_deref());
        LaunchOptions {
            chrome: self.chrome.clone(),
            ..LaunchOptions::new(profile)
        }
    }
}

/// Launch the browser, open the service and pass the login checkpoint.
pub async fn open(
    args: &SessionArgs,
    settings: &Settings,
    operator: &dyn Operator,
) -> Result<ChromiumForm> {
    let options = args.launch_options();
    let form = ChromiumForm::launch(&options, &settings.timings).await?;
    let url = args.url.as_deref().unwrap_or(&settings.service_url);

    form.navigate(url, NAVIGATION_TIMEOUT)
        .await
        .with_context(|| format!("could not open {url}"))?;
    sign_in(&form, settings, operator).await?;
    Ok(form)
}

/// Click the sign-in control when it shows up and wait for the operator
/// to finish signing in. A profile that is already signed in passes
/// straight through.
pub async fn sign_in<R: RemoteForm + ?Sized>(
    form: &R,
    settings: &Settings,
    operator: &dyn Operator,
) -> Result<()> {
    let login = &settings.locators.login;
    match form
        .probe_visible(login, settings.timings.login_probe_timeout())
        .await
    {
        Some(button) => {
            if let Err(e) = form.click(&button).await {
                tracing::warn!("Could not click '{login}': {e}");
            }
            operator
                .acknowledge("Finish signing in in the browser window, then press Enter")
                .await?;
            tracing::info!("Signed in");
        }
        None => tracing::info!("Already signed in"),
    }
    Ok(())
}

/// Block on the end-of-run checkpoint, then close the browser.
pub async fn close(form: ChromiumForm, operator: &dyn Operator) -> Result<()> {
    if let Err(e) = operator
        .acknowledge("Run finished. Press Enter to close the browser")
        .await
    {
        tracing::warn!("{e:#}");
    }
    form.close().await
}

/// Where the browser keeps its session, for diagnostics.
pub fn profile_dir(args: &SessionArgs) -> PathBuf {
    args.launch_options().profile_dir
}

/// Whether a profile directory looks like it has been used before.
pub fn profile_exists(dir: &Path) -> bool {
    dir.join("Default").is_dir() || dir.join("Local State").is_file()
}
