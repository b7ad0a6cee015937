//! Chromium-based remote form using chromiumoxide.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use foldbatch::{
    poll_until, ArtifactStream, ElementHandle, FoldError, FoldResult, Locator, RemoteForm,
    Timings,
};

use super::script::{self, ScriptAction};
use super::LaunchOptions;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. FOLDBATCH_CHROME_PATH env
    if let Ok(p) = std::env::var("FOLDBATCH_CHROME_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Common install locations
    let common: &[&str] = if cfg!(target_os = "macos") {
        &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &["/usr/bin/google-chrome", "/usr/bin/chromium"]
    };
    for c in common {
        let path = PathBuf::from(c);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    None
}

/// A single Chromium tab exposed as a [`RemoteForm`].
pub struct ChromiumForm {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    elements: Mutex<HashMap<u64, Element>>,
    next_id: AtomicU64,
    poll_interval: Duration,
    staging_dir: PathBuf,
}

impl ChromiumForm {
    /// Launch a headed Chromium on the given profile and open a blank tab.
    pub async fn launch(options: &LaunchOptions, timings: &Timings) -> Result<Self> {
        let chrome_path = match &options.chrome {
            Some(path) => path.clone(),
            None => find_chromium()
                .context("Chrome/Chromium not found. Pass --chrome or set FOLDBATCH_CHROME_PATH.")?,
        };
        std::fs::create_dir_all(&options.profile_dir).with_context(|| {
            format!(
                "failed to create profile dir {}",
                options.profile_dir.display()
            )
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&options.profile_dir)
            .arg("--start-maximized")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled");
        if options.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let staging_dir = std::env::temp_dir().join(format!("foldbatch-dl-{}", std::process::id()));
        std::fs::create_dir_all(&staging_dir)?;
        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(staging_dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build download behavior: {e}"))?;
        browser
            .execute(behavior)
            .await
            .context("failed to enable downloads")?;

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        page.evaluate_on_new_document(script::HIDE_WEBDRIVER)
            .await
            .context("failed to install init script")?;

        tracing::info!(profile = %options.profile_dir.display(), "Browser launched");

        Ok(Self {
            browser,
            page,
            handler,
            elements: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            poll_interval: timings.poll_interval(),
            staging_dir,
        })
    }

    /// Navigate the tab to `url`.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                tracing::info!(
                    url,
                    load_time_ms = start.elapsed().as_millis() as u64,
                    "Opened service"
                );
                Ok(())
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {}ms", timeout.as_millis()),
        }
    }

    /// Close the browser and drop staged downloads.
    pub async fn close(mut self) -> Result<()> {
        self.elements.lock().await.clear();
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        let _ = std::fs::remove_dir_all(&self.staging_dir);
        Ok(())
    }

    async fn register(&self, element: Element) -> ElementHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.elements.lock().await.insert(id, element);
        ElementHandle::new(id)
    }

    /// First (or last) visible match of `locator`, searched below `scope`
    /// when given.
    async fn resolve(&self, scope: Option<&ElementHandle>, locator: &Locator) -> Option<Element> {
        let candidates = match scope {
            None => self.page.find_elements(locator.css.as_str()).await.ok()?,
            Some(handle) => {
                let elements = self.elements.lock().await;
                let parent = elements.get(&handle.id())?;
                parent.find_elements(locator.css.as_str()).await.ok()?
            }
        };

        let mut hits = Vec::new();
        for el in candidates {
            if !is_visible(&el).await || !text_matches(&el, locator).await {
                continue;
            }
            hits.push(el);
        }
        if locator.last {
            hits.pop()
        } else {
            hits.into_iter().next()
        }
    }

    async fn wait_resolved(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
        timeout: Duration,
    ) -> FoldResult<ElementHandle> {
        let found = poll_until(timeout, self.poll_interval, || async move {
            self.resolve(scope, locator).await
        })
        .await;
        match found {
            Some(el) => Ok(self.register(el).await),
            None => Err(FoldError::timeout(locator.to_string(), timeout)),
        }
    }

    async fn run_script(&self, locator: &Locator, action: ScriptAction) -> FoldResult<bool> {
        let js = script::lookup_script(locator, action);
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| FoldError::Script(format!("{action:?} {locator}: {e}")))?;
        result
            .into_value::<bool>()
            .map_err(|e| FoldError::Script(format!("unexpected script result: {e:?}")))
    }

    async fn call_on(&self, handle: &ElementHandle, function: &str) -> FoldResult<()> {
        let elements = self.elements.lock().await;
        let el = lookup(&elements, handle)?;
        el.call_js_fn(function, false)
            .await
            .map_err(|e| FoldError::Script(e.to_string()))?;
        Ok(())
    }

    async fn await_download(&self, trigger: &ElementHandle, timeout: Duration) -> FoldResult<String> {
        let mut begins = self
            .browser
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(|e| FoldError::Session(e.to_string()))?;
        let mut progress = self
            .browser
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(|e| FoldError::Session(e.to_string()))?;

        self.click(trigger).await?;

        let wait = async {
            let begin = begins
                .next()
                .await
                .ok_or_else(|| FoldError::Download("download never started".into()))?;
            tracing::debug!(file = %begin.suggested_filename, "Download started");
            while let Some(event) = progress.next().await {
                if event.guid != begin.guid {
                    continue;
                }
                match event.state {
                    DownloadProgressState::Completed => return Ok(begin.guid.clone()),
                    DownloadProgressState::Canceled => {
                        return Err(FoldError::Download("download was canceled".into()))
                    }
                    DownloadProgressState::InProgress => {}
                }
            }
            Err(FoldError::Download("download events ended early".into()))
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| FoldError::timeout("download", timeout))?
    }
}

fn lookup<'m>(elements: &'m HashMap<u64, Element>, handle: &ElementHandle) -> FoldResult<&'m Element> {
    elements
        .get(&handle.id())
        .ok_or_else(|| FoldError::ElementNotFound(format!("stale element handle {}", handle.id())))
}

async fn is_visible(el: &Element) -> bool {
    match el.call_js_fn(script::IS_VISIBLE_FN, false).await {
        Ok(ret) => ret
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        Err(_) => false,
    }
}

async fn text_matches(el: &Element, locator: &Locator) -> bool {
    let Some(wanted) = &locator.text else {
        return true;
    };
    match el.inner_text().await {
        Ok(Some(text)) => text.trim().contains(wanted.trim()),
        _ => false,
    }
}

#[async_trait]
impl RemoteForm for ChromiumForm {
    async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> FoldResult<ElementHandle> {
        self.wait_resolved(None, locator, timeout).await
    }

    async fn wait_visible_within(
        &self,
        scope: &ElementHandle,
        locator: &Locator,
        timeout: Duration,
    ) -> FoldResult<ElementHandle> {
        self.wait_resolved(Some(scope), locator, timeout).await
    }

    async fn wait_hidden(&self, locator: &Locator, timeout: Duration) -> FoldResult<()> {
        let gone = poll_until(timeout, self.poll_interval, || async move {
            match self.resolve(None, locator).await {
                Some(_) => None,
                None => Some(()),
            }
        })
        .await;
        gone.ok_or_else(|| FoldError::timeout(format!("{locator} to close"), timeout))
    }

    async fn wait_enabled(&self, locator: &Locator, timeout: Duration) -> FoldResult<bool> {
        let enabled = poll_until(timeout, self.poll_interval, || async move {
            let el = self.resolve(None, locator).await?;
            match el.attribute("disabled").await {
                Ok(None) => Some(()),
                _ => None,
            }
        })
        .await;
        Ok(enabled.is_some())
    }

    async fn query_all(&self, locator: &Locator) -> FoldResult<Vec<ElementHandle>> {
        let found = self
            .page
            .find_elements(locator.css.as_str())
            .await
            .map_err(|e| FoldError::Script(format!("query {locator}: {e}")))?;
        let mut handles = Vec::with_capacity(found.len());
        for el in found {
            if text_matches(&el, locator).await {
                handles.push(self.register(el).await);
            }
        }
        Ok(handles)
    }

    async fn click(&self, element: &ElementHandle) -> FoldResult<()> {
        let elements = self.elements.lock().await;
        lookup(&elements, element)?
            .click()
            .await
            .map_err(|e| FoldError::Script(format!("click failed: {e}")))?;
        Ok(())
    }

    async fn click_scripted(&self, locator: &Locator) -> FoldResult<bool> {
        self.run_script(locator, ScriptAction::Click).await
    }

    async fn focus_scripted(&self, locator: &Locator) -> FoldResult<bool> {
        self.run_script(locator, ScriptAction::Focus).await
    }

    async fn clear(&self, element: &ElementHandle) -> FoldResult<()> {
        self.call_on(element, script::CLEAR_VALUE_FN).await
    }

    async fn type_incremental(
        &self,
        element: &ElementHandle,
        text: &str,
        per_char_delay: Duration,
    ) -> FoldResult<()> {
        let elements = self.elements.lock().await;
        let el = lookup(&elements, element)?;
        if per_char_delay.is_zero() {
            el.type_str(text)
                .await
                .map_err(|e| FoldError::Script(format!("typing failed: {e}")))?;
            return Ok(());
        }
        for ch in text.chars() {
            el.type_str(ch.to_string())
                .await
                .map_err(|e| FoldError::Script(format!("typing failed: {e}")))?;
            tokio::time::sleep(per_char_delay).await;
        }
        Ok(())
    }

    async fn read_attribute(&self, element: &ElementHandle, name: &str) -> FoldResult<Option<String>> {
        let elements = self.elements.lock().await;
        lookup(&elements, element)?
            .attribute(name)
            .await
            .map_err(|e| FoldError::Script(e.to_string()))
    }

    async fn text_content(&self, element: &ElementHandle) -> FoldResult<String> {
        let elements = self.elements.lock().await;
        let text = lookup(&elements, element)?
            .inner_text()
            .await
            .map_err(|e| FoldError::Script(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn release_handles(&self) {
        self.elements.lock().await.clear();
    }

    async fn download(&self, trigger: &ElementHandle, timeout: Duration) -> FoldResult<ArtifactStream> {
        let guid = self.await_download(trigger, timeout).await?;
        let staged = self.staging_dir.join(guid);
        let file = tokio::fs::File::open(&staged).await.map_err(|e| {
            FoldError::Download(format!("staged file {} unreadable: {e}", staged.display()))
        })?;
        Ok(Box::new(file))
    }
}
