//! Remote form abstraction.
//!
//! Defines the `RemoteForm` trait: the only capability the drivers use to
//! talk to the rendered job service. A concrete implementation wraps a
//! browser page; tests use a scripted in-memory surface.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::config::Locator;
use crate::types::{ElementHandle, FoldResult};

/// Bytes of a completed download, read by the caller and written to disk.
pub type ArtifactStream = Box<dyn AsyncRead + Send + Unpin>;

/// A single stateful, asynchronously rendering page.
///
/// Every wait takes an explicit timeout. Implementations must not block
/// past it.
#[async_trait]
pub trait RemoteForm: Send + Sync {
    /// Wait until an element matching `locator` is visible.
    ///
    /// Fails with `FoldError::Timeout` when the deadline passes.
    async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> FoldResult<ElementHandle>;

    /// Like [`RemoteForm::wait_visible`], searching only below `scope`.
    async fn wait_visible_within(
        &self,
        scope: &ElementHandle,
        locator: &Locator,
        timeout: Duration,
    ) -> FoldResult<ElementHandle>;

    /// Wait until no element matching `locator` is visible.
    async fn wait_hidden(&self, locator: &Locator, timeout: Duration) -> FoldResult<()>;

    /// Wait until the matching element lacks a disabled state. Returns
    /// `false` when it is still disabled (or absent) at the deadline.
    async fn wait_enabled(&self, locator: &Locator, timeout: Duration) -> FoldResult<bool>;

    /// All currently rendered matches, visible or not, in document order.
    async fn query_all(&self, locator: &Locator) -> FoldResult<Vec<ElementHandle>>;

    /// Dispatch a native click.
    async fn click(&self, element: &ElementHandle) -> FoldResult<()>;

    /// Find the element by script and call its `click()` in the page.
    /// Used when the page intercepts native input. Returns `false` when
    /// nothing matched.
    async fn click_scripted(&self, locator: &Locator) -> FoldResult<bool>;

    /// Find the element by script, scroll it into view and focus it.
    async fn focus_scripted(&self, locator: &Locator) -> FoldResult<bool>;

    /// Empty a text field.
    async fn clear(&self, element: &ElementHandle) -> FoldResult<()>;

    /// Type `text` as discrete key events, pausing `per_char_delay`
    /// between characters.
    async fn type_incremental(
        &self,
        element: &ElementHandle,
        text: &str,
        per_char_delay: Duration,
    ) -> FoldResult<()>;

    async fn read_attribute(&self, element: &ElementHandle, name: &str) -> FoldResult<Option<String>>;

    /// Rendered text of the element, untrimmed.
    async fn text_content(&self, element: &ElementHandle) -> FoldResult<String>;

    /// Click `trigger` and wait for the resulting download to complete.
    async fn download(&self, trigger: &ElementHandle, timeout: Duration) -> FoldResult<ArtifactStream>;

    /// Drop every handle issued so far. Later use of an old handle fails
    /// with `FoldError::ElementNotFound`.
    async fn release_handles(&self) {}

    /// Visible match or `None`, for optional steps.
    async fn probe_visible(&self, locator: &Locator, timeout: Duration) -> Option<ElementHandle> {
        self.wait_visible(locator, timeout).await.ok()
    }
}

/// Poll `probe` until it yields a value or `timeout` elapses.
///
/// The probe always runs at least once, even with a zero timeout.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Fixed settle delay for state changes that expose no completion signal.
pub(crate) async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
