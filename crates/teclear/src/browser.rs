//! CDP-backed automation (enabled with the `browser` feature).
//!
//! Real browser control via the Chrome `DevTools` Protocol, using
//! chromiumoxide. [`CdpAutomation`] implements the
//! [`Automation`](crate::capability::Automation) capability: elements are
//! re-resolved per call from the locator's selector expression, keystrokes go
//! through `Input.dispatchKeyEvent` with a configurable inter-key delay, and
//! direct value assignment plus synthetic notifications run as page script.
//!
//! Browser-level dialogs are auto-accepted after being recorded into every
//! registered [`AlertSpy`]; network traffic is forwarded to registered
//! [`RequestBarrier`]s with response status attached.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, EventResponseReceived, RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::{
    DialogType, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::capability::{
    Automation, ElementHandle, ElementState, NotificationKind, Resolution,
};
use crate::config::SuiteConfig;
use crate::dialog::{AlertSpy, DialogKind, ObservedDialog};
use crate::locator::{Locator, Selector};
use crate::network::{CapturedRequest, HttpMethod, RequestBarrier};
use crate::result::{TeclearError, TeclearResult};

/// Polling interval for element state probes
const STATE_POLL_MS: u64 = 50;

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Derive launch settings from the suite configuration
    #[must_use]
    pub fn from_suite(config: &SuiteConfig) -> Self {
        Self {
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            chromium_path: config.chromium_path.clone(),
            ..Self::default()
        }
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Reconstruct a selector from its display form ("#card", "text=OK",
/// ".list-group a[text~Laptops]")
fn selector_from_display(s: &str) -> Selector {
    if let Some(text) = s.strip_prefix("text=") {
        return Selector::text(text);
    }
    if let Some((css, rest)) = s.split_once("[text~") {
        if let Some(text) = rest.strip_suffix(']') {
            return Selector::CssWithText {
                css: css.to_string(),
                text: text.to_string(),
            };
        }
    }
    Selector::css(s)
}

/// Automation capability backed by a live CDP session
#[derive(Debug)]
pub struct CdpAutomation {
    browser: tokio::sync::Mutex<CdpBrowser>,
    page: CdpPage,
    spies: Arc<Mutex<Vec<AlertSpy>>>,
    barriers: Arc<Mutex<Vec<RequestBarrier>>>,
    started: Instant,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl CdpAutomation {
    /// Launch a browser and open a blank page
    pub async fn launch(config: BrowserConfig) -> TeclearResult<Self> {
        let mut builder =
            CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(|e| TeclearError::BrowserLaunch {
            message: e.to_string(),
        })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| TeclearError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(TeclearError::capability)?;
        page.execute(EnableParams::default())
            .await
            .map_err(TeclearError::capability)?;

        let spies: Arc<Mutex<Vec<AlertSpy>>> = Arc::new(Mutex::new(Vec::new()));
        let barriers: Arc<Mutex<Vec<RequestBarrier>>> = Arc::new(Mutex::new(Vec::new()));
        let started = Instant::now();

        let mut tasks = vec![handler_task];
        tasks.push(Self::spawn_dialog_listener(&page, spies.clone()).await?);
        tasks.extend(Self::spawn_network_listeners(&page, barriers.clone(), started).await?);

        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            page,
            spies,
            barriers,
            started,
            tasks,
        })
    }

    /// Close the browser and stop the event listeners
    pub async fn close(self) -> TeclearResult<()> {
        for task in &self.tasks {
            task.abort();
        }
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(TeclearError::capability)?;
        Ok(())
    }

    async fn spawn_dialog_listener(
        page: &CdpPage,
        spies: Arc<Mutex<Vec<AlertSpy>>>,
    ) -> TeclearResult<tokio::task::JoinHandle<()>> {
        let mut events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(TeclearError::capability)?;
        let page = page.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let kind = match event.r#type {
                    DialogType::Confirm => DialogKind::Confirm,
                    DialogType::Prompt => DialogKind::Prompt,
                    _ => DialogKind::Alert,
                };
                debug!(%kind, message = %event.message, "dialog observed");
                let dialog = ObservedDialog {
                    kind,
                    message: event.message.clone(),
                };
                if let Ok(spies) = spies.lock() {
                    for spy in spies.iter() {
                        spy.record(dialog.clone());
                    }
                }

                match HandleJavaScriptDialogParams::builder().accept(true).build() {
                    Ok(params) => {
                        if let Err(e) = page.execute(params).await {
                            warn!(error = %e, "failed to dismiss dialog");
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to build dialog handling command"),
                }
            }
        }))
    }

    async fn spawn_network_listeners(
        page: &CdpPage,
        barriers: Arc<Mutex<Vec<RequestBarrier>>>,
        started: Instant,
    ) -> TeclearResult<Vec<tokio::task::JoinHandle<()>>> {
        let pending: Arc<Mutex<HashMap<RequestId, (HttpMethod, String)>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(TeclearError::capability)?;
        let request_map = pending.clone();
        let request_task = tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                if let Ok(mut map) = request_map.lock() {
                    map.insert(
                        event.request_id.clone(),
                        (
                            HttpMethod::parse(&event.request.method),
                            event.request.url.clone(),
                        ),
                    );
                }
            }
        });

        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(TeclearError::capability)?;
        let response_task = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let sent = pending
                    .lock()
                    .ok()
                    .and_then(|mut map| map.remove(&event.request_id));
                let Some((method, url)) = sent else {
                    continue;
                };
                let timestamp_ms =
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                let status = u16::try_from(event.response.status).unwrap_or(0);
                let request =
                    CapturedRequest::new(method, url, timestamp_ms).with_status(status);
                if let Ok(barriers) = barriers.lock() {
                    for barrier in barriers.iter() {
                        barrier.record(request.clone());
                    }
                }
            }
        });

        Ok(vec![request_task, response_task])
    }

    /// JS expression resolving the handle's element
    fn query(handle: &ElementHandle) -> String {
        selector_from_display(&handle.selector).to_query()
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, expr: &str) -> TeclearResult<T> {
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(TeclearError::capability)?;
        result.into_value().map_err(TeclearError::capability)
    }

    /// Run page script against the handle's element, failing if it detached
    async fn eval_on<T: serde::de::DeserializeOwned>(
        &self,
        handle: &ElementHandle,
        body: &str,
    ) -> TeclearResult<T> {
        let expr = format!(
            "(() => {{ const el = {}; if (!el) return null; return ({body}); }})()",
            Self::query(handle)
        );
        let value: Option<T> = self.eval(&expr).await?;
        value.ok_or_else(|| TeclearError::ElementNotFound {
            locator: handle.selector.clone(),
        })
    }

    async fn wait_state(
        &self,
        handle: &ElementHandle,
        timeout: Duration,
        body: &str,
    ) -> TeclearResult<()> {
        let start = Instant::now();
        loop {
            if self.eval_on::<bool>(handle, body).await? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(TeclearError::Timeout {
                    ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(Duration::from_millis(STATE_POLL_MS)).await;
        }
    }
}

const VISIBLE_PROBE: &str = "(() => { const r = el.getBoundingClientRect(); \
     const s = window.getComputedStyle(el); \
     return r.width > 0 && r.height > 0 && \
     s.visibility !== 'hidden' && s.display !== 'none'; })()";

#[async_trait]
impl Automation for CdpAutomation {
    async fn goto(&self, url: &str) -> TeclearResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| TeclearError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn resolve(&self, locator: &Locator) -> TeclearResult<Resolution> {
        let count: u64 = self.eval(&locator.selector().to_count_query()).await?;
        Ok(match count {
            0 => Resolution::NotFound,
            1 => Resolution::Found(ElementHandle::new(locator.to_string())),
            n => Resolution::Ambiguous(usize::try_from(n).unwrap_or(usize::MAX)),
        })
    }

    async fn wait_visible(&self, handle: &ElementHandle, timeout: Duration) -> TeclearResult<()> {
        self.wait_state(handle, timeout, VISIBLE_PROBE).await
    }

    async fn wait_enabled(&self, handle: &ElementHandle, timeout: Duration) -> TeclearResult<()> {
        self.wait_state(handle, timeout, "!el.disabled").await
    }

    async fn scroll_into_view(&self, handle: &ElementHandle) -> TeclearResult<()> {
        self.eval_on::<bool>(handle, "(el.scrollIntoView({ block: 'center' }), true)")
            .await?;
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> TeclearResult<()> {
        self.eval_on::<bool>(handle, "(el.click(), true)").await?;
        Ok(())
    }

    async fn clear(&self, handle: &ElementHandle) -> TeclearResult<()> {
        self.eval_on::<bool>(
            handle,
            "(el.value = '', \
             el.dispatchEvent(new Event('input', { bubbles: true })), true)",
        )
        .await?;
        Ok(())
    }

    async fn type_sequential(
        &self,
        handle: &ElementHandle,
        text: &str,
        inter_key_delay: Duration,
    ) -> TeclearResult<()> {
        self.eval_on::<bool>(handle, "(el.focus(), true)").await?;
        for ch in text.chars() {
            let params = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::Char)
                .text(ch.to_string())
                .build()
                .map_err(TeclearError::capability)?;
            self.page
                .execute(params)
                .await
                .map_err(TeclearError::capability)?;
            tokio::time::sleep(inter_key_delay).await;
        }
        Ok(())
    }

    async fn read_value(&self, handle: &ElementHandle) -> TeclearResult<String> {
        self.eval_on(handle, "String(el.value ?? '')").await
    }

    async fn set_value_direct(&self, handle: &ElementHandle, value: &str) -> TeclearResult<()> {
        let literal = serde_json::to_string(value)?;
        self.eval_on::<bool>(handle, &format!("(el.value = {literal}, true)"))
            .await?;
        Ok(())
    }

    async fn dispatch_notification(
        &self,
        handle: &ElementHandle,
        kind: NotificationKind,
    ) -> TeclearResult<()> {
        self.eval_on::<bool>(
            handle,
            &format!(
                "(el.dispatchEvent(new Event('{}', {{ bubbles: true }})), true)",
                kind.event_name()
            ),
        )
        .await?;
        Ok(())
    }

    async fn text_of(&self, handle: &ElementHandle) -> TeclearResult<String> {
        self.eval_on(handle, "(el.textContent ?? '').trim()").await
    }

    async fn state_of(&self, handle: &ElementHandle) -> TeclearResult<ElementState> {
        let body = format!(
            "({{ visible: {VISIBLE_PROBE}, enabled: !el.disabled, \
             current_value: String(el.value ?? '') }})"
        );
        self.eval_on(handle, &body).await
    }

    async fn is_visible(&self, handle: &ElementHandle) -> TeclearResult<bool> {
        let expr = format!(
            "(() => {{ const el = {}; if (!el) return false; return {VISIBLE_PROBE}; }})()",
            Self::query(handle)
        );
        self.eval(&expr).await
    }

    async fn observe_dialogs(&self, spy: &AlertSpy) -> TeclearResult<()> {
        self.spies
            .lock()
            .map_err(|_| TeclearError::capability("dialog spy registry poisoned"))?
            .push(spy.clone());
        Ok(())
    }

    async fn observe_requests(&self, barrier: &RequestBarrier) -> TeclearResult<()> {
        self.barriers
            .lock()
            .map_err(|_| TeclearError::capability("request barrier registry poisoned"))?
            .push(barrier.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_round_trips_from_display() {
        assert_eq!(
            selector_from_display("#loginusername"),
            Selector::css("#loginusername")
        );
        assert_eq!(
            selector_from_display("text=Place Order"),
            Selector::text("Place Order")
        );
        assert_eq!(
            selector_from_display(".list-group a[text~Laptops]"),
            Selector::CssWithText {
                css: ".list-group a".to_string(),
                text: "Laptops".to_string(),
            }
        );
    }

    #[test]
    fn test_browser_config_builders() {
        let config = BrowserConfig::default()
            .with_viewport(1280, 800)
            .with_headless(false)
            .with_no_sandbox();
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.viewport_width, 1280);
    }

    #[test]
    fn test_browser_config_from_suite() {
        let suite = SuiteConfig::new().with_viewport(1024, 768);
        let config = BrowserConfig::from_suite(&suite);
        assert_eq!(
            (config.viewport_width, config.viewport_height),
            (1024, 768)
        );
        assert!(config.headless);
    }
}
