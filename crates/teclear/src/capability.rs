//! Abstract automation capability.
//!
//! The synchronizer and page objects never talk to a browser directly; they
//! drive an [`Automation`] implementation. This keeps the retry protocol
//! testable against a scripted backend ([`crate::mock::ScriptedAutomation`])
//! and swappable onto CDP ([`crate::browser`] with the `browser` feature).
//!
//! The execution model is single-threaded and cooperative: one action is
//! issued at a time and every wait is bounded by a timeout. Callers hold
//! exclusive access to the element for the duration of a synchronization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::dialog::AlertSpy;
use crate::locator::Locator;
use crate::network::RequestBarrier;
use crate::result::{TeclearError, TeclearResult};

/// Handle to a resolved DOM element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Unique identifier for this resolution
    pub id: String,
    /// The selector expression the element was resolved from
    pub selector: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            selector: selector.into(),
        }
    }
}

/// Externally-observed state of a resolved element at a point in time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementState {
    /// Whether the element is visible
    pub visible: bool,
    /// Whether the element is enabled
    pub enabled: bool,
    /// Current value property
    pub current_value: String,
}

/// Outcome of resolving a locator
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Exactly one element matched
    Found(ElementHandle),
    /// No element matched
    NotFound,
    /// More than one element matched (strict mode violation)
    Ambiguous(usize),
}

/// Kind of synthetic DOM notification dispatched after a direct value
/// assignment, so reactive listeners still observe the mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// `input` event
    Input,
    /// `change` event
    Change,
}

impl NotificationKind {
    /// DOM event name
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Change => "change",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

/// Automation capability: the external surface the synchronizer and page
/// objects depend on.
#[async_trait]
pub trait Automation: Send + Sync {
    /// Navigate to a URL
    async fn goto(&self, url: &str) -> TeclearResult<()>;

    /// Resolve a locator to zero-or-more live elements (single probe)
    async fn resolve(&self, locator: &Locator) -> TeclearResult<Resolution>;

    /// Wait until the element is visible, bounded by `timeout`
    async fn wait_visible(&self, handle: &ElementHandle, timeout: Duration) -> TeclearResult<()>;

    /// Wait until the element is enabled, bounded by `timeout`
    async fn wait_enabled(&self, handle: &ElementHandle, timeout: Duration) -> TeclearResult<()>;

    /// Bring the element into view
    async fn scroll_into_view(&self, handle: &ElementHandle) -> TeclearResult<()>;

    /// Focus the element via a simulated pointer action
    async fn click(&self, handle: &ElementHandle) -> TeclearResult<()>;

    /// Clear the element's existing value
    async fn clear(&self, handle: &ElementHandle) -> TeclearResult<()>;

    /// Simulate sequential keystroke input with a delay between keystrokes
    async fn type_sequential(
        &self,
        handle: &ElementHandle,
        text: &str,
        inter_key_delay: Duration,
    ) -> TeclearResult<()>;

    /// Read the element's current value property
    async fn read_value(&self, handle: &ElementHandle) -> TeclearResult<String>;

    /// Assign the value property directly, bypassing keystroke simulation
    async fn set_value_direct(&self, handle: &ElementHandle, value: &str) -> TeclearResult<()>;

    /// Dispatch a synthetic DOM notification on the element
    async fn dispatch_notification(
        &self,
        handle: &ElementHandle,
        kind: NotificationKind,
    ) -> TeclearResult<()>;

    /// Read the element's text content
    async fn text_of(&self, handle: &ElementHandle) -> TeclearResult<String>;

    /// Probe the element's externally-observed state in one call
    async fn state_of(&self, handle: &ElementHandle) -> TeclearResult<ElementState>;

    /// Check whether the element is currently visible
    async fn is_visible(&self, handle: &ElementHandle) -> TeclearResult<bool>;

    /// Register an injected dialog spy; subsequent browser-level dialogs are
    /// recorded into its call log
    async fn observe_dialogs(&self, spy: &AlertSpy) -> TeclearResult<()>;

    /// Register a request barrier; subsequent outgoing requests matching the
    /// barrier's pattern are recorded into it
    async fn observe_requests(&self, barrier: &RequestBarrier) -> TeclearResult<()>;
}

/// Resolve a locator to exactly one element, polling until the locator's
/// discovery timeout elapses.
///
/// `NotFound` is retried (the element may still be attaching); `Ambiguous`
/// fails immediately in strict mode since waiting cannot make a selector
/// less ambiguous.
pub async fn resolve_one<A: Automation + ?Sized>(
    automation: &A,
    locator: &Locator,
) -> TeclearResult<ElementHandle> {
    let opts = locator.options();
    let start = Instant::now();

    loop {
        match automation.resolve(locator).await? {
            Resolution::Found(handle) => return Ok(handle),
            Resolution::Ambiguous(count) => {
                if opts.strict {
                    return Err(TeclearError::AmbiguousLocator {
                        locator: locator.to_string(),
                        count,
                    });
                }
                // Non-strict: first match wins.
                return Ok(ElementHandle::new(locator.to_string()));
            }
            Resolution::NotFound => {}
        }

        if start.elapsed() >= opts.timeout {
            return Err(TeclearError::ElementNotFound {
                locator: locator.to_string(),
            });
        }
        tokio::time::sleep(opts.poll_interval).await;
    }
}

/// Resolve and click in one step
pub async fn click_on<A: Automation + ?Sized>(
    automation: &A,
    locator: &Locator,
) -> TeclearResult<()> {
    let handle = resolve_one(automation, locator).await?;
    automation.click(&handle).await
}

/// Resolve and read text content in one step
pub async fn text_on<A: Automation + ?Sized>(
    automation: &A,
    locator: &Locator,
) -> TeclearResult<String> {
    let handle = resolve_one(automation, locator).await?;
    automation.text_of(&handle).await
}

/// Resolve and wait for visibility in one step
pub async fn wait_visible_on<A: Automation + ?Sized>(
    automation: &A,
    locator: &Locator,
    timeout: Duration,
) -> TeclearResult<ElementHandle> {
    let handle = resolve_one(automation, locator).await?;
    automation.wait_visible(&handle, timeout).await?;
    Ok(handle)
}

/// Whether a locator currently resolves to a visible element. Unlike
/// [`resolve_one`] this never waits; it is the "act only if present" probe
/// used for conditional cleanup steps.
pub async fn visible_now<A: Automation + ?Sized>(
    automation: &A,
    locator: &Locator,
) -> TeclearResult<bool> {
    match automation.resolve(locator).await? {
        Resolution::Found(handle) => automation.is_visible(&handle).await,
        Resolution::NotFound | Resolution::Ambiguous(_) => Ok(false),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_kind_event_names() {
        assert_eq!(NotificationKind::Input.event_name(), "input");
        assert_eq!(NotificationKind::Change.event_name(), "change");
    }

    #[test]
    fn test_element_handle_ids_are_unique() {
        let a = ElementHandle::new("#name");
        let b = ElementHandle::new("#name");
        assert_ne!(a.id, b.id);
        assert_eq!(a.selector, b.selector);
    }

    #[test]
    fn test_element_state_default() {
        let state = ElementState::default();
        assert!(!state.visible);
        assert!(!state.enabled);
        assert!(state.current_value.is_empty());
    }
}
