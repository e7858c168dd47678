//! Scripted automation backend for tests.
//!
//! [`ScriptedAutomation`] implements the full [`Automation`] capability
//! against an in-memory element table. Each element carries an
//! [`InputBehavior`] scripting how its input listener reacts to keystrokes
//! and direct assignment, which is what the synchronizer's escalation ladder
//! is exercised against. Every capability call is appended to an action log
//! so tests can assert on side effects, not just final values.
//!
//! The element table is keyed by the `Display` form of the selector
//! (`"#name"` for CSS, `".card-title[text~Sony vaio i5]"` for text-filtered
//! selectors).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::capability::{Automation, ElementHandle, ElementState, NotificationKind, Resolution};
use crate::dialog::{AlertSpy, ObservedDialog};
use crate::locator::Locator;
use crate::network::{CapturedRequest, HttpMethod, RequestBarrier};
use crate::result::{TeclearError, TeclearResult};

/// How a scripted element's input listener reacts to mutation attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputBehavior {
    /// Accepts keystrokes at any cadence and direct assignment
    AcceptAll,
    /// Drops keystrokes typed faster than `min_delay` between keys
    DropFastKeystrokes {
        /// Minimum inter-keystroke delay the listener keeps up with
        min_delay: Duration,
    },
    /// Drops all typed input; only direct assignment lands
    DropTyped,
    /// Drops typed input and silently ignores direct assignment too
    IgnoreDirectAssign,
    /// Ignores every mutation attempt
    Unresponsive,
}

/// A scripted DOM element
#[derive(Debug, Clone)]
pub struct ScriptedElement {
    /// Whether the element is visible
    pub visible: bool,
    /// Whether the element is enabled
    pub enabled: bool,
    /// Current value property
    pub value: String,
    /// Text content (for labels, banners, receipt popups)
    pub text: String,
    /// Input listener behavior
    pub behavior: InputBehavior,
}

impl ScriptedElement {
    /// A visible, enabled, empty input with the given listener behavior
    #[must_use]
    pub fn input(behavior: InputBehavior) -> Self {
        Self {
            visible: true,
            enabled: true,
            value: String::new(),
            text: String::new(),
            behavior,
        }
    }

    /// A visible display element (banner, title, cell) with text content
    #[must_use]
    pub fn text_node(text: impl Into<String>) -> Self {
        Self {
            visible: true,
            enabled: true,
            value: String::new(),
            text: text.into(),
            behavior: InputBehavior::AcceptAll,
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// One recorded capability call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRecord {
    /// Navigation
    Navigated {
        /// Target URL
        url: String,
    },
    /// Scroll into view
    ScrolledIntoView {
        /// Element selector
        selector: String,
    },
    /// Pointer click
    Clicked {
        /// Element selector
        selector: String,
    },
    /// Value cleared
    Cleared {
        /// Element selector
        selector: String,
    },
    /// Sequential keystrokes
    Typed {
        /// Element selector
        selector: String,
        /// Text typed
        text: String,
        /// Inter-keystroke delay used
        delay: Duration,
    },
    /// Direct value assignment
    SetValueDirect {
        /// Element selector
        selector: String,
        /// Assigned value
        value: String,
    },
    /// Synthetic notification dispatch
    Dispatched {
        /// Element selector
        selector: String,
        /// Notification kind
        kind: NotificationKind,
    },
}

/// In-memory automation capability with scripted element behavior
#[derive(Debug, Default)]
pub struct ScriptedAutomation {
    elements: Mutex<HashMap<String, ScriptedElement>>,
    ambiguous: Mutex<HashMap<String, usize>>,
    log: Mutex<Vec<ActionRecord>>,
    spies: Mutex<Vec<AlertSpy>>,
    barriers: Mutex<Vec<RequestBarrier>>,
    current_url: Mutex<Option<String>>,
    started: Option<Instant>,
}

impl ScriptedAutomation {
    /// Create an empty scripted backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Some(Instant::now()),
            ..Self::default()
        }
    }

    /// Register an element under a selector key
    pub fn add_element(&self, selector: impl Into<String>, element: ScriptedElement) {
        if let Ok(mut elements) = self.elements.lock() {
            elements.insert(selector.into(), element);
        }
    }

    /// Script a selector that matches `count` elements (strict-mode failure)
    pub fn add_ambiguous(&self, selector: impl Into<String>, count: usize) {
        if let Ok(mut ambiguous) = self.ambiguous.lock() {
            ambiguous.insert(selector.into(), count);
        }
    }

    /// Remove an element (e.g., a dismissed modal)
    pub fn remove_element(&self, selector: &str) {
        if let Ok(mut elements) = self.elements.lock() {
            elements.remove(selector);
        }
    }

    /// Mutate a registered element in place
    pub fn update_element<F: FnOnce(&mut ScriptedElement)>(&self, selector: &str, f: F) {
        if let Ok(mut elements) = self.elements.lock() {
            if let Some(element) = elements.get_mut(selector) {
                f(element);
            }
        }
    }

    /// Current value of a registered element
    #[must_use]
    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.elements
            .lock()
            .ok()
            .and_then(|e| e.get(selector).map(|el| el.value.clone()))
    }

    /// Snapshot of the action log
    #[must_use]
    pub fn action_log(&self) -> Vec<ActionRecord> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// URL of the last navigation, if any
    #[must_use]
    pub fn current_url(&self) -> Option<String> {
        self.current_url.lock().ok().and_then(|u| u.clone())
    }

    /// Deliver a browser-level alert to every registered spy
    pub fn emit_alert(&self, message: impl Into<String>) {
        let dialog = ObservedDialog::alert(message);
        if let Ok(spies) = self.spies.lock() {
            for spy in spies.iter() {
                spy.record(dialog.clone());
            }
        }
    }

    /// Deliver an outgoing request to every registered barrier
    pub fn emit_request(&self, method: HttpMethod, url: &str, status: u16) {
        let timestamp_ms = self
            .started
            .map(|s| u64::try_from(s.elapsed().as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        let request = CapturedRequest::new(method, url, timestamp_ms).with_status(status);
        if let Ok(barriers) = self.barriers.lock() {
            for barrier in barriers.iter() {
                barrier.record(request.clone());
            }
        }
    }

    fn record(&self, action: ActionRecord) {
        if let Ok(mut log) = self.log.lock() {
            log.push(action);
        }
    }

    fn with_element<T, F>(&self, handle: &ElementHandle, f: F) -> TeclearResult<T>
    where
        F: FnOnce(&mut ScriptedElement) -> T,
    {
        let mut elements = self
            .elements
            .lock()
            .map_err(|_| TeclearError::capability("element table poisoned"))?;
        let element = elements
            .get_mut(&handle.selector)
            .ok_or_else(|| TeclearError::ElementNotFound {
                locator: handle.selector.clone(),
            })?;
        Ok(f(element))
    }

    async fn wait_state(
        &self,
        handle: &ElementHandle,
        timeout: Duration,
        probe: fn(&ScriptedElement) -> bool,
    ) -> TeclearResult<()> {
        let start = Instant::now();
        loop {
            if self.with_element(handle, |el| probe(el))? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(TeclearError::Timeout {
                    ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Automation for ScriptedAutomation {
    async fn goto(&self, url: &str) -> TeclearResult<()> {
        if let Ok(mut current) = self.current_url.lock() {
            *current = Some(url.to_string());
        }
        self.record(ActionRecord::Navigated {
            url: url.to_string(),
        });
        Ok(())
    }

    async fn resolve(&self, locator: &Locator) -> TeclearResult<Resolution> {
        let key = locator.to_string();
        if let Ok(ambiguous) = self.ambiguous.lock() {
            if let Some(&count) = ambiguous.get(&key) {
                return Ok(Resolution::Ambiguous(count));
            }
        }
        let found = self
            .elements
            .lock()
            .map(|e| e.contains_key(&key))
            .unwrap_or(false);
        if found {
            Ok(Resolution::Found(ElementHandle::new(key)))
        } else {
            Ok(Resolution::NotFound)
        }
    }

    async fn wait_visible(&self, handle: &ElementHandle, timeout: Duration) -> TeclearResult<()> {
        self.wait_state(handle, timeout, |el| el.visible).await
    }

    async fn wait_enabled(&self, handle: &ElementHandle, timeout: Duration) -> TeclearResult<()> {
        self.wait_state(handle, timeout, |el| el.enabled).await
    }

    async fn scroll_into_view(&self, handle: &ElementHandle) -> TeclearResult<()> {
        self.record(ActionRecord::ScrolledIntoView {
            selector: handle.selector.clone(),
        });
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> TeclearResult<()> {
        self.with_element(handle, |_| ())?;
        self.record(ActionRecord::Clicked {
            selector: handle.selector.clone(),
        });
        Ok(())
    }

    async fn clear(&self, handle: &ElementHandle) -> TeclearResult<()> {
        self.with_element(handle, |el| {
            if el.behavior != InputBehavior::Unresponsive {
                el.value.clear();
            }
        })?;
        self.record(ActionRecord::Cleared {
            selector: handle.selector.clone(),
        });
        Ok(())
    }

    async fn type_sequential(
        &self,
        handle: &ElementHandle,
        text: &str,
        inter_key_delay: Duration,
    ) -> TeclearResult<()> {
        self.with_element(handle, |el| match el.behavior {
            InputBehavior::AcceptAll => el.value.push_str(text),
            InputBehavior::DropFastKeystrokes { min_delay } => {
                if inter_key_delay >= min_delay {
                    el.value.push_str(text);
                }
            }
            InputBehavior::DropTyped
            | InputBehavior::IgnoreDirectAssign
            | InputBehavior::Unresponsive => {}
        })?;
        self.record(ActionRecord::Typed {
            selector: handle.selector.clone(),
            text: text.to_string(),
            delay: inter_key_delay,
        });
        Ok(())
    }

    async fn read_value(&self, handle: &ElementHandle) -> TeclearResult<String> {
        self.with_element(handle, |el| el.value.clone())
    }

    async fn set_value_direct(&self, handle: &ElementHandle, value: &str) -> TeclearResult<()> {
        self.with_element(handle, |el| {
            if !matches!(
                el.behavior,
                InputBehavior::Unresponsive | InputBehavior::IgnoreDirectAssign
            ) {
                el.value = value.to_string();
            }
        })?;
        self.record(ActionRecord::SetValueDirect {
            selector: handle.selector.clone(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn dispatch_notification(
        &self,
        handle: &ElementHandle,
        kind: NotificationKind,
    ) -> TeclearResult<()> {
        self.with_element(handle, |_| ())?;
        self.record(ActionRecord::Dispatched {
            selector: handle.selector.clone(),
            kind,
        });
        Ok(())
    }

    async fn text_of(&self, handle: &ElementHandle) -> TeclearResult<String> {
        self.with_element(handle, |el| el.text.clone())
    }

    async fn is_visible(&self, handle: &ElementHandle) -> TeclearResult<bool> {
        self.with_element(handle, |el| el.visible)
    }

    async fn state_of(&self, handle: &ElementHandle) -> TeclearResult<ElementState> {
        self.with_element(handle, |el| ElementState {
            visible: el.visible,
            enabled: el.enabled,
            current_value: el.value.clone(),
        })
    }

    async fn observe_dialogs(&self, spy: &AlertSpy) -> TeclearResult<()> {
        if let Ok(mut spies) = self.spies.lock() {
            spies.push(spy.clone());
        }
        Ok(())
    }

    async fn observe_requests(&self, barrier: &RequestBarrier) -> TeclearResult<()> {
        if let Ok(mut barriers) = self.barriers.lock() {
            barriers.push(barrier.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::network::UrlPattern;

    #[tokio::test]
    async fn test_resolve_states() {
        let automation = ScriptedAutomation::new();
        automation.add_element("#a", ScriptedElement::input(InputBehavior::AcceptAll));
        automation.add_ambiguous(".many", 3);

        assert!(matches!(
            automation.resolve(&Locator::new("#a")).await.unwrap(),
            Resolution::Found(_)
        ));
        assert!(matches!(
            automation.resolve(&Locator::new(".many")).await.unwrap(),
            Resolution::Ambiguous(3)
        ));
        assert!(matches!(
            automation.resolve(&Locator::new("#b")).await.unwrap(),
            Resolution::NotFound
        ));
    }

    #[tokio::test]
    async fn test_drop_fast_keystrokes_respects_cadence() {
        let automation = ScriptedAutomation::new();
        automation.add_element(
            "#f",
            ScriptedElement::input(InputBehavior::DropFastKeystrokes {
                min_delay: Duration::from_millis(50),
            }),
        );
        let handle = ElementHandle::new("#f");

        automation
            .type_sequential(&handle, "fast", Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(automation.value_of("#f").unwrap(), "");

        automation
            .type_sequential(&handle, "slow", Duration::from_millis(60))
            .await
            .unwrap();
        assert_eq!(automation.value_of("#f").unwrap(), "slow");
    }

    #[tokio::test]
    async fn test_state_of_reflects_element_table() {
        let automation = ScriptedAutomation::new();
        automation.add_element(
            "#f",
            ScriptedElement::input(InputBehavior::AcceptAll).with_visible(false),
        );
        automation.update_element("#f", |el| el.value = "x".to_string());

        let state = automation
            .state_of(&ElementHandle::new("#f"))
            .await
            .unwrap();
        assert!(!state.visible);
        assert!(state.enabled);
        assert_eq!(state.current_value, "x");
    }

    #[tokio::test]
    async fn test_emit_alert_reaches_registered_spies() {
        let automation = ScriptedAutomation::new();
        let spy = AlertSpy::new();
        automation.observe_dialogs(&spy).await.unwrap();
        automation.emit_alert("Product added.");
        assert!(spy.was_called());
    }

    #[tokio::test]
    async fn test_emit_request_reaches_matching_barriers() {
        let automation = ScriptedAutomation::new();
        let barrier = RequestBarrier::new(HttpMethod::Post, UrlPattern::Contains("bycat".into()));
        automation.observe_requests(&barrier).await.unwrap();

        automation.emit_request(HttpMethod::Post, "https://api/bycat", 200);
        automation.emit_request(HttpMethod::Post, "https://api/other", 200);
        assert_eq!(barrier.count(), 1);
    }

    #[tokio::test]
    async fn test_wait_visible_observes_later_mutation() {
        let automation = std::sync::Arc::new(ScriptedAutomation::new());
        automation.add_element(
            "#modal",
            ScriptedElement::input(InputBehavior::AcceptAll).with_visible(false),
        );

        let mutator = automation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            mutator.update_element("#modal", |el| el.visible = true);
        });

        let handle = ElementHandle::new("#modal");
        automation
            .wait_visible(&handle, Duration::from_millis(500))
            .await
            .unwrap();
    }
}
