//! Resilient input synchronization.
//!
//! Real input widgets backed by reactive frameworks can silently drop
//! programmatically-dispatched keystrokes under timing pressure. This module
//! guarantees that an element's value equals the desired value before
//! returning, using escalating strategies, each attempted once, in order:
//!
//! 1. Sequential keystrokes at a moderate cadence (default 60ms between keys).
//! 2. Refocus and retype at a slower cadence (default 90ms), for frameworks
//!    whose input listeners drop fast keystrokes.
//! 3. Direct value assignment followed by synthetic `input` and `change`
//!    notifications, so reactive listeners still observe the mutation.
//!
//! Every path ends with a hard read-back assertion: the element's current
//! value must strictly equal the desired value (string equality, no trimming)
//! or the call fails with [`TeclearError::ValueMismatch`]. A silent mismatch
//! can never pass undetected.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::capability::{resolve_one, Automation, ElementHandle, NotificationKind};
use crate::locator::Locator;
use crate::result::{TeclearError, TeclearResult};

/// Default delay between keystrokes on the first attempt (60ms). The delay
/// exists to satisfy input frameworks that rely on per-keystroke events
/// rather than bulk paste.
pub const DEFAULT_FIRST_KEY_DELAY_MS: u64 = 60;

/// Default delay between keystrokes on the retry attempt (90ms)
pub const DEFAULT_RETRY_KEY_DELAY_MS: u64 = 90;

/// Default bound on each readiness wait (visible, enabled)
pub const DEFAULT_READINESS_TIMEOUT_MS: u64 = 8000;

/// Options for a synchronization attempt.
///
/// The delay constants are empirically tuned rather than derived, so they are
/// configuration with stated defaults, not hardcoded constants. The
/// three-strategy ladder itself is fixed: it is what bounds the protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Inter-keystroke delay for the first typed attempt
    pub first_key_delay_ms: u64,
    /// Inter-keystroke delay for the slower retry (must exceed the first)
    pub retry_key_delay_ms: u64,
    /// Bound on each readiness wait
    pub readiness_timeout_ms: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            first_key_delay_ms: DEFAULT_FIRST_KEY_DELAY_MS,
            retry_key_delay_ms: DEFAULT_RETRY_KEY_DELAY_MS,
            readiness_timeout_ms: DEFAULT_READINESS_TIMEOUT_MS,
        }
    }
}

impl SyncOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first-attempt keystroke delay
    #[must_use]
    pub const fn with_first_key_delay(mut self, ms: u64) -> Self {
        self.first_key_delay_ms = ms;
        self
    }

    /// Set the retry keystroke delay
    #[must_use]
    pub const fn with_retry_key_delay(mut self, ms: u64) -> Self {
        self.retry_key_delay_ms = ms;
        self
    }

    /// Set the readiness wait bound
    #[must_use]
    pub const fn with_readiness_timeout(mut self, ms: u64) -> Self {
        self.readiness_timeout_ms = ms;
        self
    }

    /// First-attempt delay as Duration
    #[must_use]
    pub const fn first_key_delay(&self) -> Duration {
        Duration::from_millis(self.first_key_delay_ms)
    }

    /// Retry delay as Duration
    #[must_use]
    pub const fn retry_key_delay(&self) -> Duration {
        Duration::from_millis(self.retry_key_delay_ms)
    }

    /// Readiness bound as Duration
    #[must_use]
    pub const fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }
}

/// Which strategy made the element converge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// First attempt: sequential keystrokes at the moderate cadence
    TypedModerate,
    /// Second attempt: refocus and retype at the slower cadence
    TypedSlow,
    /// Third attempt: direct assignment plus synthetic notifications
    DirectAssign,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypedModerate => write!(f, "typed-moderate"),
            Self::TypedSlow => write!(f, "typed-slow"),
            Self::DirectAssign => write!(f, "direct-assign"),
        }
    }
}

/// Report of a successful synchronization
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The strategy that converged
    pub strategy: Strategy,
    /// Total time spent
    pub elapsed: Duration,
}

/// Guarantee that the element located by `locator` has value `desired` before
/// returning, or report failure.
///
/// Preconditions: the locator must resolve to exactly one element within its
/// discovery timeout ([`TeclearError::ElementNotFound`] /
/// [`TeclearError::AmbiguousLocator`] otherwise; no interaction is attempted
/// on resolution failure).
///
/// Postcondition on `Ok`: a read-back of the element's value strictly equals
/// `desired`.
pub async fn synchronize<A: Automation + ?Sized>(
    automation: &A,
    locator: &Locator,
    desired: &str,
    options: &SyncOptions,
) -> TeclearResult<SyncReport> {
    let start = Instant::now();
    let handle = resolve_one(automation, locator).await?;

    automation
        .wait_visible(&handle, options.readiness_timeout())
        .await?;
    automation
        .wait_enabled(&handle, options.readiness_timeout())
        .await?;
    automation.scroll_into_view(&handle).await?;

    // Attempt 1: moderate cadence
    let value = type_and_read(automation, &handle, desired, options.first_key_delay()).await?;
    if value == desired {
        debug!(locator = %locator, strategy = %Strategy::TypedModerate, "input converged");
        return Ok(SyncReport {
            strategy: Strategy::TypedModerate,
            elapsed: start.elapsed(),
        });
    }

    // Attempt 2: slower cadence for listeners that drop fast keystrokes
    debug!(locator = %locator, read_back = %value, "retyping at slower cadence");
    let value = type_and_read(automation, &handle, desired, options.retry_key_delay()).await?;
    if value == desired {
        debug!(locator = %locator, strategy = %Strategy::TypedSlow, "input converged");
        return Ok(SyncReport {
            strategy: Strategy::TypedSlow,
            elapsed: start.elapsed(),
        });
    }

    // Attempt 3: bypass keystroke simulation entirely
    debug!(locator = %locator, read_back = %value, "falling back to direct assignment");
    automation.set_value_direct(&handle, desired).await?;
    automation
        .dispatch_notification(&handle, NotificationKind::Input)
        .await?;
    automation
        .dispatch_notification(&handle, NotificationKind::Change)
        .await?;

    let actual = automation.read_value(&handle).await?;
    if actual == desired {
        debug!(locator = %locator, strategy = %Strategy::DirectAssign, "input converged");
        return Ok(SyncReport {
            strategy: Strategy::DirectAssign,
            elapsed: start.elapsed(),
        });
    }

    if let Ok(state) = automation.state_of(&handle).await {
        debug!(
            locator = %locator,
            visible = state.visible,
            enabled = state.enabled,
            "element state after exhausting all strategies"
        );
    }
    Err(TeclearError::ValueMismatch {
        expected: desired.to_string(),
        actual,
    })
}

/// One typed attempt: focus via pointer, clear, type sequentially, read back
async fn type_and_read<A: Automation + ?Sized>(
    automation: &A,
    handle: &ElementHandle,
    desired: &str,
    inter_key_delay: Duration,
) -> TeclearResult<String> {
    automation.click(handle).await?;
    automation.clear(handle).await?;
    automation
        .type_sequential(handle, desired, inter_key_delay)
        .await?;
    automation.read_value(handle).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{ActionRecord, InputBehavior, ScriptedAutomation, ScriptedElement};

    fn fast_options() -> SyncOptions {
        // Short keystroke delays so the scripted tests stay quick while
        // preserving the first < retry ordering.
        SyncOptions::new()
            .with_first_key_delay(1)
            .with_retry_key_delay(3)
            .with_readiness_timeout(200)
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults_match_documented_constants() {
            let opts = SyncOptions::default();
            assert_eq!(opts.first_key_delay_ms, 60);
            assert_eq!(opts.retry_key_delay_ms, 90);
            assert!(opts.retry_key_delay() > opts.first_key_delay());
        }

        #[test]
        fn test_builder_chaining() {
            let opts = SyncOptions::new()
                .with_first_key_delay(10)
                .with_retry_key_delay(20)
                .with_readiness_timeout(1000);
            assert_eq!(opts.first_key_delay(), Duration::from_millis(10));
            assert_eq!(opts.retry_key_delay(), Duration::from_millis(20));
            assert_eq!(opts.readiness_timeout(), Duration::from_millis(1000));
        }
    }

    mod escalation_tests {
        use super::*;

        #[tokio::test]
        async fn test_responsive_element_converges_on_first_attempt() {
            let automation = ScriptedAutomation::new();
            automation.add_element("#card", ScriptedElement::input(InputBehavior::AcceptAll));

            let report = synchronize(
                &automation,
                &Locator::new("#card"),
                "4242424242424242",
                &fast_options(),
            )
            .await
            .unwrap();

            assert_eq!(report.strategy, Strategy::TypedModerate);
            assert_eq!(automation.value_of("#card").unwrap(), "4242424242424242");
        }

        #[tokio::test]
        async fn test_slow_cadence_rescues_dropped_keystrokes() {
            let automation = ScriptedAutomation::new();
            automation.add_element(
                "#name",
                ScriptedElement::input(InputBehavior::DropFastKeystrokes {
                    min_delay: Duration::from_millis(2),
                }),
            );

            let report = synchronize(&automation, &Locator::new("#name"), "Jo", &fast_options())
                .await
                .unwrap();

            assert_eq!(report.strategy, Strategy::TypedSlow);
            assert_eq!(automation.value_of("#name").unwrap(), "Jo");
        }

        #[tokio::test]
        async fn test_direct_assignment_fallback_dispatches_notifications() {
            let automation = ScriptedAutomation::new();
            automation.add_element("#city", ScriptedElement::input(InputBehavior::DropTyped));

            let report = synchronize(
                &automation,
                &Locator::new("#city"),
                "Berlin",
                &fast_options(),
            )
            .await
            .unwrap();

            assert_eq!(report.strategy, Strategy::DirectAssign);
            assert_eq!(automation.value_of("#city").unwrap(), "Berlin");

            let log = automation.action_log();
            assert!(log.contains(&ActionRecord::SetValueDirect {
                selector: "#city".to_string(),
                value: "Berlin".to_string(),
            }));
            assert!(log.contains(&ActionRecord::Dispatched {
                selector: "#city".to_string(),
                kind: NotificationKind::Input,
            }));
            assert!(log.contains(&ActionRecord::Dispatched {
                selector: "#city".to_string(),
                kind: NotificationKind::Change,
            }));
        }

        #[tokio::test]
        async fn test_unresponsive_element_fails_with_value_mismatch() {
            let automation = ScriptedAutomation::new();
            automation.add_element("#year", ScriptedElement::input(InputBehavior::Unresponsive));

            let result = synchronize(
                &automation,
                &Locator::new("#year"),
                "2027",
                &fast_options(),
            )
            .await;

            match result {
                Err(TeclearError::ValueMismatch { expected, actual }) => {
                    assert_eq!(expected, "2027");
                    assert_ne!(actual, "2027");
                }
                other => panic!("expected ValueMismatch, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_idempotent_on_already_matching_element() {
            let automation = ScriptedAutomation::new();
            let mut element = ScriptedElement::input(InputBehavior::AcceptAll);
            element.value = "Austria".to_string();
            automation.add_element("#country", element);

            let locator = Locator::new("#country");
            let first = synchronize(&automation, &locator, "Austria", &fast_options())
                .await
                .unwrap();
            let second = synchronize(&automation, &locator, "Austria", &fast_options())
                .await
                .unwrap();

            assert_eq!(first.strategy, Strategy::TypedModerate);
            assert_eq!(second.strategy, Strategy::TypedModerate);
            assert_eq!(automation.value_of("#country").unwrap(), "Austria");
            // Re-clearing and re-typing are the only side effects: no direct
            // assignment or synthetic notifications were needed.
            let log = automation.action_log();
            assert!(!log
                .iter()
                .any(|a| matches!(a, ActionRecord::SetValueDirect { .. })));
        }
    }

    mod resolution_tests {
        use super::*;
        use std::time::Duration;

        #[tokio::test]
        async fn test_missing_element_fails_without_interaction() {
            let automation = ScriptedAutomation::new();
            let locator = Locator::new("#nope").with_timeout(Duration::from_millis(60));

            let result = synchronize(&automation, &locator, "x", &fast_options()).await;
            assert!(matches!(result, Err(TeclearError::ElementNotFound { .. })));
            assert!(automation.action_log().is_empty());
        }

        #[tokio::test]
        async fn test_ambiguous_locator_fails_without_interaction() {
            let automation = ScriptedAutomation::new();
            automation.add_ambiguous(".card input", 9);

            let result = synchronize(
                &automation,
                &Locator::new(".card input"),
                "x",
                &fast_options(),
            )
            .await;

            match result {
                Err(TeclearError::AmbiguousLocator { count, .. }) => assert_eq!(count, 9),
                other => panic!("expected AmbiguousLocator, got {other:?}"),
            }
            assert!(automation.action_log().is_empty());
        }

        #[tokio::test]
        async fn test_hidden_element_times_out() {
            let automation = ScriptedAutomation::new();
            let mut element = ScriptedElement::input(InputBehavior::AcceptAll);
            element.visible = false;
            automation.add_element("#month", element);

            let options = fast_options().with_readiness_timeout(80);
            let result =
                synchronize(&automation, &Locator::new("#month"), "12", &options).await;
            assert!(matches!(result, Err(TeclearError::Timeout { .. })));
        }
    }
}
