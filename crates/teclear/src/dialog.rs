//! Dialog observation for E2E flows.
//!
//! Browser-native dialogs (alert, confirm, prompt) are a side channel the
//! application uses to report success or failure. An [`AlertSpy`] is an
//! injected observer registered with the automation capability *before* the
//! triggering action; the test then asserts on its call log. No global state
//! is involved; each spy owns its own log and can be dropped with the test.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::result::{TeclearError, TeclearResult};

/// Type of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogKind {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
}

impl std::fmt::Display for DialogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// One observed dialog invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDialog {
    /// Dialog type
    pub kind: DialogKind,
    /// Message displayed in the dialog
    pub message: String,
}

impl ObservedDialog {
    /// Create an observed alert
    #[must_use]
    pub fn alert(message: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Alert,
            message: message.into(),
        }
    }
}

/// Injected spy over browser-level dialogs.
///
/// Cloning shares the call log: the automation backend records into one
/// clone while the test flow asserts on another.
#[derive(Debug, Clone, Default)]
pub struct AlertSpy {
    log: Arc<Mutex<Vec<ObservedDialog>>>,
}

impl AlertSpy {
    /// Create a new spy with an empty call log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dialog invocation. Called by automation backends.
    pub fn record(&self, dialog: ObservedDialog) {
        if let Ok(mut log) = self.log.lock() {
            log.push(dialog);
        }
    }

    /// Whether any dialog was observed
    #[must_use]
    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Number of observed dialogs
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.log.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// All observed messages, in order
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.log
            .lock()
            .map(|l| l.iter().map(|d| d.message.clone()).collect())
            .unwrap_or_default()
    }

    /// Last observed dialog, if any
    #[must_use]
    pub fn last(&self) -> Option<ObservedDialog> {
        self.log.lock().ok().and_then(|l| l.last().cloned())
    }

    /// Whether any observed message matches the regex pattern
    pub fn called_matching(&self, pattern: &str) -> TeclearResult<bool> {
        let re = Regex::new(pattern)
            .map_err(|e| TeclearError::assertion(format!("invalid dialog pattern: {e}")))?;
        Ok(self.messages().iter().any(|m| re.is_match(m)))
    }

    /// Clear the call log
    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }

    /// Assert no dialog was observed
    pub fn assert_not_called(&self) -> TeclearResult<()> {
        if self.was_called() {
            return Err(TeclearError::assertion(format!(
                "expected no dialog, but observed: {:?}",
                self.messages()
            )));
        }
        Ok(())
    }

    /// Assert at least one observed message matches the regex pattern
    pub fn assert_called_matching(&self, pattern: &str) -> TeclearResult<()> {
        if !self.was_called() {
            return Err(TeclearError::assertion(format!(
                "expected a dialog matching {pattern:?}, but none was observed"
            )));
        }
        if !self.called_matching(pattern)? {
            return Err(TeclearError::assertion(format!(
                "no dialog message matched {pattern:?}; observed: {:?}",
                self.messages()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_spy_reports_not_called() {
        let spy = AlertSpy::new();
        assert!(!spy.was_called());
        assert!(spy.assert_not_called().is_ok());
        assert!(spy.last().is_none());
    }

    #[test]
    fn test_record_and_messages_preserve_order() {
        let spy = AlertSpy::new();
        spy.record(ObservedDialog::alert("Product added."));
        spy.record(ObservedDialog::alert("Wrong password."));
        assert_eq!(spy.call_count(), 2);
        assert_eq!(spy.messages(), vec!["Product added.", "Wrong password."]);
        assert_eq!(spy.last().unwrap().message, "Wrong password.");
    }

    #[test]
    fn test_called_matching_alternation() {
        let spy = AlertSpy::new();
        spy.record(ObservedDialog::alert("User does not exist."));
        assert!(spy
            .called_matching(r"(Wrong password\.|User does not exist\.)")
            .unwrap());
        assert!(!spy.called_matching(r"Product added").unwrap());
    }

    #[test]
    fn test_assert_not_called_fails_after_record() {
        let spy = AlertSpy::new();
        spy.record(ObservedDialog::alert("boom"));
        assert!(spy.assert_not_called().is_err());
    }

    #[test]
    fn test_assert_called_matching_reports_observed_messages() {
        let spy = AlertSpy::new();
        spy.record(ObservedDialog::alert("Something else"));
        let err = spy
            .assert_called_matching(r"^Product added\.?$")
            .unwrap_err();
        assert!(err.to_string().contains("Something else"));
    }

    #[test]
    fn test_clones_share_the_log() {
        let spy = AlertSpy::new();
        let backend_side = spy.clone();
        backend_side.record(ObservedDialog::alert("Product added."));
        assert!(spy.was_called());
        spy.clear();
        assert_eq!(backend_side.call_count(), 0);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let spy = AlertSpy::new();
        spy.record(ObservedDialog::alert("x"));
        assert!(spy.called_matching("(unclosed").is_err());
    }
}
