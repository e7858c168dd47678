//! Teclear: resilient browser E2E flows for the demo storefront.
//!
//! The centerpiece is [`synchronize`]: a text-input synchronizer that
//! escalates through three strategies (moderate-cadence keystrokes, slower
//! retype, direct value assignment with synthetic notifications) and only
//! reports success after reading the value back from the element. Around it
//! sit the supporting layers every flow needs:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  pages        LoginPage / PurchasePage flow objects      │
//! │  sync         escalating input synchronizer              │
//! │  dialog       injected alert spies                       │
//! │  network      request-pattern barriers                   │
//! │  capability   Automation trait + resolution helpers      │
//! │  mock / cdp   scripted backend / chromiumoxide backend   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything above the capability line is backend-agnostic: the same flows
//! run against [`mock::ScriptedAutomation`] in unit tests and against a live
//! chromium via the `browser` feature.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod capability;
pub mod config;
pub mod dialog;
pub mod locator;
pub mod mock;
pub mod network;
pub mod pages;
pub mod result;
pub mod sync;
pub mod wait;

#[cfg(feature = "browser")]
pub mod browser;

#[cfg(not(target_arch = "wasm32"))]
pub mod trace;

pub use capability::{
    click_on, resolve_one, text_on, visible_now, wait_visible_on, Automation, ElementHandle,
    ElementState, NotificationKind, Resolution,
};
pub use config::SuiteConfig;
pub use dialog::{AlertSpy, DialogKind, ObservedDialog};
pub use locator::{Locator, LocatorOptions, Selector};
pub use network::{CapturedRequest, HttpMethod, RequestBarrier, UrlPattern};
pub use pages::{LoginPage, OrderForm, PageObject, PurchasePage, Receipt};
pub use result::{TeclearError, TeclearResult};
pub use sync::{synchronize, Strategy, SyncOptions, SyncReport};
pub use wait::{wait_until, wait_until_async, WaitOptions, WaitOutcome};

#[cfg(feature = "browser")]
pub use browser::{BrowserConfig, CdpAutomation};
