//! Page objects for the demo storefront flows.
//!
//! The page objects are the scenario layer: selector tables and flow order
//! for the login and purchase workflows, composed out of the synchronizer,
//! dialog spies and request barriers. They are generic over the
//! [`Automation`](crate::capability::Automation) capability, so the same
//! flows run against the scripted backend in tests and against CDP with the
//! `browser` feature.

mod login;
mod purchase;

pub use login::LoginPage;
pub use purchase::{OrderForm, PurchasePage, Receipt};

/// Trait for page objects representing a page or component in the UI
pub trait PageObject {
    /// URL pattern that matches this page (e.g., "/", "/cart.html")
    fn url_pattern(&self) -> &str;

    /// Check if the page is fully loaded and ready for interaction
    fn is_loaded(&self) -> bool {
        true
    }

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Extract the first integer from a text blob ("$790 *includes tax" -> 790)
#[must_use]
pub(crate) fn first_integer(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;

    #[test]
    fn test_page_objects_report_identity() {
        let login = LoginPage::new(SuiteConfig::new());
        assert_eq!(login.url_pattern(), "/");
        assert!(login.is_loaded());
        assert!(login.page_name().contains("LoginPage"));

        let purchase = PurchasePage::new(SuiteConfig::new());
        assert_eq!(purchase.url_pattern(), "/");
        assert!(purchase.is_loaded());
    }

    #[test]
    fn test_first_integer_from_price_text() {
        assert_eq!(first_integer("$790 *includes tax"), Some(790));
        assert_eq!(first_integer("790"), Some(790));
        assert_eq!(first_integer("price: 1100 USD"), Some(1100));
        assert_eq!(first_integer("no digits"), None);
        assert_eq!(first_integer(""), None);
    }
}
