//! Login flow page object.
//!
//! The storefront shows login failures through a browser-native alert and
//! success through a welcome banner, so every login registers an [`AlertSpy`]
//! before submitting: a successful login asserts the spy was never called, a
//! failed one asserts the message matches one of the two messages the site
//! shows.

use tracing::{debug, info};

use crate::capability::{click_on, text_on, visible_now, wait_visible_on, Automation};
use crate::config::SuiteConfig;
use crate::dialog::AlertSpy;
use crate::locator::Locator;
use crate::pages::PageObject;
use crate::result::{TeclearError, TeclearResult};
use crate::sync::synchronize;

/// Messages the storefront shows for a rejected login
pub const LOGIN_FAILURE_PATTERN: &str = r"(Wrong password\.|User does not exist\.)";

mod selectors {
    pub const LOGIN_LINK: &str = "#login2";
    pub const LOGIN_MODAL: &str = "#logInModal";
    pub const USERNAME: &str = "#loginusername";
    pub const PASSWORD: &str = "#loginpassword";
    pub const SUBMIT: &str = "button[onclick=\"logIn()\"]";
    pub const WELCOME_USER: &str = "#nameofuser";
    pub const LOGOUT: &str = "#logout2";
    pub const CLOSE_LOGIN: &str = "#logInModal .btn-secondary";
}

/// Page object for the login workflow
#[derive(Debug, Clone)]
pub struct LoginPage {
    config: SuiteConfig,
}

impl PageObject for LoginPage {
    fn url_pattern(&self) -> &str {
        "/"
    }
}

impl LoginPage {
    /// Create the page object
    #[must_use]
    pub fn new(config: SuiteConfig) -> Self {
        Self { config }
    }

    /// Navigate to the storefront home page
    pub async fn visit<A: Automation + ?Sized>(&self, automation: &A) -> TeclearResult<()> {
        debug!(page = self.page_name(), "visiting");
        automation.goto(&self.config.url(self.url_pattern())).await?;
        if !self.is_loaded() {
            return Err(TeclearError::assertion(format!(
                "{} did not report loaded",
                self.page_name()
            )));
        }
        Ok(())
    }

    /// Open the login modal and wait for it to be visible
    pub async fn open_login_modal<A: Automation + ?Sized>(
        &self,
        automation: &A,
    ) -> TeclearResult<()> {
        click_on(automation, &Locator::new(selectors::LOGIN_LINK)).await?;
        wait_visible_on(
            automation,
            &Locator::new(selectors::LOGIN_MODAL),
            self.config.wait_options().timeout(),
        )
        .await?;
        Ok(())
    }

    /// Fill the username field, read-back verified
    pub async fn fill_username<A: Automation + ?Sized>(
        &self,
        automation: &A,
        username: &str,
    ) -> TeclearResult<()> {
        synchronize(
            automation,
            &Locator::new(selectors::USERNAME),
            username,
            &self.config.sync,
        )
        .await?;
        Ok(())
    }

    /// Fill the password field, read-back verified
    pub async fn fill_password<A: Automation + ?Sized>(
        &self,
        automation: &A,
        password: &str,
    ) -> TeclearResult<()> {
        synchronize(
            automation,
            &Locator::new(selectors::PASSWORD),
            password,
            &self.config.sync,
        )
        .await?;
        Ok(())
    }

    /// Submit the login form
    pub async fn submit<A: Automation + ?Sized>(&self, automation: &A) -> TeclearResult<()> {
        click_on(automation, &Locator::new(selectors::SUBMIT)).await
    }

    /// Full login flow: visit, open the modal, register the alert spy,
    /// fill both fields with read-back verification and submit
    pub async fn login<A: Automation + ?Sized>(
        &self,
        automation: &A,
        spy: &AlertSpy,
        username: &str,
        password: &str,
    ) -> TeclearResult<()> {
        info!(username, "logging in");
        self.visit(automation).await?;
        self.open_login_modal(automation).await?;
        automation.observe_dialogs(spy).await?;
        self.fill_username(automation, username).await?;
        self.fill_password(automation, password).await?;
        self.submit(automation).await
    }

    /// Assert a successful login: no alert was raised and the welcome
    /// banner names the user
    pub async fn assert_success<A: Automation + ?Sized>(
        &self,
        automation: &A,
        spy: &AlertSpy,
        username: &str,
    ) -> TeclearResult<()> {
        spy.assert_not_called()?;
        let banner = wait_visible_on(
            automation,
            &Locator::new(selectors::WELCOME_USER),
            self.config.wait_options().timeout(),
        )
        .await?;
        let text = automation.text_of(&banner).await?;
        let expected = format!("Welcome {username}");
        if text != expected {
            return Err(TeclearError::assertion(format!(
                "welcome banner reads {text:?}, expected {expected:?}"
            )));
        }
        Ok(())
    }

    /// Assert a rejected login: the alert matched one of the storefront's
    /// failure messages. Closes the modal if it is still open so the next
    /// flow starts clean.
    pub async fn assert_failure<A: Automation + ?Sized>(
        &self,
        automation: &A,
        spy: &AlertSpy,
    ) -> TeclearResult<()> {
        spy.assert_called_matching(LOGIN_FAILURE_PATTERN)?;

        let modal = Locator::new(selectors::LOGIN_MODAL);
        if visible_now(automation, &modal).await? {
            click_on(automation, &Locator::new(selectors::CLOSE_LOGIN)).await?;
        }
        Ok(())
    }

    /// Read the welcome banner text, if present
    pub async fn welcome_text<A: Automation + ?Sized>(
        &self,
        automation: &A,
    ) -> TeclearResult<String> {
        text_on(automation, &Locator::new(selectors::WELCOME_USER)).await
    }

    /// Log out only if the logout link is visible (safe after negative tests)
    pub async fn logout_if_logged_in<A: Automation + ?Sized>(
        &self,
        automation: &A,
    ) -> TeclearResult<()> {
        let logout = Locator::new(selectors::LOGOUT);
        if visible_now(automation, &logout).await? {
            click_on(automation, &logout).await?;
        }
        Ok(())
    }
}
