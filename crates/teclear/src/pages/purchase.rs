//! Purchase flow page object: catalog, cart and checkout.
//!
//! Every navigation that triggers backend traffic registers a
//! [`RequestBarrier`] before the click and awaits it afterwards, so the flow
//! never races the cart/catalog refresh calls. The "product added" alert is
//! observed through an injected [`AlertSpy`].

use regex::Regex;
use tracing::{debug, info};

use crate::capability::{
    click_on, text_on, visible_now, wait_visible_on, Automation, Resolution,
};
use crate::config::SuiteConfig;
use crate::dialog::AlertSpy;
use crate::locator::Locator;
use crate::network::{HttpMethod, RequestBarrier, UrlPattern};
use crate::pages::{first_integer, PageObject};
use crate::result::{TeclearError, TeclearResult};
use crate::sync::synchronize;
use crate::wait::{wait_until, wait_until_async};

/// Message the storefront shows after adding a product to the cart
pub const PRODUCT_ADDED_PATTERN: &str = r"^Product added\.?$";

/// Title of the purchase confirmation popup
pub const RECEIPT_TITLE: &str = "Thank you for your purchase!";

mod selectors {
    pub const CATEGORY_LINK: &str = ".list-group a";
    pub const PRODUCT_CARD: &str = ".card";
    pub const PRODUCT_CARD_TITLE: &str = ".card-title";
    pub const ADD_TO_CART: &str = "a[onclick^=\"addToCart(\"]";
    pub const CART_LINK: &str = "#cartur";
    pub const CART_TABLE_BODY: &str = "#tbodyid";
    pub const CART_TOTAL: &str = "#totalp";
    pub const DELETE_LINK: &str = "a[onclick^=\"deleteItem(\"]";
    pub const DETAIL_PRICE: &str = "h3.price-container";
    pub const ORDER_MODAL_TRIGGER: &str = "button[data-target=\"#orderModal\"]";
    pub const ORDER_MODAL: &str = "#orderModal";
    pub const ORDER_NAME: &str = "#name";
    pub const ORDER_COUNTRY: &str = "#country";
    pub const ORDER_CITY: &str = "#city";
    pub const ORDER_CARD: &str = "#card";
    pub const ORDER_MONTH: &str = "#month";
    pub const ORDER_YEAR: &str = "#year";
    pub const PURCHASE_BUTTON: &str = "#orderModal .modal-footer > button.btn.btn-primary";
    pub const RECEIPT_POPUP: &str = ".sweet-alert";
    pub const RECEIPT_CONFIRM: &str = ".sweet-alert button.confirm";
}

/// Checkout form data for placing an order
#[derive(Debug, Clone)]
pub struct OrderForm {
    /// Buyer name (echoed back on the receipt)
    pub name: String,
    /// Country
    pub country: String,
    /// City
    pub city: String,
    /// Credit card number
    pub card: String,
    /// Expiry month
    pub month: String,
    /// Expiry year
    pub year: String,
}

/// Parsed fields of the purchase confirmation popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Charged amount, if the popup carried one
    pub amount: Option<i64>,
    /// Buyer name, if the popup carried one
    pub name: Option<String>,
    /// Raw popup text for diagnostics
    pub raw: String,
}

impl Receipt {
    /// Parse the confirmation popup body.
    ///
    /// The amount line reads `Amount: 1160 USD`; separators in large amounts
    /// are stripped before parsing.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let amount = Regex::new(r"Amount:\s*([\d.,]+)")
            .ok()
            .and_then(|re| re.captures(text).map(|c| c[1].to_string()))
            .and_then(|s| s.replace([',', '.'], "").parse().ok());
        let name = Regex::new(r"Name:\s*(\S[^\r\n]*)")
            .ok()
            .and_then(|re| re.captures(text).map(|c| c[1].trim().to_string()));
        Self {
            amount,
            name,
            raw: text.to_string(),
        }
    }
}

/// Page object for the catalog-to-checkout workflow
#[derive(Debug, Clone)]
pub struct PurchasePage {
    config: SuiteConfig,
}

impl PageObject for PurchasePage {
    fn url_pattern(&self) -> &str {
        "/"
    }
}

impl PurchasePage {
    /// Create the page object
    #[must_use]
    pub fn new(config: SuiteConfig) -> Self {
        Self { config }
    }

    /// Navigate to the storefront home page
    pub async fn go_home<A: Automation + ?Sized>(&self, automation: &A) -> TeclearResult<()> {
        debug!(page = self.page_name(), "navigating home");
        automation.goto(&self.config.url(self.url_pattern())).await?;
        if !self.is_loaded() {
            return Err(TeclearError::assertion(format!(
                "{} did not report loaded",
                self.page_name()
            )));
        }
        Ok(())
    }

    /// Open a catalog category and wait for the catalog refresh call
    pub async fn open_category<A: Automation + ?Sized>(
        &self,
        automation: &A,
        category: &str,
    ) -> TeclearResult<()> {
        let barrier = RequestBarrier::new(HttpMethod::Post, UrlPattern::Glob("**/bycat**".into()));
        automation.observe_requests(&barrier).await?;
        click_on(
            automation,
            &Locator::new(selectors::CATEGORY_LINK).with_text(category),
        )
        .await?;
        barrier.wait(&self.config.wait_options()).await?;
        Ok(())
    }

    /// Name of the first product in the current listing. Dynamic-product
    /// flows buy whatever is listed first instead of a fixed product.
    pub async fn first_product_name<A: Automation + ?Sized>(
        &self,
        automation: &A,
    ) -> TeclearResult<String> {
        let locator = Locator::new(selectors::PRODUCT_CARD_TITLE).with_strict(false);
        let text = text_on(automation, &locator).await?;
        Ok(text.trim().to_string())
    }

    /// Open a product's detail page from the listing
    pub async fn open_product<A: Automation + ?Sized>(
        &self,
        automation: &A,
        product: &str,
    ) -> TeclearResult<()> {
        info!(product, "opening product");
        click_on(
            automation,
            &Locator::new(selectors::PRODUCT_CARD_TITLE).with_text(product),
        )
        .await
    }

    /// Price shown on the listing card for a product
    pub async fn listing_price<A: Automation + ?Sized>(
        &self,
        automation: &A,
        product: &str,
    ) -> TeclearResult<i64> {
        let text = text_on(
            automation,
            &Locator::new(selectors::PRODUCT_CARD).with_text(product),
        )
        .await?;
        first_integer(&text).ok_or_else(|| {
            TeclearError::assertion(format!("no price found on listing card: {text:?}"))
        })
    }

    /// Price shown on the product detail page
    pub async fn detail_price<A: Automation + ?Sized>(
        &self,
        automation: &A,
    ) -> TeclearResult<i64> {
        let text = text_on(automation, &Locator::new(selectors::DETAIL_PRICE)).await?;
        first_integer(&text).ok_or_else(|| {
            TeclearError::assertion(format!("no price found on detail page: {text:?}"))
        })
    }

    /// Add the open product to the cart and wait for the confirmation alert
    pub async fn add_to_cart<A: Automation + ?Sized>(
        &self,
        automation: &A,
        spy: &AlertSpy,
    ) -> TeclearResult<()> {
        automation.observe_dialogs(spy).await?;
        click_on(automation, &Locator::new(selectors::ADD_TO_CART)).await?;
        wait_until(
            || spy.was_called(),
            "product-added alert",
            &self.config.wait_options(),
        )
        .await?;
        spy.assert_called_matching(PRODUCT_ADDED_PATTERN)?;
        Ok(())
    }

    /// Navigate to the cart and wait for the cart contents call
    pub async fn go_to_cart<A: Automation + ?Sized>(&self, automation: &A) -> TeclearResult<()> {
        let barrier =
            RequestBarrier::new(HttpMethod::Post, UrlPattern::Glob("**/viewcart**".into()));
        automation.observe_requests(&barrier).await?;
        click_on(automation, &Locator::new(selectors::CART_LINK)).await?;
        barrier.wait(&self.config.wait_options()).await?;
        Ok(())
    }

    /// Total shown at the bottom of the cart
    pub async fn cart_total<A: Automation + ?Sized>(&self, automation: &A) -> TeclearResult<i64> {
        let text = text_on(automation, &Locator::new(selectors::CART_TOTAL)).await?;
        first_integer(&text)
            .ok_or_else(|| TeclearError::assertion(format!("cart total unreadable: {text:?}")))
    }

    /// Assert the cart lists a product and shows the expected total
    pub async fn assert_cart_has<A: Automation + ?Sized>(
        &self,
        automation: &A,
        product: &str,
        expected_total: i64,
    ) -> TeclearResult<()> {
        let rows = text_on(automation, &Locator::new(selectors::CART_TABLE_BODY)).await?;
        if !rows.contains(product) {
            return Err(TeclearError::assertion(format!(
                "cart does not list {product:?}: {rows:?}"
            )));
        }
        let total = self.cart_total(automation).await?;
        if total != expected_total {
            return Err(TeclearError::assertion(format!(
                "cart total is {total}, expected {expected_total}"
            )));
        }
        Ok(())
    }

    /// Open the checkout modal from the cart page
    pub async fn open_order_modal<A: Automation + ?Sized>(
        &self,
        automation: &A,
    ) -> TeclearResult<()> {
        click_on(automation, &Locator::new(selectors::ORDER_MODAL_TRIGGER)).await?;
        wait_visible_on(
            automation,
            &Locator::new(selectors::ORDER_MODAL),
            self.config.wait_options().timeout(),
        )
        .await?;
        Ok(())
    }

    /// Fill every checkout field, each with read-back verification
    pub async fn fill_order_form<A: Automation + ?Sized>(
        &self,
        automation: &A,
        form: &OrderForm,
    ) -> TeclearResult<()> {
        let fields = [
            (selectors::ORDER_NAME, form.name.as_str()),
            (selectors::ORDER_COUNTRY, form.country.as_str()),
            (selectors::ORDER_CITY, form.city.as_str()),
            (selectors::ORDER_CARD, form.card.as_str()),
            (selectors::ORDER_MONTH, form.month.as_str()),
            (selectors::ORDER_YEAR, form.year.as_str()),
        ];
        for (selector, value) in fields {
            synchronize(automation, &Locator::new(selector), value, &self.config.sync).await?;
        }
        Ok(())
    }

    /// Submit the purchase, wait for the server-side cart cleanup call to
    /// succeed, then wait for the confirmation popup
    pub async fn submit_purchase<A: Automation + ?Sized>(
        &self,
        automation: &A,
    ) -> TeclearResult<()> {
        let barrier =
            RequestBarrier::new(HttpMethod::Post, UrlPattern::Glob("**/deletecart**".into()));
        automation.observe_requests(&barrier).await?;
        click_on(automation, &Locator::new(selectors::PURCHASE_BUTTON)).await?;
        barrier
            .wait_for_status(&[200, 201], &self.config.wait_options())
            .await?;
        wait_visible_on(
            automation,
            &Locator::new(selectors::RECEIPT_POPUP),
            self.config.wait_options().timeout(),
        )
        .await?;
        Ok(())
    }

    /// Read and parse the confirmation popup
    pub async fn receipt<A: Automation + ?Sized>(&self, automation: &A) -> TeclearResult<Receipt> {
        let text = text_on(automation, &Locator::new(selectors::RECEIPT_POPUP)).await?;
        Ok(Receipt::parse(&text))
    }

    /// Verify the receipt against the order, confirm the popup and wait for
    /// it to be dismissed
    pub async fn verify_receipt_and_confirm<A: Automation + ?Sized>(
        &self,
        automation: &A,
        expected_amount: i64,
        expected_name: &str,
    ) -> TeclearResult<Receipt> {
        let receipt = self.receipt(automation).await?;
        if !receipt.raw.contains(RECEIPT_TITLE) {
            return Err(TeclearError::assertion(format!(
                "confirmation popup missing title: {:?}",
                receipt.raw
            )));
        }
        if receipt.amount != Some(expected_amount) {
            return Err(TeclearError::assertion(format!(
                "receipt amount is {:?}, expected {expected_amount}",
                receipt.amount
            )));
        }
        if receipt.name.as_deref() != Some(expected_name) {
            return Err(TeclearError::assertion(format!(
                "receipt name is {:?}, expected {expected_name:?}",
                receipt.name
            )));
        }

        click_on(automation, &Locator::new(selectors::RECEIPT_CONFIRM)).await?;
        let popup = Locator::new(selectors::RECEIPT_POPUP);
        wait_until_async(
            || {
                let popup = popup.clone();
                async move { Ok(!visible_now(automation, &popup).await?) }
            },
            "confirmation popup dismissed",
            &self.config.wait_options(),
        )
        .await?;
        Ok(receipt)
    }

    /// Navigate to the cart page and assert it is empty after a purchase
    pub async fn assert_cart_empty<A: Automation + ?Sized>(
        &self,
        automation: &A,
    ) -> TeclearResult<()> {
        let barrier =
            RequestBarrier::new(HttpMethod::Post, UrlPattern::Glob("**/viewcart**".into()));
        automation.observe_requests(&barrier).await?;
        automation.goto(&self.config.url("cart.html")).await?;
        barrier.wait(&self.config.wait_options()).await?;

        let rows = text_on(automation, &Locator::new(selectors::CART_TABLE_BODY)).await?;
        if !rows.trim().is_empty() {
            return Err(TeclearError::assertion(format!(
                "cart still lists items: {rows:?}"
            )));
        }
        if !matches!(
            automation
                .resolve(&Locator::new(selectors::DELETE_LINK))
                .await?,
            Resolution::NotFound
        ) {
            return Err(TeclearError::assertion("cart still offers delete links"));
        }

        // A missing or blank total reads as zero.
        let total = match automation.resolve(&Locator::new(selectors::CART_TOTAL)).await? {
            Resolution::Found(handle) => {
                let text = automation.text_of(&handle).await?;
                first_integer(&text).unwrap_or(0)
            }
            Resolution::NotFound | Resolution::Ambiguous(_) => 0,
        };
        if total != 0 {
            return Err(TeclearError::assertion(format!(
                "cart total is {total}, expected 0"
            )));
        }
        Ok(())
    }
}
