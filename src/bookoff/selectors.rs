//! CSS selectors for the Bookoff online store.
//!
//! Plain string selectors are sent to the browser; the parsed `Selector`s are
//! used by the HTML parser on snapshots taken from the live page.
//!
//! **Update process**: when a lookup starts coming back empty, capture the
//! search page and the store modal, update selectors, and refresh the fixtures.

use scraper::Selector;
use std::sync::LazyLock;

/// Search results page.
pub mod search {
    use super::*;

    /// "Load more" button at the bottom of the infinite scroll list.
    pub const LOAD_MORE: &str = "button.js-infiniteScroll__loadMore";

    /// One product entry in the result list.
    pub const ROW: &str = "div.productItem, li.productItem";

    /// Primary link of a result row (image or title).
    pub const ROW_LINK: &str = "a.productItem__imageLink, a.productItem__link";

    /// Attribute holding the product code (JAN/ISBN, sometimes composite).
    pub const PRODUCT_CODE_ATTR: &str = "data-product-code";

    pub static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse(ROW).unwrap());
}

/// Product detail page and its store availability modal.
pub mod modal {
    use super::*;

    /// Link that opens the store availability modal.
    pub const TRIGGER: &str = "a.productInformation__list__link.js-modal.modal__trigger";

    /// Modal root; its outer HTML is what the extractor parses.
    pub const ROOT: &str = "#modalStoreInformation";

    /// Scrollable body of the modal.
    pub const BODY: &str = "#modalStoreInformation .modalStoreInformation__body";

    pub const ITEM: &str = "#modalStoreInformation li.modalStoreInformation__item";

    pub const SHOP_LINK: &str = "a.modalStoreInformation__link";

    pub const PRICE: &str = "span.modalStoreInformation__price";

    pub static ITEMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse(ITEM).unwrap());

    pub static SHOP_LINKS: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(SHOP_LINK).unwrap());

    pub static PRICES: LazyLock<Selector> = LazyLock::new(|| Selector::parse(PRICE).unwrap());
}
