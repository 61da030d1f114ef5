//! HTML parsing for result rows and the store availability modal.

use crate::bookoff::models::{ascii_digit, Isbn, ShopAvailability};
use crate::bookoff::selectors::{modal, search};
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Parser for snapshots of the search page and store modal, bound to one identifier.
pub struct Parser {
    isbn: Isbn,
}

impl Parser {
    pub fn new(isbn: Isbn) -> Self {
        Self { isbn }
    }

    /// Returns the document-order index of the first row whose product code
    /// contains the identifier.
    ///
    /// The row's own `data-product-code` is checked first, then those of its
    /// descendants. Codes can be composite, so this is a substring match.
    pub fn find_target_row(&self, html: &str) -> Option<usize> {
        let document = Html::parse_document(html);
        let code = self.isbn.as_str();

        for (index, row) in document.select(&search::ROWS).enumerate() {
            if row_matches(row, code) {
                debug!("Row {} matches {}", index, code);
                return Some(index);
            }
        }

        None
    }

    /// Extracts shop/price pairs from the modal's outer HTML.
    ///
    /// Items without a shop name are skipped, and only the first item for a
    /// given name is kept.
    pub fn extract_shops(&self, html: &str) -> Vec<ShopAvailability> {
        let fragment = Html::parse_fragment(html);
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for item in fragment.select(&modal::ITEMS) {
            let shop = first_text(item, &modal::SHOP_LINKS).unwrap_or_default();
            let shop = shop.trim();

            if shop.is_empty() || !seen.insert(shop.to_string()) {
                trace!("Skipping store item {:?}", shop);
                continue;
            }

            let price = first_text(item, &modal::PRICES).and_then(|text| parse_price(&text));
            records.push(ShopAvailability::new(self.isbn.clone(), shop, price));
        }

        records
    }
}

/// Parses a displayed price such as `¥1,280` or `税込 1,280円`.
///
/// Returns `None` when no digits are present or the number does not fit.
pub fn parse_price(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter_map(ascii_digit).collect();

    if digits.is_empty() {
        return None;
    }

    digits.parse().ok()
}

fn row_matches(row: ElementRef, code: &str) -> bool {
    if has_code(row, code) {
        return true;
    }

    // descendants() yields the row itself first
    row.descendants().skip(1).filter_map(ElementRef::wrap).any(|el| has_code(el, code))
}

fn has_code(element: ElementRef, code: &str) -> bool {
    element.value().attr(search::PRODUCT_CODE_ATTR).is_some_and(|attr| attr.contains(code))
}

fn first_text(element: ElementRef, selector: &scraper::Selector) -> Option<String> {
    element.select(selector).next().map(|e| e.text().collect())
}
