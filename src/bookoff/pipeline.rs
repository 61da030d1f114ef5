//! The lookup sequence: load every result row, find the target, open its
//! store modal, scroll the modal until all shops render, then extract them.

use crate::bookoff::driver::{ClickMode, DriverError, Locator, PageDriver};
use crate::bookoff::models::{Isbn, LookupFailure, ShopAvailability};
use crate::bookoff::parser::Parser;
use crate::bookoff::selectors::{modal, search};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default search URL; `{q}` is replaced by the URL-encoded identifier.
pub const DEFAULT_SEARCH_URL: &str =
    "https://shopping.bookoff.co.jp/search/?search_word={q}&category=game";

/// Iteration caps, settle delays and timeouts for one lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeSettings {
    pub search_url: String,
    pub navigation_timeout: Duration,
    pub max_load_iterations: u32,
    pub load_settle: Duration,
    pub detail_timeout: Duration,
    pub modal_timeout: Duration,
    pub modal_scroll_iterations: u32,
    pub modal_settle: Duration,
    pub poll_interval: Duration,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            navigation_timeout: Duration::from_secs(60),
            max_load_iterations: 80,
            load_settle: Duration::from_millis(800),
            detail_timeout: Duration::from_secs(10),
            modal_timeout: Duration::from_secs(10),
            modal_scroll_iterations: 12,
            modal_settle: Duration::from_millis(400),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ScrapeSettings {
    /// Builds the search URL for an identifier.
    pub fn search_url_for(&self, isbn: &Isbn) -> String {
        self.search_url.replace("{q}", &urlencoding::encode(isbn.as_str()))
    }
}

/// Outcome of expanding the result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub clicks: u32,
    pub iterations: u32,
    pub rows: usize,
}

/// Runs a full lookup on `page` and closes it exactly once, whatever the outcome.
pub async fn run_lookup<P: PageDriver>(
    mut page: P,
    isbn: &Isbn,
    settings: &ScrapeSettings,
) -> Result<Vec<ShopAvailability>, LookupFailure> {
    let result = fetch_shops(&page, isbn, settings).await;

    if let Err(e) = page.close().await {
        warn!("Failed to close browser session: {}", e);
    }

    match &result {
        Ok(records) => info!("Finished {}: {} shops", isbn, records.len()),
        Err(e) => warn!(kind = e.kind(), "Lookup for {} failed: {}", isbn, e),
    }

    result
}

/// Runs every stage against an already open page. Does not close the page.
pub async fn fetch_shops<P: PageDriver>(
    page: &P,
    isbn: &Isbn,
    settings: &ScrapeSettings,
) -> Result<Vec<ShopAvailability>, LookupFailure> {
    let url = settings.search_url_for(isbn);
    page.goto(&url, settings.navigation_timeout).await?;
    debug!("Search page loaded: {}", url);

    let report = load_all_rows(page, settings).await?;
    debug!("Rows loaded: {}", report.rows);

    let parser = Parser::new(isbn.clone());
    let html = page.content().await?;
    let Some(row) = parser.find_target_row(&html) else {
        return Err(LookupFailure::RowNotFound { rows: report.rows });
    };
    debug!("Target row found at index {}", row);

    open_store_modal(page, row, settings).await?;
    scroll_modal(page, settings).await?;

    let html = page.outer_html(&Locator::first(modal::ROOT)).await?.unwrap_or_default();
    Ok(parser.extract_shops(&html))
}

/// Scrolls and clicks "load more" until the row count stops changing.
pub async fn load_all_rows<P: PageDriver>(
    page: &P,
    settings: &ScrapeSettings,
) -> Result<LoadReport, DriverError> {
    let load_more = Locator::first(search::LOAD_MORE);
    let mut report = LoadReport { clicks: 0, iterations: 0, rows: page.count(search::ROW).await? };

    while report.iterations < settings.max_load_iterations {
        report.iterations += 1;

        page.scroll_to_bottom().await?;
        if page.is_visible(&load_more).await? {
            page.click(&load_more, ClickMode::Normal).await?;
            report.clicks += 1;
        }

        page.pause(settings.load_settle).await;

        let rows = page.count(search::ROW).await?;
        if rows == report.rows {
            break;
        }
        report.rows = rows;
    }

    info!("load_more clicks = {}", report.clicks);
    Ok(report)
}

/// Goes from the matched row to a visible store modal.
pub async fn open_store_modal<P: PageDriver>(
    page: &P,
    row: usize,
    settings: &ScrapeSettings,
) -> Result<(), LookupFailure> {
    // Overlapping badges cover the row links, so clicks are forced
    let link = Locator::nth(search::ROW, row).descendant(search::ROW_LINK);
    page.click(&link, ClickMode::Forced).await?;
    debug!("Clicked row link, waiting for detail page");

    match page.wait_for_navigation(settings.navigation_timeout).await {
        Ok(()) => {}
        // The trigger wait below decides whether the detail view ever arrived
        Err(DriverError::Timeout(msg)) => debug!("Detail navigation still pending: {}", msg),
        Err(e) => return Err(e.into()),
    }

    if !wait_for_present(page, modal::TRIGGER, settings.detail_timeout, settings.poll_interval)
        .await?
    {
        return Err(LookupFailure::NoStoreModal);
    }

    page.click(&Locator::first(modal::TRIGGER), ClickMode::Forced).await?;

    let body = Locator::first(modal::BODY);
    if !wait_for_visible(page, &body, settings.modal_timeout, settings.poll_interval).await? {
        return Err(LookupFailure::ModalTimeout {
            timeout_ms: millis(settings.modal_timeout),
        });
    }

    debug!("Store modal open");
    Ok(())
}

/// Scrolls the modal body until its height stops growing. Returns the number
/// of scroll steps taken.
pub async fn scroll_modal<P: PageDriver>(
    page: &P,
    settings: &ScrapeSettings,
) -> Result<u32, DriverError> {
    let body = Locator::first(modal::BODY);
    let mut previous = 0;
    let mut steps = 0;

    for _ in 0..settings.modal_scroll_iterations {
        let height = page.scroll_height(&body).await?;
        if height == previous {
            break;
        }

        page.scroll_by_page(&body).await?;
        page.pause(settings.modal_settle).await;
        previous = height;
        steps += 1;
    }

    debug!("Modal scrolled {} times (height {})", steps, previous);
    Ok(steps)
}

/// Polls until at least one element matches `selector`, or `timeout` elapses.
/// Transient script errors while the page is between documents count as "not yet".
async fn wait_for_present<P: PageDriver>(
    page: &P,
    selector: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<bool, DriverError> {
    let mut waited = Duration::ZERO;

    loop {
        match page.count(selector).await {
            Ok(n) if n > 0 => return Ok(true),
            Ok(_) => {}
            Err(e) if e.is_transient() => debug!("Waiting for {}: {}", selector, e),
            Err(e) => return Err(e),
        }
        if waited >= timeout {
            return Ok(false);
        }
        page.pause(interval).await;
        waited += interval;
    }
}

/// Polls until the element is visible, or `timeout` elapses.
async fn wait_for_visible<P: PageDriver>(
    page: &P,
    locator: &Locator,
    timeout: Duration,
    interval: Duration,
) -> Result<bool, DriverError> {
    let mut waited = Duration::ZERO;

    loop {
        match page.is_visible(locator).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) if e.is_transient() => debug!("Waiting for {}: {}", locator, e),
            Err(e) => return Err(e),
        }
        if waited >= timeout {
            return Ok(false);
        }
        page.pause(interval).await;
        waited += interval;
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
