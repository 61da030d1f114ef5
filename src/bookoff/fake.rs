//! Scripted in-memory page for pipeline tests. Pauses advance a virtual
//! clock instead of sleeping.

use crate::bookoff::driver::{ClickMode, DriverError, Locator, PageDriver};
use crate::bookoff::selectors::{modal, search};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ITEM_HEIGHT: u64 = 40;

/// A result row; the product code sits either on the row or on a nested image.
#[derive(Debug, Clone)]
pub struct FakeRow {
    code: String,
    nested: bool,
}

impl FakeRow {
    pub fn direct(code: &str) -> Self {
        Self { code: code.to_string(), nested: false }
    }

    pub fn nested(code: &str) -> Self {
        Self { code: code.to_string(), nested: true }
    }

    fn html(&self) -> String {
        if self.nested {
            format!(
                r#"<div class="productItem"><a class="productItem__imageLink" href="/goods/{0}"><img data-product-code="{0}"></a></div>"#,
                self.code
            )
        } else {
            format!(
                r#"<li class="productItem" data-product-code="{0}"><a class="productItem__link" href="/goods/{0}">{0}</a></li>"#,
                self.code
            )
        }
    }
}

/// One entry in the store modal.
#[derive(Debug, Clone)]
pub struct FakeShop {
    name: String,
    price: String,
}

impl FakeShop {
    pub fn new(name: &str, price: &str) -> Self {
        Self { name: name.to_string(), price: price.to_string() }
    }

    fn html(&self) -> String {
        format!(
            r#"<li class="modalStoreInformation__item"><a class="modalStoreInformation__link" href="/shop">{}</a><span class="modalStoreInformation__price">{}</span></li>"#,
            self.name, self.price
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloseCounter(Arc<AtomicUsize>);

impl CloseCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PauseClock(Arc<Mutex<Duration>>);

impl PauseClock {
    pub fn total(&self) -> Duration {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug)]
struct State {
    batches: Vec<Vec<FakeRow>>,
    loaded: usize,
    infinite_scroll: bool,
    load_clicks: usize,
    scrolls: usize,
    opened_row: Option<usize>,
    has_trigger: bool,
    modal_opens: bool,
    modal_open: bool,
    shops: Vec<FakeShop>,
    scroll_step: usize,
    rendered: usize,
    fail_goto: bool,
    lost_contexts: usize,
    navigation_waits: usize,
    closed: bool,
}

impl State {
    fn rows(&self) -> impl Iterator<Item = &FakeRow> {
        self.batches.iter().take(self.loaded).flatten()
    }

    fn load_more_visible(&self) -> bool {
        !self.infinite_scroll && self.loaded < self.batches.len()
    }

    fn trigger_present(&self) -> bool {
        self.opened_row.is_some() && self.has_trigger
    }
}

pub struct FakePage {
    state: Mutex<State>,
    closes: CloseCounter,
    clock: PauseClock,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                batches: Vec::new(),
                loaded: 0,
                infinite_scroll: false,
                load_clicks: 0,
                scrolls: 0,
                opened_row: None,
                has_trigger: true,
                modal_opens: true,
                modal_open: false,
                shops: Vec::new(),
                scroll_step: 10,
                rendered: 0,
                fail_goto: false,
                lost_contexts: 0,
                navigation_waits: 0,
                closed: false,
            }),
            closes: CloseCounter::default(),
            clock: PauseClock::default(),
        }
    }

    /// Rows arrive in batches: the first is present after navigation, each
    /// later one needs a "load more" click (or a scroll, with `infinite_scroll`).
    pub fn with_batches(self, batches: Vec<Vec<FakeRow>>) -> Self {
        self.update(|s| {
            s.loaded = batches.len().min(1);
            s.batches = batches;
        })
    }

    pub fn with_shops(self, shops: Vec<FakeShop>) -> Self {
        self.update(|s| s.shops = shops)
    }

    /// Number of modal items that materialize per scroll.
    pub fn with_scroll_step(self, step: usize) -> Self {
        self.update(|s| s.scroll_step = step)
    }

    pub fn infinite_scroll(self) -> Self {
        self.update(|s| s.infinite_scroll = true)
    }

    pub fn without_trigger(self) -> Self {
        self.update(|s| s.has_trigger = false)
    }

    pub fn modal_never_opens(self) -> Self {
        self.update(|s| s.modal_opens = false)
    }

    pub fn failing_goto(self) -> Self {
        self.update(|s| s.fail_goto = true)
    }

    /// The first `n` trigger checks after the row click fail the way a script
    /// does when navigation has destroyed its execution context.
    pub fn losing_context(self, n: usize) -> Self {
        self.update(|s| s.lost_contexts = n)
    }

    pub fn close_counter(&self) -> CloseCounter {
        self.closes.clone()
    }

    pub fn pause_counter(&self) -> PauseClock {
        self.clock.clone()
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().load_clicks
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn rendered_shops(&self) -> usize {
        self.state.lock().unwrap().rendered
    }

    pub fn navigation_waits(&self) -> usize {
        self.state.lock().unwrap().navigation_waits
    }

    pub fn opened_row(&self) -> Option<usize> {
        self.state.lock().unwrap().opened_row
    }

    fn update(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(DriverError::Closed);
        }
        f(&mut state)
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.with_state(|s| {
            if s.fail_goto {
                return Err(DriverError::NavigationFailed(format!("{}: net::ERR_FAILED", url)));
            }
            Ok(())
        })
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        self.with_state(|s| {
            s.scrolls += 1;
            if s.infinite_scroll && s.loaded < s.batches.len() {
                s.loaded += 1;
            }
            Ok(())
        })
    }

    async fn count(&self, selector: &str) -> Result<usize, DriverError> {
        self.with_state(|s| {
            if selector == modal::TRIGGER && s.opened_row.is_some() && s.lost_contexts > 0 {
                s.lost_contexts -= 1;
                return Err(DriverError::JsEvalFailed(
                    "Cannot find context with specified id".to_string(),
                ));
            }

            Ok(match selector {
                search::ROW => s.rows().count(),
                modal::TRIGGER => usize::from(s.trigger_present()),
                _ => 0,
            })
        })
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, DriverError> {
        self.with_state(|s| {
            Ok(match locator.selector.as_str() {
                search::LOAD_MORE => s.load_more_visible(),
                modal::BODY => s.modal_open,
                _ => false,
            })
        })
    }

    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<(), DriverError> {
        self.with_state(|s| {
            let not_found = || DriverError::ElementNotFound(locator.to_string());

            match (locator.selector.as_str(), locator.inner.as_deref()) {
                (search::LOAD_MORE, None) if s.load_more_visible() => {
                    s.loaded += 1;
                    s.load_clicks += 1;
                }
                (search::ROW, Some(search::ROW_LINK)) if locator.nth < s.rows().count() => {
                    assert_eq!(mode, ClickMode::Forced, "row links are covered by overlays");
                    s.opened_row = Some(locator.nth);
                }
                (modal::TRIGGER, None) if s.trigger_present() => {
                    s.modal_open = s.modal_opens;
                    if s.modal_open {
                        s.rendered = s.scroll_step.min(s.shops.len());
                    }
                }
                _ => return Err(not_found()),
            }
            Ok(())
        })
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<(), DriverError> {
        self.with_state(|s| {
            s.navigation_waits += 1;
            Ok(())
        })
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.with_state(|s| {
            let rows: String = s.rows().map(FakeRow::html).collect();
            let button = if s.load_more_visible() {
                r#"<button class="js-infiniteScroll__loadMore">もっと見る</button>"#
            } else {
                ""
            };
            Ok(format!("<html><body><ul>{}</ul>{}</body></html>", rows, button))
        })
    }

    async fn outer_html(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        self.with_state(|s| {
            if locator.selector != modal::ROOT || !s.modal_open {
                return Ok(None);
            }
            let items: String = s.shops.iter().take(s.rendered).map(FakeShop::html).collect();
            Ok(Some(format!(
                r#"<div id="modalStoreInformation"><div class="modalStoreInformation__body"><ul>{}</ul></div></div>"#,
                items
            )))
        })
    }

    async fn scroll_height(&self, locator: &Locator) -> Result<u64, DriverError> {
        self.with_state(|s| {
            if locator.selector == modal::BODY && s.modal_open {
                Ok(s.rendered as u64 * ITEM_HEIGHT)
            } else {
                Ok(0)
            }
        })
    }

    async fn scroll_by_page(&self, locator: &Locator) -> Result<(), DriverError> {
        self.with_state(|s| {
            if locator.selector == modal::BODY && s.modal_open {
                s.rendered = (s.rendered + s.scroll_step).min(s.shops.len());
            }
            Ok(())
        })
    }

    async fn pause(&self, duration: Duration) {
        *self.clock.0.lock().unwrap() += duration;
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.closes.0.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
