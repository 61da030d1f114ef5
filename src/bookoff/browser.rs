//! Chrome/Chromium page driver over CDP, using chromiumoxide.

use crate::bookoff::driver::{ClickMode, DriverError, Locator, PageDriver};
use async_trait::async_trait;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 900;

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Cdp(err.to_string())
    }
}

/// How the browser process is started.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Explicit Chrome binary; chromiumoxide searches the usual locations otherwise
    pub chrome_path: Option<PathBuf>,
    /// Delay inserted before every navigation, click and scroll
    pub slow_mo: Duration,
    /// Upper bound for a single CDP request
    pub request_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            slow_mo: Duration::ZERO,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// One browser process with a single page, torn down by [`PageDriver::close`].
pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    slow_mo: Duration,
    closed: bool,
}

impl ChromeSession {
    /// Launches a fresh browser and opens a blank page.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder();

        // chromiumoxide is headless unless asked otherwise
        if !options.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(options.request_timeout)
            .arg("--lang=ja-JP")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox");

        let config = builder.build().map_err(|e| {
            DriverError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) =
            Browser::launch(config).await.map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                trace!(?event, "browser event");
            }
            debug!("browser event handler exited");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(DriverError::LaunchFailed(e.to_string()));
            }
        };

        info!(headless = options.headless, "launched browser");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            slow_mo: options.slow_mo,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    async fn slow_down(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T, DriverError> {
        self.ensure_open()?;

        self.page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::JsEvalFailed(e.to_string()))?
            .into_value()
            .map_err(|e| DriverError::JsEvalFailed(format!("{e:?}")))
    }
}

#[async_trait]
impl PageDriver for ChromeSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.slow_down().await;
        debug!("GET {}", url);

        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DriverError::NavigationFailed(e.to_string())),
            Err(_) => Err(DriverError::Timeout(format!(
                "navigation to {} took longer than {}ms",
                url,
                timeout.as_millis()
            ))),
        }
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        self.slow_down().await;
        self.eval::<bool>("window.scrollTo(0, document.body.scrollHeight); true").await?;
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize, DriverError> {
        self.eval(&count_script(selector)).await
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, DriverError> {
        self.eval(&visible_script(locator)).await
    }

    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.slow_down().await;
        debug!(%locator, ?mode, "click");

        match mode {
            ClickMode::Forced => {
                let clicked: bool = self.eval(&forced_click_script(locator)).await?;
                if !clicked {
                    return Err(DriverError::ElementNotFound(locator.to_string()));
                }
            }
            ClickMode::Normal => {
                let mut elements = self.page.find_elements(locator.selector.as_str()).await?;
                if locator.nth >= elements.len() {
                    return Err(DriverError::ElementNotFound(locator.to_string()));
                }
                let mut element = elements.swap_remove(locator.nth);
                if let Some(inner) = &locator.inner {
                    element = element.find_element(inner.as_str()).await.map_err(|_| {
                        DriverError::ElementNotFound(locator.to_string())
                    })?;
                }
                element.click().await?;
            }
        }

        Ok(())
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        Ok(self.page.content().await?)
    }

    async fn outer_html(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        // A `null` result has no value to deserialize, so missing elements yield ''
        let html: String = self.eval(&outer_html_script(locator)).await?;
        Ok(non_empty(html))
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), DriverError> {
        self.ensure_open()?;

        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DriverError::NavigationFailed(e.to_string())),
            Err(_) => Err(DriverError::Timeout(format!(
                "navigation did not finish within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn scroll_height(&self, locator: &Locator) -> Result<u64, DriverError> {
        self.eval(&with_element(locator, "return el.scrollHeight;", "0")).await
    }

    async fn scroll_by_page(&self, locator: &Locator) -> Result<(), DriverError> {
        self.slow_down().await;
        let script =
            with_element(locator, "el.scrollBy(0, el.clientHeight); return true;", "false");
        self.eval::<bool>(&script).await?;
        Ok(())
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let browser = self.browser.get_mut();
        let result = browser.close().await;
        let _ = browser.wait().await;
        self.handler.abort();
        result?;

        info!("closed browser session");
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // The browser process itself is killed when `Browser` drops
        self.handler.abort();
    }
}

/// Encodes a string as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Expression evaluating to the located element, or `null`.
fn element_expr(locator: &Locator) -> String {
    let mut expr = format!(
        "document.querySelectorAll({})[{}]",
        js_string(&locator.selector),
        locator.nth
    );
    if let Some(inner) = &locator.inner {
        expr.push_str(&format!("?.querySelector({})", js_string(inner)));
    }
    format!("({} ?? null)", expr)
}

/// Wraps `body` in a function that binds `el`, returning `missing` if absent.
fn with_element(locator: &Locator, body: &str, missing: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return {}; {} }})()",
        element_expr(locator),
        missing,
        body
    )
}

fn count_script(selector: &str) -> String {
    format!("document.querySelectorAll({}).length", js_string(selector))
}

fn visible_script(locator: &Locator) -> String {
    with_element(
        locator,
        "const style = window.getComputedStyle(el); \
         if (style.visibility === 'hidden' || style.display === 'none') return false; \
         const rect = el.getBoundingClientRect(); \
         return rect.width > 0 && rect.height > 0;",
        "false",
    )
}

fn forced_click_script(locator: &Locator) -> String {
    with_element(locator, "el.click(); return true;", "false")
}

fn outer_html_script(locator: &Locator) -> String {
    with_element(locator, "return el.outerHTML;", "''")
}

fn non_empty(html: String) -> Option<String> {
    if html.is_empty() {
        None
    } else {
        Some(html)
    }
}
