//! Bookoff-specific modules: browser driver, selectors, parsing and the lookup pipeline.

pub mod browser;
pub mod driver;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod selectors;

#[cfg(test)]
pub(crate) mod fake;

pub use browser::{ChromeSession, LaunchOptions};
pub use driver::{ClickMode, DriverError, Locator, PageDriver};
pub use models::{InvalidIsbn, Isbn, LookupFailure, ShopAvailability};
pub use parser::Parser;
pub use pipeline::{run_lookup, ScrapeSettings};
