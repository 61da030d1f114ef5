//! Shop lookup command implementation.

use crate::bookoff::browser::ChromeSession;
use crate::bookoff::pipeline::run_lookup;
use crate::bookoff::{Isbn, PageDriver, ShopAvailability};
use crate::config::Config;
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Looks up the shops stocking one identifier.
pub struct LookupCommand {
    config: Config,
    strict: bool,
}

impl LookupCommand {
    /// Creates a new lookup command.
    pub fn new(config: Config) -> Self {
        Self { config, strict: false }
    }

    /// In strict mode a failed lookup is an error instead of an empty result.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Launches a browser, runs the lookup and returns formatted output.
    pub async fn execute(&self, raw_isbn: &str) -> Result<String> {
        let isbn = Isbn::parse(raw_isbn)?;

        let session = ChromeSession::launch(&self.config.launch_options())
            .await
            .context("Failed to launch browser")?;

        self.execute_with_driver(session, &isbn).await
    }

    /// Runs the lookup on a provided page (for testing).
    pub async fn execute_with_driver<P: PageDriver>(&self, page: P, isbn: &Isbn) -> Result<String> {
        let records = self.records(page, isbn).await?;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_records(&records))
    }

    /// Runs the lookup; failures become an empty list unless in strict mode.
    pub async fn records<P: PageDriver>(
        &self,
        page: P,
        isbn: &Isbn,
    ) -> Result<Vec<ShopAvailability>> {
        info!("Looking up shops for: {}", isbn);

        match run_lookup(page, isbn, &self.config.scrape_settings()).await {
            Ok(records) => Ok(records),
            Err(e) if self.strict => {
                Err(e).with_context(|| format!("Lookup for {} failed", isbn))
            }
            Err(e) => {
                debug!(kind = e.kind(), "Returning empty result");
                Ok(Vec::new())
            }
        }
    }
}
