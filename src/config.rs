//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::bookoff::browser::LaunchOptions;
use crate::bookoff::pipeline::{ScrapeSettings, DEFAULT_SEARCH_URL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Search URL template, `{q}` is replaced by the identifier
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Chrome/Chromium executable (auto-detected if unset)
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Delay before every browser action in milliseconds
    #[serde(default)]
    pub slow_mo_ms: u64,

    /// Timeout for loading the search page
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Maximum scroll/"load more" rounds on the result list
    #[serde(default = "default_max_load_iterations")]
    pub max_load_iterations: u32,

    /// Pause after each load round
    #[serde(default = "default_load_settle_ms")]
    pub load_settle_ms: u64,

    /// How long to wait for the store button on the detail page
    #[serde(default = "default_modal_timeout_ms")]
    pub detail_timeout_ms: u64,

    /// How long to wait for the store modal to become visible
    #[serde(default = "default_modal_timeout_ms")]
    pub modal_timeout_ms: u64,

    /// Maximum scroll steps inside the store modal
    #[serde(default = "default_modal_scroll_iterations")]
    pub modal_scroll_iterations: u32,

    /// Pause after each modal scroll step
    #[serde(default = "default_modal_settle_ms")]
    pub modal_settle_ms: u64,

    /// Interval between checks while waiting for an element
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout_ms() -> u64 {
    60_000
}

fn default_max_load_iterations() -> u32 {
    80
}

fn default_load_settle_ms() -> u64 {
    800
}

fn default_modal_timeout_ms() -> u64 {
    10_000
}

fn default_modal_scroll_iterations() -> u32 {
    12
}

fn default_modal_settle_ms() -> u64 {
    400
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            headless: default_headless(),
            chrome_path: None,
            slow_mo_ms: 0,
            navigation_timeout_ms: default_navigation_timeout_ms(),
            format: OutputFormat::Json,
            max_load_iterations: default_max_load_iterations(),
            load_settle_ms: default_load_settle_ms(),
            detail_timeout_ms: default_modal_timeout_ms(),
            modal_timeout_ms: default_modal_timeout_ms(),
            modal_scroll_iterations: default_modal_scroll_iterations(),
            modal_settle_ms: default_modal_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("bookoff-shops").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("BOOKOFF_SEARCH_URL") {
            self.search_url = url;
        }

        if let Ok(headless) = std::env::var("BOOKOFF_HEADLESS") {
            if let Ok(h) = headless.parse() {
                self.headless = h;
            }
        }

        if let Ok(chrome) = std::env::var("BOOKOFF_CHROME") {
            self.chrome_path = Some(PathBuf::from(chrome));
        }

        if let Ok(slow_mo) = std::env::var("BOOKOFF_SLOW_MO") {
            if let Ok(ms) = slow_mo.parse() {
                self.slow_mo_ms = ms;
            }
        }

        self
    }

    /// Timeouts, caps and settle delays for the lookup pipeline.
    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            search_url: self.search_url.clone(),
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            max_load_iterations: self.max_load_iterations,
            load_settle: Duration::from_millis(self.load_settle_ms),
            detail_timeout: Duration::from_millis(self.detail_timeout_ms),
            modal_timeout: Duration::from_millis(self.modal_timeout_ms),
            modal_scroll_iterations: self.modal_scroll_iterations,
            modal_settle: Duration::from_millis(self.modal_settle_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// How to start the browser.
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            slow_mo: Duration::from_millis(self.slow_mo_ms),
            request_timeout: Duration::from_millis(self.navigation_timeout_ms),
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: json, table, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
