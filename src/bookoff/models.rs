//! Data models for identifiers, shop availability records and lookup failures.

use crate::bookoff::driver::DriverError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A normalized ISBN or JAN code: ASCII digits only, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Isbn(String);

impl Isbn {
    /// Normalizes raw input by keeping only its digits.
    ///
    /// Full-width digits are folded to ASCII first, so `９７８-４` becomes `9784`.
    pub fn parse(raw: &str) -> Result<Self, InvalidIsbn> {
        let digits: String = raw.chars().filter_map(ascii_digit).collect();

        if digits.is_empty() {
            return Err(InvalidIsbn(raw.to_string()));
        }

        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Isbn {
    type Err = InvalidIsbn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Raw input that contained no digits at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ISBN/JAN '{0}': no digits found")]
pub struct InvalidIsbn(pub String);

/// Maps ASCII and full-width digits to their ASCII form.
pub(crate) fn ascii_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32),
        _ => None,
    }
}

/// One shop carrying the item, as listed in the store availability modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopAvailability {
    /// Identifier the lookup was run for
    pub isbn: Isbn,
    /// Shop name, trimmed and unique within one lookup
    pub shop: String,
    /// Price in yen, `None` when the modal shows no parsable price
    pub price: Option<u64>,
}

impl ShopAvailability {
    pub fn new(isbn: Isbn, shop: impl Into<String>, price: Option<u64>) -> Self {
        Self { isbn, shop: shop.into(), price }
    }
}

/// Why a lookup produced no records.
#[derive(Debug, Error)]
pub enum LookupFailure {
    #[error("no result row matches the identifier ({rows} rows loaded)")]
    RowNotFound { rows: usize },

    #[error("no store modal available for this item")]
    NoStoreModal,

    #[error("store modal did not open within {timeout_ms}ms")]
    ModalTimeout { timeout_ms: u64 },

    #[error(transparent)]
    Browser(#[from] DriverError),
}

impl LookupFailure {
    /// Short machine-friendly tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupFailure::RowNotFound { .. } => "not_found",
            LookupFailure::NoStoreModal => "missing_affordance",
            LookupFailure::ModalTimeout { .. } => "timeout",
            LookupFailure::Browser(_) => "browser",
        }
    }
}
