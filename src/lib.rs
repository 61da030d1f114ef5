//! bookoff-shops - find which Bookoff shops stock an ISBN/JAN
//!
//! Drives a headless Chrome through the store's search results and store
//! availability modal, returning one `{isbn, shop, price}` record per shop.

pub mod bookoff;
pub mod commands;
pub mod config;
pub mod format;

pub use bookoff::models::{Isbn, LookupFailure, ShopAvailability};
pub use config::Config;
