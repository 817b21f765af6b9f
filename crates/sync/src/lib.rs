//! geosheet - Shopify order shipping addresses to Google Sheets.
//!
//! Reads every order's shipping address from the Shopify Admin REST API and
//! writes one spreadsheet row per order, in order, starting below a header
//! row.
//!
//! # Architecture
//!
//! - [`shopify`] - Paginated order source (`since_id` cursors)
//! - [`sheets`] - Google OAuth, token cache, and the row sink
//! - [`pacer`] - Write rate limiting for the Sheets quota
//! - [`driver`] - The export loop tying source, pacer and sink together
//! - [`config`] - Environment-based configuration
//!
//! Collaborators are traits ([`OrderSource`], [`RowSink`], [`Pacer`],
//! [`TokenStore`]) so the driver can run against in-memory doubles.
//!
//! [`OrderSource`]: shopify::OrderSource
//! [`RowSink`]: sheets::RowSink
//! [`Pacer`]: pacer::Pacer
//! [`TokenStore`]: sheets::TokenStore

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod driver;
pub mod error;
pub mod pacer;
pub mod sheets;
pub mod shopify;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::time::Duration;

pub use config::{ConfigError, SyncConfig};
pub use driver::{BoundaryMode, SyncDriver, SyncReport, SyncSettings};
pub use error::{ErrorKind, SyncError};

/// User agent sent with every outbound request.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}
