//! Shopify Admin REST API order source (HIGH PRIVILEGE credentials).
//!
//! # Architecture
//!
//! - Read-only: only the order count and order listing endpoints are used
//! - Cursor pagination via `since_id` (ids strictly greater than the cursor)
//! - Only `id` and `shipping_address` are requested per order
//! - Private-app credentials are sent as a basic-auth header, never in URLs
//!
//! # Example
//!
//! ```rust,ignore
//! use geosheet::shopify::{OrderSource, ShopifyOrderSource};
//!
//! let source = ShopifyOrderSource::new(http, &config.shopify)?;
//!
//! let total = source.count().await?;
//! let first = source.fetch_page(None, 250).await?;
//! let next = source.fetch_page(first.last_id(), 250).await?;
//! ```

mod client;

pub use client::ShopifyOrderSource;

use async_trait::async_trait;
use geosheet_core::{OrderId, Page};
use thiserror::Error;

/// Errors that can occur when reading orders from Shopify.
#[derive(Debug, Error)]
pub enum OrderSourceError {
    /// HTTP request failed (connection, TLS, timeout).
    #[error("Order source unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// Shopify answered with a non-success status.
    #[error("Order source returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Response body did not match the expected schema.
    #[error("Malformed order source response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured store domain does not form a valid URL.
    #[error("Invalid order source URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A paginated source of orders.
///
/// Pages are expected in ascending id order; implementations pass through the
/// source's ordering without re-sorting.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Total number of orders at call time.
    ///
    /// Not guaranteed to agree with what later page fetches return.
    async fn count(&self) -> Result<u64, OrderSourceError>;

    /// Fetch up to `page_size` orders with ids strictly greater than `cursor`,
    /// or the first `page_size` orders when `cursor` is `None`.
    ///
    /// An empty page is a valid result.
    async fn fetch_page(
        &self,
        cursor: Option<OrderId>,
        page_size: u32,
    ) -> Result<Page, OrderSourceError>;
}
