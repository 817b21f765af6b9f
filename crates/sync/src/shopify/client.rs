//! Shopify Admin REST API client for orders.

use async_trait::async_trait;
use geosheet_core::{Order, OrderId, Page};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{OrderSource, OrderSourceError};
use crate::config::ShopifyConfig;

/// Fields requested for every order.
const ORDER_FIELDS: &str = "id,shipping_address";

/// Longest response body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Response from `GET orders/count.json`.
#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// Response from `GET orders.json`.
#[derive(Debug, Deserialize)]
struct OrdersResponse {
    orders: Vec<Order>,
}

/// Order source backed by the Shopify Admin REST API.
///
/// # Authentication
///
/// Uses private-app basic auth (API key + password). Implements `Debug`
/// manually to redact the password.
#[derive(Clone)]
pub struct ShopifyOrderSource {
    client: reqwest::Client,
    /// `{origin}/admin/api/{version}/`
    api_root: Url,
    api_key: String,
    api_password: SecretString,
    order_status: Option<String>,
}

impl std::fmt::Debug for ShopifyOrderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyOrderSource")
            .field("api_root", &self.api_root.as_str())
            .field("api_key", &self.api_key)
            .field("api_password", &"[REDACTED]")
            .field("order_status", &self.order_status)
            .finish_non_exhaustive()
    }
}

impl ShopifyOrderSource {
    /// Create a client for the store in `config`.
    ///
    /// # Errors
    ///
    /// Returns `OrderSourceError::InvalidUrl` if the store domain or API
    /// version do not form a valid URL.
    pub fn new(client: reqwest::Client, config: &ShopifyConfig) -> Result<Self, OrderSourceError> {
        let origin = format!("https://{}", store_host(&config.store));
        Self::with_origin(client, &origin, config)
    }

    /// Create a client against an explicit origin (scheme, host, port).
    ///
    /// Used to point the client at a proxy or a local mock server.
    ///
    /// # Errors
    ///
    /// Returns `OrderSourceError::InvalidUrl` if `origin` is not a valid URL.
    pub fn with_origin(
        client: reqwest::Client,
        origin: &str,
        config: &ShopifyConfig,
    ) -> Result<Self, OrderSourceError> {
        let api_root = Url::parse(origin)?.join(&format!(
            "admin/api/{}/",
            urlencoding::encode(&config.api_version)
        ))?;

        Ok(Self {
            client,
            api_root,
            api_key: config.api_key.clone(),
            api_password: config.api_password.clone(),
            order_status: config.order_status.clone(),
        })
    }

    /// Base URL all endpoint paths are resolved against.
    #[must_use]
    pub const fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Send an authenticated GET and return the raw body.
    ///
    /// The body is decoded by the caller so that transport failures and
    /// schema mismatches surface as different errors.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<u8>, OrderSourceError> {
        let url = self.api_root.join(path)?;

        let mut request = self
            .client
            .get(url)
            .basic_auth(&self.api_key, Some(self.api_password.expose_secret()))
            .query(query);
        if let Some(status) = &self.order_status {
            request = request.query(&[("status", status)]);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| body.is_char_boundary(i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(OrderSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Store domain without a scheme or trailing slash.
fn store_host(store: &str) -> &str {
    let store = store.trim();
    let host = store
        .strip_prefix("https://")
        .or_else(|| store.strip_prefix("http://"))
        .unwrap_or(store);
    host.trim_end_matches('/')
}

#[async_trait]
impl OrderSource for ShopifyOrderSource {
    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64, OrderSourceError> {
        let body = self.get("orders/count.json", &[]).await?;
        let response: CountResponse = serde_json::from_slice(&body)?;

        debug!(count = response.count, "Fetched order count");
        Ok(response.count)
    }

    #[instrument(skip(self), fields(cursor = ?cursor))]
    async fn fetch_page(
        &self,
        cursor: Option<OrderId>,
        page_size: u32,
    ) -> Result<Page, OrderSourceError> {
        let mut query = vec![
            ("limit", page_size.to_string()),
            ("fields", ORDER_FIELDS.to_string()),
        ];
        if let Some(since_id) = cursor {
            query.push(("since_id", since_id.to_string()));
        }

        let body = self.get("orders.json", &query).await?;
        let response: OrdersResponse = serde_json::from_slice(&body)?;
        let page = Page::new(response.orders);

        if !page.is_ascending() {
            warn!(
                orders = page.len(),
                "Order page is not in ascending id order; cursor pagination may skip or repeat orders"
            );
        }

        debug!(orders = page.len(), "Fetched order page");
        Ok(page)
    }
}
