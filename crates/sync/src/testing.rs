//! In-memory collaborators for exercising the driver without network access.
//!
//! Enabled for unit tests and by the `testing` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use geosheet_core::{DestinationRow, Order, OrderId, Page, RowNumber, ShippingAddress};

use crate::pacer::Pacer;
use crate::sheets::{AuthError, RowSink, SheetsError, StoredToken, TokenStore};
use crate::shopify::{OrderSource, OrderSourceError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `count` orders with ascending ids starting at 1000 and addresses whose
/// city is `City {k}` for the order at index `k`.
#[must_use]
pub fn fixture_orders(count: usize) -> Vec<Order> {
    (0..count)
        .map(|k| {
            #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
            let (id, offset) = (1000 + k as i64, k as f64 / 1000.0);
            Order::new(
                OrderId::new(id),
                ShippingAddress {
                    address1: Some(format!("{k} Main St")),
                    address2: None,
                    city: Some(format!("City {k}")),
                    province: Some("Ontario".to_string()),
                    country: Some("Canada".to_string()),
                    zip: Some("K2P0V6".to_string()),
                    latitude: Some(45.0 + offset),
                    longitude: Some(-75.0 - offset),
                },
            )
        })
        .collect()
}

// =============================================================================
// Order source
// =============================================================================

/// Order source over a fixed, ascending list of orders.
///
/// Pages hold the orders with ids strictly greater than the cursor. Every
/// `fetch_page` cursor is recorded.
#[derive(Debug, Default)]
pub struct MockOrderSource {
    orders: Vec<Order>,
    count: Option<u64>,
    fail_on_fetch: Option<usize>,
    cursors: Mutex<Vec<Option<OrderId>>>,
}

impl MockOrderSource {
    /// Serve `orders`, reporting their length as the count.
    #[must_use]
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            orders,
            ..Self::default()
        }
    }

    /// Report `count` instead of the number of orders held.
    #[must_use]
    pub const fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Fail the fetch with 0-based index `fetch` with HTTP 503.
    #[must_use]
    pub const fn failing_on_fetch(mut self, fetch: usize) -> Self {
        self.fail_on_fetch = Some(fetch);
        self
    }

    /// Cursors passed to `fetch_page`, in call order.
    #[must_use]
    pub fn cursors(&self) -> Vec<Option<OrderId>> {
        lock(&self.cursors).clone()
    }
}

#[async_trait]
impl OrderSource for MockOrderSource {
    async fn count(&self) -> Result<u64, OrderSourceError> {
        Ok(self.count.unwrap_or(self.orders.len() as u64))
    }

    async fn fetch_page(
        &self,
        cursor: Option<OrderId>,
        page_size: u32,
    ) -> Result<Page, OrderSourceError> {
        let fetch = {
            let mut cursors = lock(&self.cursors);
            cursors.push(cursor);
            cursors.len() - 1
        };

        if self.fail_on_fetch == Some(fetch) {
            return Err(OrderSourceError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        }

        let orders = self
            .orders
            .iter()
            .filter(|order| cursor.is_none_or(|cursor| order.id > cursor))
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(orders))
    }
}

// =============================================================================
// Row sink
// =============================================================================

/// Row sink that records every row it accepts.
#[derive(Debug, Default)]
pub struct RecordingSink {
    rows: Mutex<Vec<DestinationRow>>,
    fail_at: Option<RowNumber>,
    revoked_at: Option<RowNumber>,
}

impl RecordingSink {
    /// Accept every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the write to `row` with HTTP 500.
    #[must_use]
    pub fn failing_at(row: RowNumber) -> Self {
        Self {
            fail_at: Some(row),
            ..Self::default()
        }
    }

    /// Fail the write to `row` as if the refresh token had been revoked.
    #[must_use]
    pub fn revoked_at(row: RowNumber) -> Self {
        Self {
            revoked_at: Some(row),
            ..Self::default()
        }
    }

    /// Rows written so far, in write order.
    #[must_use]
    pub fn rows(&self) -> Vec<DestinationRow> {
        lock(&self.rows).clone()
    }
}

#[async_trait]
impl RowSink for RecordingSink {
    async fn write_row(&self, row: &DestinationRow) -> Result<(), SheetsError> {
        if self.fail_at == Some(row.row()) {
            return Err(SheetsError::Api {
                status: 500,
                message: "Internal error encountered.".to_string(),
            });
        }
        if self.revoked_at == Some(row.row()) {
            return Err(SheetsError::Auth(AuthError::Refresh(
                "Token has been expired or revoked.".to_string(),
            )));
        }
        lock(&self.rows).push(row.clone());
        Ok(())
    }
}

// =============================================================================
// Pacer
// =============================================================================

/// Pacer that never waits and counts how often it was asked.
#[derive(Debug, Default)]
pub struct CountingPacer {
    calls: AtomicUsize,
}

impl CountingPacer {
    /// Create a pacer with a zero count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `ready` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn ready(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Token store
// =============================================================================

/// Token store held in memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<StoredToken>>,
    saves: AtomicUsize,
}

impl MemoryTokenStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `token`.
    #[must_use]
    pub fn with_token(token: StoredToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
            saves: AtomicUsize::new(0),
        }
    }

    /// The token currently held.
    #[must_use]
    pub fn token(&self) -> Option<StoredToken> {
        lock(&self.token).clone()
    }

    /// Number of `save` calls.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<StoredToken>, AuthError> {
        Ok(self.token())
    }

    async fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        *lock(&self.token) = Some(token.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
