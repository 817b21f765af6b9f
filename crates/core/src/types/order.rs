//! Order and page types.

use serde::{Deserialize, Deserializer, Serialize};

use super::address::ShippingAddress;
use super::id::OrderId;

/// An order as returned by the order listing endpoint.
///
/// Only the fields requested via `fields=id,shipping_address` are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Source-assigned order id.
    pub id: OrderId,
    /// Shipping address. Orders without one (digital goods, pickup) decode
    /// as an empty address.
    #[serde(default, deserialize_with = "null_as_default")]
    pub shipping_address: ShippingAddress,
}

impl Order {
    /// Create an order.
    #[must_use]
    pub const fn new(id: OrderId, shipping_address: ShippingAddress) -> Self {
        Self {
            id,
            shipping_address,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of orders produced by a single listing call.
///
/// Orders keep the order the source returned them in. The source sorts by
/// ascending id; that ordering is trusted, not enforced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    orders: Vec<Order>,
}

impl Page {
    /// Create a page from decoded orders.
    #[must_use]
    pub const fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Number of orders on the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns true if the page holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Order at a local page index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Order> {
        self.orders.get(index)
    }

    /// All orders on the page.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Id of the last order on the page.
    #[must_use]
    pub fn last_id(&self) -> Option<OrderId> {
        self.orders.last().map(|order| order.id)
    }

    /// Id of the second-to-last order on the page.
    #[must_use]
    pub fn second_to_last_id(&self) -> Option<OrderId> {
        let index = self.orders.len().checked_sub(2)?;
        self.orders.get(index).map(|order| order.id)
    }

    /// Returns true if ids are strictly ascending.
    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.orders.windows(2).all(|pair| match pair {
            [a, b] => a.id < b.id,
            _ => true,
        })
    }
}
