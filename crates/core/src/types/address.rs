//! Shipping address type.

use serde::{Deserialize, Serialize};

/// Shipping address attached to an order.
///
/// Field names match the Shopify REST `shipping_address` object. Every field
/// may be missing or `null` in the source payload; coordinates are only
/// present once Shopify has geocoded the address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Street address line 1.
    #[serde(default)]
    pub address1: Option<String>,
    /// Street address line 2 (apartment, suite, ...).
    #[serde(default)]
    pub address2: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// State or province.
    #[serde(default)]
    pub province: Option<String>,
    /// Country name.
    #[serde(default)]
    pub country: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub zip: Option<String>,
    /// Latitude in decimal degrees.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ShippingAddress {
    /// Returns true when no field carries a value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.address1.is_none()
            && self.address2.is_none()
            && self.city.is_none()
            && self.province.is_none()
            && self.country.is_none()
            && self.zip.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }
}
