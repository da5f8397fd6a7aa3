//! Order domain types.
//!
//! Orders are immutable snapshots of cart contents at checkout time. Line
//! items and amounts never change after creation; only the status may move
//! later, and nothing in this API mutates it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tamarind_core::{OrderId, OrderStatus, ProductId, UserId};

/// A shipping destination captured with the order.
///
/// Free-form structured address; `line1`, `city`, `state`, and `zip` are
/// required at checkout, the rest is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// The first required field that is missing or blank, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        let required: [(&'static str, &Option<String>); 4] = [
            ("line1", &self.line1),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
        ];
        required
            .into_iter()
            .find(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| name)
    }
}

/// One line in an order, copied from the cart at placement time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_sku: Option<String>,
    pub title: String,
    pub price: Decimal,
    pub qty: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
}

impl OrderItem {
    /// Line total: unit price snapshot times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.qty)
    }
}

/// Computed amounts for an order.
///
/// Invariant: `subtotal` is the sum of line totals and
/// `total = subtotal + shipping`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAmounts {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// A finalized order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub amounts: OrderAmounts,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            line1: Some("12 Hill Road".to_string()),
            city: Some("Pune".to_string()),
            state: Some("MH".to_string()),
            zip: Some("411001".to_string()),
            ..ShippingAddress::default()
        }
    }

    #[test]
    fn test_missing_field_none_when_complete() {
        assert_eq!(address().missing_field(), None);
    }

    #[test]
    fn test_missing_field_reports_first_gap() {
        let mut addr = address();
        addr.city = None;
        assert_eq!(addr.missing_field(), Some("city"));

        addr.line1 = Some("   ".to_string());
        assert_eq!(addr.missing_field(), Some("line1"));
    }

    #[test]
    fn test_deserialize_tolerates_partial_bodies() {
        let addr: ShippingAddress = serde_json::from_str(r#"{"line1":"12 Hill Road"}"#).unwrap();
        assert_eq!(addr.missing_field(), Some("city"));
    }
}
