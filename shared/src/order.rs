//! Raw order documents as captured from the seller portal
//!
//! The persisted artifact is the verbatim response body; this typed model is
//! used only for normalization and therefore tolerates absent fields. Every
//! field the portal may omit deserializes to a default instead of failing the
//! whole document.

use serde::{Deserialize, Deserializer, Serialize};

/// One captured order, keyed by `orderNumber`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_channel: Option<String>,
    #[serde(default)]
    pub order_fulfillment: Option<String>,
    #[serde(default)]
    pub transaction: Transaction,
    #[serde(default)]
    pub products: Vec<ProductLine>,
    #[serde(default)]
    pub refunds: Vec<RefundEvent>,

    /// Storage key the document was loaded from (traceability, not payload)
    #[serde(skip)]
    pub source_file: Option<String>,
}

/// Monetary totals reported by the portal for one order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub gross_amount: Option<f64>,
    #[serde(default)]
    pub net_amount: Option<f64>,
    #[serde(default)]
    pub fee_amount: Option<f64>,
    #[serde(default)]
    pub direct_fee_amount: Option<f64>,
    #[serde(default)]
    pub product_amount: Option<f64>,
    #[serde(default)]
    pub shipping_amount: Option<f64>,
}

/// One product entry within an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_id")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "de_id")]
    pub sku_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub extended_price: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One refund event against an order.
///
/// A "Full" refund may carry no per-product entries; line-level refund
/// amounts are then not derivable from it, while the order-level total
/// still reflects the event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundEvent {
    #[serde(default, rename = "type")]
    pub refund_type: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub shipping_amount: Option<f64>,
    #[serde(default)]
    pub products: Vec<RefundProduct>,
}

impl RefundEvent {
    /// Whether this event refunds the whole order.
    pub fn is_full(&self) -> bool {
        self.refund_type.as_deref() == Some("Full")
    }
}

/// Per-product portion of a refund event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundProduct {
    #[serde(default, deserialize_with = "de_id")]
    pub sku_id: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Portal payloads carry ids as either JSON numbers or strings.
fn de_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_document() {
        let json = r#"{
            "orderNumber": "A1B2C3D4-000001-00001",
            "createdAt": "2024-03-01T12:30:00Z",
            "status": "Shipped",
            "orderChannel": "Marketplace",
            "orderFulfillment": "Normal",
            "transaction": {
                "grossAmount": 25.50,
                "netAmount": 22.10,
                "feeAmount": 3.40,
                "directFeeAmount": 0.0,
                "productAmount": 21.00,
                "shippingAmount": 4.50
            },
            "products": [
                {"name": "Widget", "productId": 123, "skuId": 456,
                 "quantity": 2, "unitPrice": 10.50, "extendedPrice": 21.00,
                 "url": "https://portal.example/p/123"}
            ],
            "refunds": [
                {"type": "Partial", "amount": 5.00, "shippingAmount": 0.0,
                 "products": [{"skuId": 456, "amount": 5.00}]}
            ]
        }"#;

        let order: RawOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_number, "A1B2C3D4-000001-00001");
        assert_eq!(order.transaction.gross_amount, Some(25.50));
        // Numeric ids come out as strings
        assert_eq!(order.products[0].sku_id.as_deref(), Some("456"));
        assert_eq!(order.products[0].product_id.as_deref(), Some("123"));
        assert_eq!(order.refunds[0].products[0].sku_id.as_deref(), Some("456"));
        assert!(!order.refunds[0].is_full());
    }

    #[test]
    fn test_deserialize_sparse_document() {
        // Only the order number present; everything else defaults
        let order: RawOrder =
            serde_json::from_str(r#"{"orderNumber": "X"}"#).unwrap();
        assert_eq!(order.order_number, "X");
        assert!(order.created_at.is_none());
        assert!(order.products.is_empty());
        assert!(order.refunds.is_empty());
        assert_eq!(order.transaction.gross_amount, None);
    }

    #[test]
    fn test_full_refund_without_products() {
        let json = r#"{
            "orderNumber": "Y",
            "refunds": [{"type": "Full", "amount": 4.00, "shippingAmount": 0}]
        }"#;
        let order: RawOrder = serde_json::from_str(json).unwrap();
        assert!(order.refunds[0].is_full());
        assert!(order.refunds[0].products.is_empty());
        assert_eq!(order.refunds[0].amount, Some(4.00));
    }
}
