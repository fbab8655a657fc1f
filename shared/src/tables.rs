//! Normalized table rows derived from raw order documents
//!
//! Derived rows are recomputed fully on each reconciliation run; they are
//! never persisted back into the raw artifact store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row per order, with refund totals integrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_number: String,
    pub created_at: Option<String>,
    /// Calendar date of `created_at` in UTC; None when unparseable
    pub order_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub order_channel: Option<String>,
    pub order_fulfillment: Option<String>,

    pub gross_amount: f64,
    pub net_amount_reported: f64,
    pub fee_amount: f64,
    pub direct_fee_amount: f64,
    pub product_amount: f64,
    pub shipping_amount: f64,

    // Integrated refund aggregates
    pub refund_total_amount: f64,
    pub refund_total_shipping_amount: f64,
    pub refund_count: u32,
    pub has_full_refund: bool,

    pub gross_after_refunds: f64,
    /// Conservative: subtracts gross refunds from reported net; understates
    /// the true net when refunds also reverse fees.
    pub net_after_refunds_conservative: f64,

    pub source_file: Option<String>,
}

/// One row per (order, SKU) line item, with per-SKU refund totals baked in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRow {
    pub order_number: String,
    pub created_at: Option<String>,
    pub order_date: Option<NaiveDate>,

    pub product_name: Option<String>,
    pub product_id: Option<String>,
    pub sku_id: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub extended_price: f64,
    pub product_url: Option<String>,

    pub refund_product_amount: f64,
    pub extended_after_refund: f64,
    pub is_refunded_line: bool,
}

/// Aggregated per-product quantity summary across all orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub product_name: Option<String>,
    pub product_id: Option<String>,
    pub sku_id: Option<String>,
    pub quantity: i64,
}
