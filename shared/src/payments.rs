//! Payments-report tables and adjustment categorization
//!
//! The payments export arrives as two tables: per-order payment totals and
//! free-text adjustment line items. Adjustment reasons sometimes embed the
//! order number they refer to; it is extracted here so adjustments can be
//! joined back to orders.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Order-number pattern embedded in adjustment reasons:
/// 8-6-5 hexadecimal groups, case-insensitive.
fn order_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([0-9A-Fa-f]{8}-[0-9A-Fa-f]{6}-[0-9A-Fa-f]{5})\b").unwrap()
    })
}

/// One row of the per-order payment totals table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOrderRow {
    pub order_number: String,
    pub buyer_name: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub total_sale: f64,
    pub total_fees: f64,
    pub refunded_orders: f64,
    pub refunded_fees: f64,
    pub is_direct: bool,
    pub source_file: Option<String>,
}

/// Categorization of an adjustment line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentType {
    /// Direct-seller order refund ("Direct Seller Order ... Refund")
    DirectRefundAdj,
    /// Direct discrepancy for a missing item
    DirectMissingItem,
    Other,
}

/// One row of the adjustments table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRow {
    pub adjustment_amount: f64,
    pub reason: String,
    pub order_number_from_reason: Option<String>,
    pub adjustment_type: AdjustmentType,
    pub source_file: Option<String>,
}

impl AdjustmentRow {
    /// Build a row from the raw cell values, extracting the order reference
    /// and category from the reason text.
    pub fn from_reason(amount: f64, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            adjustment_amount: amount,
            order_number_from_reason: extract_order_ref(&reason),
            adjustment_type: classify_adjustment(&reason),
            reason,
            source_file: None,
        }
    }
}

/// Extract an embedded order number from adjustment reason text, uppercased.
pub fn extract_order_ref(reason: &str) -> Option<String> {
    order_ref_re()
        .captures(reason)
        .map(|c| c[1].to_uppercase())
}

/// Categorize an adjustment by its reason text.
pub fn classify_adjustment(reason: &str) -> AdjustmentType {
    if reason.contains("Direct Seller Order") && reason.contains("Refund") {
        AdjustmentType::DirectRefundAdj
    } else if reason.contains("Discrepancy") && reason.contains("Reason - [Missing]") {
        AdjustmentType::DirectMissingItem
    } else {
        AdjustmentType::Other
    }
}

/// De-duplicate payment order rows across overlapping exports.
///
/// The same order appears in several exports when date ranges overlap; rows
/// are considered duplicates when every monetary column matches. The last
/// occurrence wins, rows keep their relative order.
pub fn dedupe_payment_orders(rows: Vec<PaymentOrderRow>) -> Vec<PaymentOrderRow> {
    dedupe_keep_last(rows, |r| {
        format!(
            "{}|{:?}|{:.2}|{:.2}|{:.2}|{:.2}",
            r.order_number, r.order_date, r.total_sale, r.total_fees,
            r.refunded_orders, r.refunded_fees,
        )
    })
}

/// De-duplicate adjustment rows on (amount, reason, order ref, category).
pub fn dedupe_adjustments(rows: Vec<AdjustmentRow>) -> Vec<AdjustmentRow> {
    dedupe_keep_last(rows, |r| {
        format!(
            "{:.2}|{}|{:?}|{:?}",
            r.adjustment_amount, r.reason, r.order_number_from_reason, r.adjustment_type,
        )
    })
}

fn dedupe_keep_last<T, F: Fn(&T) -> String>(rows: Vec<T>, key: F) -> Vec<T> {
    let mut last_index: HashMap<String, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        last_index.insert(key(row), i);
    }
    rows.into_iter()
        .enumerate()
        .filter(|(i, row)| last_index.get(&key(row)) == Some(i))
        .map(|(_, row)| row)
        .collect()
}
