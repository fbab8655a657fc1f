//! CSV report emission
//!
//! Writes the five output tables of one reconciliation run into an output
//! directory: normalized orders and lines, the per-product quantity summary,
//! and both payments tables.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::normalize::aggregate_products;
use crate::payments::PaymentsTables;
use shared::{LineRow, OrderRow};

/// Report emission errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write all report tables under `out_dir` (created if needed).
pub fn write_reports(
    out_dir: &Path,
    orders: &[OrderRow],
    lines: &[LineRow],
    payments: &PaymentsTables,
) -> Result<(), ReportError> {
    std::fs::create_dir_all(out_dir)?;

    write_table(out_dir, "orders.csv", orders)?;
    write_table(out_dir, "order_lines.csv", lines)?;
    write_table(out_dir, "products.csv", &aggregate_products(lines))?;
    write_table(out_dir, "payments_orders.csv", &payments.orders)?;
    write_table(out_dir, "payments_adjustments.csv", &payments.adjustments)?;

    tracing::info!(
        out_dir = %out_dir.display(),
        orders = orders.len(),
        lines = lines.len(),
        payment_orders = payments.orders.len(),
        adjustments = payments.adjustments.len(),
        "reports written"
    );
    Ok(())
}

fn write_table<T: Serialize>(out_dir: &Path, name: &str, rows: &[T]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(out_dir.join(name))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_orders;
    use shared::{ProductLine, RawOrder, RefundEvent, Transaction};

    fn sample_orders() -> Vec<RawOrder> {
        vec![RawOrder {
            order_number: "ORDER-1".into(),
            created_at: Some("2024-03-01T12:00:00Z".into()),
            status: Some("Shipped".into()),
            transaction: Transaction {
                gross_amount: Some(10.0),
                net_amount: Some(9.0),
                ..Transaction::default()
            },
            products: vec![ProductLine {
                name: Some("Widget".into()),
                sku_id: Some("s1".into()),
                quantity: Some(1),
                unit_price: Some(10.0),
                extended_price: Some(10.0),
                ..ProductLine::default()
            }],
            refunds: vec![RefundEvent {
                refund_type: Some("Full".into()),
                amount: Some(4.0),
                shipping_amount: Some(0.0),
                products: vec![],
            }],
            ..RawOrder::default()
        }]
    }

    #[test]
    fn test_write_reports_emits_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        let (orders, lines) = normalize_orders(&sample_orders());

        write_reports(dir.path(), &orders, &lines, &PaymentsTables::default()).unwrap();

        for name in [
            "orders.csv",
            "order_lines.csv",
            "products.csv",
            "payments_orders.csv",
            "payments_adjustments.csv",
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }

        let orders_csv = std::fs::read_to_string(dir.path().join("orders.csv")).unwrap();
        let mut csv_lines = orders_csv.lines();
        let header = csv_lines.next().unwrap();
        assert!(header.contains("order_number"));
        assert!(header.contains("refund_total_amount"));
        assert!(header.contains("net_after_refunds_conservative"));

        let row = csv_lines.next().unwrap();
        assert!(row.starts_with("ORDER-1"));
        assert!(row.contains("2024-03-01"));
        // gross_after_refunds = 10 - 4
        assert!(row.contains('6'));
    }

    #[test]
    fn test_write_reports_with_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_reports(dir.path(), &[], &[], &PaymentsTables::default()).unwrap();
        assert!(dir.path().join("orders.csv").exists());
    }
}
