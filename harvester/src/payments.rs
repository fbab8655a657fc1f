//! Payments-report ingestion
//!
//! Consumes the payments export as already-parsed tabular input: per export
//! a `*_orders.csv` (per-order payment totals) and an optional
//! `*_adjustments.csv` (free-text adjustment line items). Money cells keep
//! the portal's display formatting and are parsed here; adjustment reasons
//! are categorized and mined for embedded order numbers.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use shared::money::parse_money;
use shared::payments::{
    AdjustmentRow, PaymentOrderRow, dedupe_adjustments, dedupe_payment_orders,
};
use shared::util::parse_report_date;

/// Payments ingestion errors
#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no payments exports (*_orders.csv) found in {0}")]
    NoExports(PathBuf),
}

/// Both payments tables, de-duplicated across exports.
#[derive(Debug, Clone, Default)]
pub struct PaymentsTables {
    pub orders: Vec<PaymentOrderRow>,
    pub adjustments: Vec<AdjustmentRow>,
}

#[derive(Debug, Deserialize)]
struct PaymentOrderRecord {
    #[serde(default)]
    order_number: String,
    #[serde(default)]
    buyer_name: Option<String>,
    #[serde(default)]
    order_date: Option<String>,
    #[serde(default)]
    total_sale: Option<String>,
    #[serde(default)]
    total_fees: Option<String>,
    #[serde(default)]
    refunded_orders: Option<String>,
    #[serde(default)]
    refunded_fees: Option<String>,
    #[serde(default)]
    is_direct: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdjustmentRecord {
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Parse one per-order payment totals table.
pub fn parse_payment_orders<R: Read>(
    reader: R,
    source: Option<&str>,
) -> Result<Vec<PaymentOrderRow>, PaymentsError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<PaymentOrderRecord>() {
        let record = record?;
        // Rows without an order number are separators or footer junk
        if record.order_number.trim().is_empty() {
            continue;
        }

        rows.push(PaymentOrderRow {
            order_number: record.order_number.trim().to_string(),
            buyer_name: record.buyer_name.filter(|s| !s.trim().is_empty()),
            order_date: record
                .order_date
                .as_deref()
                .and_then(parse_report_date),
            total_sale: parse_money(record.total_sale.as_deref().unwrap_or("")),
            total_fees: parse_money(record.total_fees.as_deref().unwrap_or("")),
            refunded_orders: parse_money(record.refunded_orders.as_deref().unwrap_or("")),
            refunded_fees: parse_money(record.refunded_fees.as_deref().unwrap_or("")),
            is_direct: parse_flag(record.is_direct.as_deref()),
            source_file: source.map(str::to_string),
        });
    }

    Ok(rows)
}

/// Parse one adjustments table.
pub fn parse_adjustments<R: Read>(
    reader: R,
    source: Option<&str>,
) -> Result<Vec<AdjustmentRow>, PaymentsError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<AdjustmentRecord>() {
        let record = record?;
        let reason = record.reason.unwrap_or_default();
        if reason.trim().is_empty() {
            continue;
        }

        let mut row = AdjustmentRow::from_reason(
            parse_money(record.amount.as_deref().unwrap_or("")),
            reason.trim(),
        );
        row.source_file = source.map(str::to_string);
        rows.push(row);
    }

    Ok(rows)
}

/// Load every payments export in a directory and de-duplicate across them.
///
/// Orders tables are required (at least one `*_orders.csv`); adjustments
/// tables are optional per export.
pub fn load_payments_dir(dir: &Path) -> Result<PaymentsTables, PaymentsError> {
    let mut file_names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    file_names.sort();

    let mut orders = Vec::new();
    let mut adjustments = Vec::new();
    let mut export_count = 0usize;

    for name in &file_names {
        let path = dir.join(name);
        if name.ends_with("_orders.csv") {
            let file = std::fs::File::open(&path)?;
            orders.extend(parse_payment_orders(file, Some(name.as_str()))?);
            export_count += 1;
        } else if name.ends_with("_adjustments.csv") {
            let file = std::fs::File::open(&path)?;
            adjustments.extend(parse_adjustments(file, Some(name.as_str()))?);
        }
    }

    if export_count == 0 {
        return Err(PaymentsError::NoExports(dir.to_path_buf()));
    }

    tracing::info!(
        exports = export_count,
        orders = orders.len(),
        adjustments = adjustments.len(),
        "loaded payments exports"
    );

    Ok(PaymentsTables {
        orders: dedupe_payment_orders(orders),
        adjustments: dedupe_adjustments(adjustments),
    })
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::payments::AdjustmentType;

    const ORDERS_CSV: &str = "\
order_number,buyer_name,order_date,total_sale,total_fees,refunded_orders,refunded_fees,is_direct
AB12CD34-EF5678-90ABC,Jane Buyer,03/15/2024,$25.50,($3.20),$0.00,$0.00,true
,,,,,,,
FF00AA11-BB22CC-DD33E,Sam Buyer,03/16/2024,$8.00,($0.36),($8.00),$0.36,false
";

    const ADJUSTMENTS_CSV: &str = "\
amount,reason
($4.00),Direct Seller Order AB12CD34-EF5678-90ABC Refund
($1.25),Direct Discrepancy Reason - [Missing] 1x Widget
$2.00,Monthly promotion credit
";

    #[test]
    fn test_parse_payment_orders() {
        let rows = parse_payment_orders(ORDERS_CSV.as_bytes(), Some("jan_orders.csv")).unwrap();
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.order_number, "AB12CD34-EF5678-90ABC");
        assert_eq!(first.buyer_name.as_deref(), Some("Jane Buyer"));
        assert_eq!(first.total_sale, 25.50);
        assert_eq!(first.total_fees, -3.20);
        assert!(first.is_direct);
        assert_eq!(first.source_file.as_deref(), Some("jan_orders.csv"));

        let second = &rows[1];
        assert_eq!(second.refunded_orders, -8.00);
        assert_eq!(second.refunded_fees, 0.36);
        assert!(!second.is_direct);
    }

    #[test]
    fn test_parse_adjustments_extracts_refs_and_types() {
        let rows = parse_adjustments(ADJUSTMENTS_CSV.as_bytes(), None).unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].adjustment_amount, -4.00);
        assert_eq!(rows[0].adjustment_type, AdjustmentType::DirectRefundAdj);
        assert_eq!(
            rows[0].order_number_from_reason.as_deref(),
            Some("AB12CD34-EF5678-90ABC")
        );

        assert_eq!(rows[1].adjustment_type, AdjustmentType::DirectMissingItem);
        assert_eq!(rows[1].order_number_from_reason, None);

        assert_eq!(rows[2].adjustment_type, AdjustmentType::Other);
        assert_eq!(rows[2].adjustment_amount, 2.00);
    }

    #[test]
    fn test_load_payments_dir_dedupes_across_exports() {
        let dir = tempfile::tempdir().unwrap();
        // Overlapping date ranges: the same order shows up in both exports
        std::fs::write(dir.path().join("jan_orders.csv"), ORDERS_CSV).unwrap();
        std::fs::write(dir.path().join("feb_orders.csv"), ORDERS_CSV).unwrap();
        std::fs::write(dir.path().join("jan_adjustments.csv"), ADJUSTMENTS_CSV).unwrap();

        let tables = load_payments_dir(dir.path()).unwrap();
        assert_eq!(tables.orders.len(), 2);
        assert_eq!(tables.adjustments.len(), 3);
        // keep="last": survivors come from the later export in sort order
        assert!(
            tables
                .orders
                .iter()
                .all(|r| r.source_file.as_deref() == Some("jan_orders.csv"))
        );
    }

    #[test]
    fn test_load_payments_dir_without_exports_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "nothing").unwrap();

        let err = load_payments_dir(dir.path()).unwrap_err();
        assert!(matches!(err, PaymentsError::NoExports(_)));
    }

    #[test]
    fn test_missing_adjustments_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jan_orders.csv"), ORDERS_CSV).unwrap();

        let tables = load_payments_dir(dir.path()).unwrap();
        assert_eq!(tables.orders.len(), 2);
        assert!(tables.adjustments.is_empty());
    }
}
