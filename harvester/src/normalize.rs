//! Refund-aware order normalization
//!
//! Pure transformation from raw order documents into two relational tables:
//! one row per order, one row per (order, SKU) line item, both with refund
//! totals integrated. No I/O; deterministic given identical input.
//!
//! Accumulation runs on `Decimal` and rounds to cents on emission, so sums
//! never pick up float drift.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use shared::money::{dec, to_money};
use shared::util::parse_order_date;
use shared::{LineRow, OrderRow, ProductRow, RawOrder};

/// Normalize a collection of raw orders into (orders, lines) tables.
pub fn normalize_orders(orders: &[RawOrder]) -> (Vec<OrderRow>, Vec<LineRow>) {
    let mut order_rows = Vec::with_capacity(orders.len());
    let mut line_rows = Vec::new();

    for order in orders {
        // ----- refund accumulation (order-level + per-sku) -----
        let mut refund_total = Decimal::ZERO;
        let mut refund_shipping = Decimal::ZERO;
        let mut refund_count = 0u32;
        let mut has_full_refund = false;
        let mut refunded_by_sku: BTreeMap<String, Decimal> = BTreeMap::new();

        for refund in &order.refunds {
            refund_count += 1;
            if refund.is_full() {
                has_full_refund = true;
            }
            refund_total += dec(refund.amount);
            refund_shipping += dec(refund.shipping_amount);

            // Partial refunds can carry product-level amounts; entries
            // without a skuId cannot be attributed to a line
            for product in &refund.products {
                let Some(sku) = &product.sku_id else {
                    continue;
                };
                *refunded_by_sku.entry(sku.clone()).or_default() += dec(product.amount);
            }
        }

        let order_date = order.created_at.as_deref().and_then(parse_order_date);
        let gross = dec(order.transaction.gross_amount);
        let net = dec(order.transaction.net_amount);

        order_rows.push(OrderRow {
            order_number: order.order_number.clone(),
            created_at: order.created_at.clone(),
            order_date,
            status: order.status.clone(),
            order_channel: order.order_channel.clone(),
            order_fulfillment: order.order_fulfillment.clone(),
            gross_amount: to_money(gross),
            net_amount_reported: to_money(net),
            fee_amount: to_money(dec(order.transaction.fee_amount)),
            direct_fee_amount: to_money(dec(order.transaction.direct_fee_amount)),
            product_amount: to_money(dec(order.transaction.product_amount)),
            shipping_amount: to_money(dec(order.transaction.shipping_amount)),
            refund_total_amount: to_money(refund_total),
            refund_total_shipping_amount: to_money(refund_shipping),
            refund_count,
            has_full_refund,
            gross_after_refunds: to_money(gross - refund_total),
            // Conservative: subtracts gross refunds from reported net;
            // understates when refunds also reverse fees
            net_after_refunds_conservative: to_money(net - refund_total),
            source_file: order.source_file.clone(),
        });

        // ----- line rows (refund-by-sku baked in) -----
        for product in &order.products {
            let quantity = product.quantity.unwrap_or(0).max(0);
            let unit_price = dec(product.unit_price);
            let extended = match product.extended_price {
                Some(price) => dec(Some(price)),
                None => unit_price * Decimal::from(quantity),
            };
            let refunded = product
                .sku_id
                .as_ref()
                .and_then(|sku| refunded_by_sku.get(sku))
                .copied()
                // Absent is the expected gap for Full refunds without a
                // product breakdown
                .unwrap_or(Decimal::ZERO);

            line_rows.push(LineRow {
                order_number: order.order_number.clone(),
                created_at: order.created_at.clone(),
                order_date,
                product_name: product.name.clone(),
                product_id: product.product_id.clone(),
                sku_id: product.sku_id.clone(),
                quantity,
                unit_price: to_money(unit_price),
                extended_price: to_money(extended),
                product_url: product.url.clone(),
                refund_product_amount: to_money(refunded),
                extended_after_refund: to_money(extended - refunded),
                is_refunded_line: refunded > Decimal::ZERO,
            });
        }
    }

    (order_rows, line_rows)
}

/// Aggregate line rows into per-product quantity totals.
pub fn aggregate_products(lines: &[LineRow]) -> Vec<ProductRow> {
    let mut totals: BTreeMap<(Option<String>, Option<String>, Option<String>), i64> =
        BTreeMap::new();

    for line in lines {
        let key = (
            line.product_name.clone(),
            line.product_id.clone(),
            line.sku_id.clone(),
        );
        *totals.entry(key).or_default() += line.quantity;
    }

    totals
        .into_iter()
        .map(|((product_name, product_id, sku_id), quantity)| ProductRow {
            product_name,
            product_id,
            sku_id,
            quantity,
        })
        .collect()
}
