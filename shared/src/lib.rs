//! Shared types for the order pipeline
//!
//! Raw captured order documents, normalized table rows, payments-report
//! rows, money parsing and date utilities. No I/O lives here.

pub mod money;
pub mod order;
pub mod payments;
pub mod tables;
pub mod util;

// Re-exports
pub use order::{ProductLine, RawOrder, RefundEvent, RefundProduct, Transaction};
pub use payments::{AdjustmentRow, AdjustmentType, PaymentOrderRow};
pub use tables::{LineRow, OrderRow, ProductRow};
