//! Money parsing and rounding using rust_decimal for precision
//!
//! Monetary amounts are accumulated as `Decimal` internally and converted to
//! `f64` at serialization edges.

use std::str::FromStr;

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert an optional monetary field to `Decimal`, coercing absent to zero.
///
/// Null/missing amounts never propagate into a sum.
pub fn dec(value: Option<f64>) -> Decimal {
    value
        .and_then(Decimal::from_f64)
        .unwrap_or(Decimal::ZERO)
}

/// Round a `Decimal` to cents and convert to `f64` for storage.
pub fn to_money(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Parse a money display string into a signed amount.
///
/// Accepts the formats the payments export produces:
/// - `"$1.25"` -> `1.25`
/// - `"($0.36)"` -> `-0.36` (accounting negative)
/// - `""` / unparseable -> `0.0`
pub fn parse_money(text: &str) -> f64 {
    let s = text.trim();
    if s.is_empty() {
        return 0.0;
    }

    let negative = s.starts_with('(') && s.ends_with(')');

    // Strip currency symbols, separators and parentheses, keep digits/dot/sign
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return 0.0;
    }

    let value = Decimal::from_str(&cleaned)
        .ok()
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0);

    if negative { -value } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money_plain() {
        assert_eq!(parse_money("$1.25"), 1.25);
        assert_eq!(parse_money("1.25"), 1.25);
        assert_eq!(parse_money("$1,234.50"), 1234.50);
    }

    #[test]
    fn test_parse_money_accounting_negative() {
        assert_eq!(parse_money("($0.36)"), -0.36);
        assert_eq!(parse_money("($12.00)"), -12.0);
    }

    #[test]
    fn test_parse_money_explicit_negative() {
        assert_eq!(parse_money("-$3.10"), -3.10);
    }

    #[test]
    fn test_parse_money_empty_and_garbage() {
        assert_eq!(parse_money(""), 0.0);
        assert_eq!(parse_money("   "), 0.0);
        assert_eq!(parse_money("n/a"), 0.0);
    }

    #[test]
    fn test_dec_coerces_missing_to_zero() {
        assert_eq!(dec(None), Decimal::ZERO);
        assert_eq!(dec(Some(4.0)), Decimal::from_f64(4.0).unwrap());
    }

    #[test]
    fn test_to_money_rounds_to_cents() {
        let d = Decimal::from_str("10.005").unwrap();
        assert_eq!(to_money(d), 10.01);
        assert_eq!(to_money(Decimal::ZERO), 0.0);
    }
}
