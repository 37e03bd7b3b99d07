//! # Pricing
//!
//! Turns the lines typed at the counter into priced sale lines and totals.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleLineInput[]            PriceBook (one batch lookup)                │
//! │  { product, qty,            product_id → name, sale price, active       │
//! │    price?, discount? }                                                  │
//! │          │                         │                                    │
//! │          └──────────┬──────────────┘                                    │
//! │                     ▼                                                   │
//! │              price_lines()                                              │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  PricedLine { unit_price, discount, line_total = q × p − d }            │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │              compute_totals(lines, overall discount)                    │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  SaleTotals { subtotal = Σ line_total, discount, total = sub − disc }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are computed once when the sale is created and never again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_discount, validate_line_count, validate_price, validate_quantity};

// =============================================================================
// Inputs
// =============================================================================

/// A line as typed at the counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineInput {
    pub product_id: String,
    pub quantity: i64,
    /// Overrides the catalog price when given.
    #[serde(default)]
    pub unit_price: Option<Money>,
    /// Line discount, defaults to zero.
    #[serde(default)]
    pub discount: Option<Money>,
}

/// What pricing needs to know about a catalog product.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEntry {
    pub name: String,
    pub sale_price: Money,
    pub is_active: bool,
}

/// Current catalog prices for the products on one sale, keyed by product id.
pub type PriceBook = HashMap<String, PriceEntry>;

// =============================================================================
// Outputs
// =============================================================================

/// A line ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

// =============================================================================
// Pricing
// =============================================================================

/// Distinct product ids on a sale, in first-seen order.
///
/// This is the key set for the single batch price lookup.
pub fn product_ids(lines: &[SaleLineInput]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if !ids.contains(&line.product_id) {
            ids.push(line.product_id.clone());
        }
    }
    ids
}

/// Checks the shape of the lines before anything is looked up.
pub fn validate_lines(lines: &[SaleLineInput]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptySale);
    }
    validate_line_count(lines.len())?;

    for line in lines {
        validate_quantity(line.quantity)?;
        if let Some(price) = line.unit_price {
            validate_price("unit price", price)?;
        }
        if let Some(discount) = line.discount {
            validate_discount(discount)?;
        }
    }

    Ok(())
}

/// Prices every line against the price book.
///
/// ## Errors
/// - [`CoreError::EmptySale`] / validation errors from [`validate_lines`]
/// - [`CoreError::ProductNotFound`] when a product is missing from the book
/// - [`CoreError::ProductInactive`] for deactivated products
/// - [`CoreError::LineDiscountExceedsAmount`] when a line would go negative
pub fn price_lines(lines: &[SaleLineInput], book: &PriceBook) -> CoreResult<Vec<PricedLine>> {
    validate_lines(lines)?;

    lines
        .iter()
        .map(|line| {
            let entry = book
                .get(&line.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if !entry.is_active {
                return Err(CoreError::ProductInactive(entry.name.clone()));
            }

            let unit_price = line.unit_price.unwrap_or(entry.sale_price);
            let discount = line.discount.unwrap_or_default();
            let gross = unit_price.multiply_quantity(line.quantity);

            if discount > gross {
                return Err(CoreError::LineDiscountExceedsAmount {
                    product_id: line.product_id.clone(),
                    discount,
                    gross,
                });
            }

            Ok(PricedLine {
                product_id: line.product_id.clone(),
                product_name: entry.name.clone(),
                quantity: line.quantity,
                unit_price,
                discount,
                line_total: gross - discount,
            })
        })
        .collect()
}

/// Sums priced lines and applies the overall discount.
///
/// ## Example
/// ```rust
/// use ndayane_core::money::Money;
/// use ndayane_core::pricing::{compute_totals, PricedLine};
///
/// let line = |qty, price| PricedLine {
///     product_id: "p".into(),
///     product_name: "Vis".into(),
///     quantity: qty,
///     unit_price: Money::new(price),
///     discount: Money::zero(),
///     line_total: Money::new(price * qty),
/// };
/// let totals = compute_totals(&[line(3, 1000), line(1, 500)], Money::zero()).unwrap();
/// assert_eq!(totals.subtotal, Money::new(3500));
/// assert_eq!(totals.total, Money::new(3500));
/// ```
pub fn compute_totals(lines: &[PricedLine], discount: Money) -> CoreResult<SaleTotals> {
    validate_discount(discount)?;

    let subtotal: Money = lines.iter().map(|l| l.line_total).sum();

    if discount > subtotal {
        return Err(CoreError::DiscountExceedsSubtotal { discount, subtotal });
    }

    Ok(SaleTotals {
        subtotal,
        discount,
        total: subtotal - discount,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> PriceBook {
        let mut book = PriceBook::new();
        book.insert(
            "vis".to_string(),
            PriceEntry {
                name: "Vis 6x40 (boîte)".to_string(),
                sale_price: Money::new(1000),
                is_active: true,
            },
        );
        book.insert(
            "cheville".to_string(),
            PriceEntry {
                name: "Chevilles 8mm".to_string(),
                sale_price: Money::new(500),
                is_active: true,
            },
        );
        book.insert(
            "old".to_string(),
            PriceEntry {
                name: "Ancien modèle".to_string(),
                sale_price: Money::new(200),
                is_active: false,
            },
        );
        book
    }

    fn input(product: &str, qty: i64) -> SaleLineInput {
        SaleLineInput {
            product_id: product.to_string(),
            quantity: qty,
            unit_price: None,
            discount: None,
        }
    }

    #[test]
    fn test_prices_from_catalog() {
        let lines = price_lines(&[input("vis", 3), input("cheville", 1)], &book()).unwrap();

        assert_eq!(lines[0].unit_price, Money::new(1000));
        assert_eq!(lines[0].line_total, Money::new(3000));
        assert_eq!(lines[1].product_name, "Chevilles 8mm");

        let totals = compute_totals(&lines, Money::zero()).unwrap();
        assert_eq!(totals.subtotal, Money::new(3500));
        assert_eq!(totals.total, Money::new(3500));
    }

    #[test]
    fn test_explicit_price_and_discounts() {
        let mut line = input("vis", 2);
        line.unit_price = Some(Money::new(900));
        line.discount = Some(Money::new(100));

        let lines = price_lines(&[line, input("cheville", 1)], &book()).unwrap();
        assert_eq!(lines[0].line_total, Money::new(1700));

        // subtotal = Σ(q × p) − Σ(line discount)
        let totals = compute_totals(&lines, Money::new(200)).unwrap();
        assert_eq!(totals.subtotal, Money::new(2200));
        assert_eq!(totals.total, Money::new(2000));
    }

    #[test]
    fn test_discount_larger_than_subtotal_rejected() {
        let lines = price_lines(&[input("cheville", 1)], &book()).unwrap();
        let err = compute_totals(&lines, Money::new(501)).unwrap_err();
        assert!(matches!(err, CoreError::DiscountExceedsSubtotal { .. }));

        // Whole subtotal as discount is allowed
        let totals = compute_totals(&lines, Money::new(500)).unwrap();
        assert_eq!(totals.total, Money::zero());
    }

    #[test]
    fn test_line_discount_larger_than_line_rejected() {
        let mut line = input("cheville", 1);
        line.discount = Some(Money::new(600));
        let err = price_lines(&[line], &book()).unwrap_err();
        assert!(matches!(err, CoreError::LineDiscountExceedsAmount { .. }));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            price_lines(&[], &book()).unwrap_err(),
            CoreError::EmptySale
        ));
        assert!(matches!(
            price_lines(&[input("missing", 1)], &book()).unwrap_err(),
            CoreError::ProductNotFound(_)
        ));
        assert!(matches!(
            price_lines(&[input("old", 1)], &book()).unwrap_err(),
            CoreError::ProductInactive(_)
        ));
        assert!(matches!(
            price_lines(&[input("vis", 0)], &book()).unwrap_err(),
            CoreError::Validation(_)
        ));

        let mut negative = input("vis", 1);
        negative.discount = Some(Money::new(-10));
        assert!(price_lines(&[negative], &book()).is_err());
    }

    #[test]
    fn test_product_ids_are_distinct() {
        let ids = product_ids(&[input("vis", 1), input("cheville", 2), input("vis", 4)]);
        assert_eq!(ids, vec!["vis".to_string(), "cheville".to_string()]);
    }
}
