//! Pricing core of the transaction/payment recording flow.
//!
//! Everything here is free of I/O. The catalog is injected as a price lookup
//! so the arithmetic can be exercised against a plain in-memory map.

use crate::models::CartItem;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CheckoutError {
    EmptyCart,
    NonPositiveQuantity { product_id: u64 },
    UnknownProduct { product_id: u64 },
}

/// A cart entry priced against the current catalog.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PricedLine {
    pub product_id: u64,
    pub qty: i64,
    pub subtotal: i64,
}

/// Price a cart against the catalog.
///
/// `price_of` must return the current price of an existing, sellable product
/// and `None` otherwise. Returns the transaction total together with one
/// priced line per cart entry, in cart order.
///
/// The whole cart is rejected if any entry is invalid, the caller never has
/// to clean up partial state.
pub fn price_cart(
    items: &[CartItem],
    price_of: impl Fn(u64) -> Option<i64>,
) -> Result<(i64, Vec<PricedLine>), CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut total = 0;
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        if item.qty <= 0 {
            return Err(CheckoutError::NonPositiveQuantity {
                product_id: item.product_id,
            });
        }

        let price = price_of(item.product_id).ok_or(CheckoutError::UnknownProduct {
            product_id: item.product_id,
        })?;

        let subtotal = price * item.qty;
        total += subtotal;

        lines.push(PricedLine {
            product_id: item.product_id,
            qty: item.qty,
            subtotal,
        });
    }

    Ok((total, lines))
}

/// Change due for a payment. Signed, negative when under-tendered.
pub fn change_due(total: i64, tendered: i64) -> i64 {
    tendered - total
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn catalog() -> HashMap<u64, i64> {
        [(1, 1500), (2, 700), (3, 250)].into_iter().collect()
    }

    #[test]
    fn prices_single_line_cart() {
        let catalog = catalog();
        let cart = [CartItem {
            product_id: 1,
            qty: 2,
        }];

        let (total, lines) = price_cart(&cart, |id| catalog.get(&id).copied()).unwrap();

        assert_eq!(total, 3000);
        assert_eq!(
            lines,
            vec![PricedLine {
                product_id: 1,
                qty: 2,
                subtotal: 3000,
            }]
        );
    }

    #[test]
    fn total_is_sum_of_line_subtotals() {
        let catalog = catalog();
        let cart = [
            CartItem {
                product_id: 1,
                qty: 1,
            },
            CartItem {
                product_id: 2,
                qty: 3,
            },
            CartItem {
                product_id: 3,
                qty: 4,
            },
        ];

        let (total, lines) = price_cart(&cart, |id| catalog.get(&id).copied()).unwrap();

        assert_eq!(lines.len(), cart.len());
        assert_eq!(total, lines.iter().map(|l| l.subtotal).sum::<i64>());
        assert_eq!(total, 1500 + 3 * 700 + 4 * 250);
    }

    #[test]
    fn rejects_empty_cart() {
        let catalog = catalog();
        assert_eq!(
            price_cart(&[], |id| catalog.get(&id).copied()),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let catalog = catalog();
        for qty in [0, -1] {
            let cart = [CartItem { product_id: 1, qty }];
            assert_eq!(
                price_cart(&cart, |id| catalog.get(&id).copied()),
                Err(CheckoutError::NonPositiveQuantity { product_id: 1 })
            );
        }
    }

    #[test]
    fn rejects_unknown_product() {
        let catalog = catalog();
        let cart = [
            CartItem {
                product_id: 1,
                qty: 1,
            },
            CartItem {
                product_id: 999,
                qty: 1,
            },
        ];

        assert_eq!(
            price_cart(&cart, |id| catalog.get(&id).copied()),
            Err(CheckoutError::UnknownProduct { product_id: 999 })
        );
    }

    #[test]
    fn change_is_signed() {
        assert_eq!(change_due(3000, 5000), 2000);
        assert_eq!(change_due(3000, 3000), 0);
        // Under-tendering is not clamped, the caller decides the policy.
        assert_eq!(change_due(3000, 2000), -1000);
    }
}
