//! Carts, line items and cart arithmetic.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::Product;
use crate::types::{
    CartId, CurrencyCode, LineItemId, Price, PriceError, ProductId, Quantity, UserId,
};

/// Who a cart belongs to.
///
/// Ownership only ever moves from `Anonymous` to `User`, when a visitor's
/// session cart is adopted on login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum CartOwner {
    /// Held only by a client session.
    Anonymous,
    /// Owned by a registered user.
    User(UserId),
}

impl CartOwner {
    /// The owning user, if any.
    #[must_use]
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }
}

/// A shopping cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub owner: CartOwner,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self.owner, CartOwner::Anonymous)
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == CartOwner::User(user)
    }
}

/// A (cart, product) pairing with a quantity.
///
/// A cart holds at most one line item per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Orders a cart's lines; merges replay lines in this order.
    pub added_at: DateTime<Utc>,
}

/// A line item joined with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub item: LineItem,
    pub product: Product,
}

impl CartLine {
    /// Effective unit price at `as_of`.
    #[must_use]
    pub fn unit_price(&self, as_of: DateTime<Utc>) -> Price {
        self.product.effective_price(as_of)
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn subtotal(&self, as_of: DateTime<Utc>) -> Price {
        self.unit_price(as_of).times(self.item.quantity)
    }
}

/// Sum of line subtotals; zero in `currency` for an empty cart.
///
/// # Errors
///
/// Returns [`PriceError::CurrencyMismatch`] if a product is priced in a
/// currency other than `currency`.
pub fn total(
    lines: &[CartLine],
    currency: CurrencyCode,
    as_of: DateTime<Utc>,
) -> Result<Price, PriceError> {
    lines
        .iter()
        .try_fold(Price::zero(currency), |acc, line| {
            acc.checked_add(line.subtotal(as_of))
        })
}

/// Number of units across all lines.
#[must_use]
pub fn item_count(lines: &[CartLine]) -> u64 {
    lines.iter().map(|line| u64::from(line.item.quantity.get())).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    use super::*;
    use crate::{Percentage, Sale, SaleId};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn line(id: i32, price: i64, quantity: u32, sale: Option<Sale>) -> CartLine {
        CartLine {
            item: LineItem {
                id: LineItemId::new(id),
                cart_id: CartId::new(1),
                product_id: ProductId::new(id),
                quantity: Quantity::new(quantity).unwrap(),
                added_at: now(),
            },
            product: Product {
                id: ProductId::new(id),
                title: format!("Product {id}"),
                description: None,
                price: Price::new(Decimal::from(price), CurrencyCode::USD).unwrap(),
                sale,
                retired_at: None,
                created_at: now(),
                updated_at: now(),
            },
        }
    }

    #[test]
    fn test_total_of_two_products() {
        let lines = [line(1, 10, 1, None), line(2, 20, 1, None)];
        assert_eq!(total(&lines, CurrencyCode::USD, now()).unwrap().to_string(), "$30.00");
        assert_eq!(item_count(&lines), 2);
    }

    #[test]
    fn test_total_applies_sale_per_line() {
        let sale = Sale {
            id: SaleId::new(1),
            percentage: Percentage::new(50).unwrap(),
            ends_at: now() + Duration::days(1),
        };
        let lines = [line(1, 100, 1, Some(sale)), line(2, 5, 3, None)];

        assert_eq!(lines[0].subtotal(now()).to_string(), "$50.00");
        assert_eq!(lines[1].subtotal(now()).to_string(), "$15.00");
        assert_eq!(total(&lines, CurrencyCode::USD, now()).unwrap().to_string(), "$65.00");

        let later = now() + Duration::days(2);
        assert_eq!(total(&lines, CurrencyCode::USD, later).unwrap().to_string(), "$115.00");
    }

    #[test]
    fn test_empty_cart_total_is_zero() {
        assert_eq!(total(&[], CurrencyCode::EUR, now()).unwrap().to_string(), "€0.00");
        assert_eq!(item_count(&[]), 0);
    }

    #[test]
    fn test_total_rejects_foreign_currency_line() {
        let lines = [line(1, 10, 1, None)];
        assert_eq!(
            total(&lines, CurrencyCode::EUR, now()),
            Err(PriceError::CurrencyMismatch {
                expected: CurrencyCode::EUR,
                found: CurrencyCode::USD,
            })
        );
    }

    #[test]
    fn test_owner() {
        let cart = Cart {
            id: CartId::new(1),
            owner: CartOwner::User(UserId::new(4)),
            created_at: now(),
        };
        assert!(cart.is_owned_by(UserId::new(4)));
        assert!(!cart.is_owned_by(UserId::new(5)));
        assert!(!cart.is_anonymous());
        assert_eq!(cart.owner.user_id(), Some(UserId::new(4)));
    }
}
