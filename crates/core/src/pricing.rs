//! Price engine.
//!
//! The effective unit price of a product is its base price, reduced by the
//! sale percentage while the sale is active. Discounted prices are rounded to
//! the currency's minor unit with half-up rounding; undiscounted prices are
//! returned untouched.

use chrono::{DateTime, Utc};

use crate::catalog::Sale;
use crate::types::Price;

/// Effective unit price of `base` under an optional `sale`, evaluated at `as_of`.
#[must_use]
pub fn effective_price(base: Price, sale: Option<&Sale>, as_of: DateTime<Utc>) -> Price {
    match sale {
        Some(sale) if sale.is_active(as_of) => base.discounted_by(sale.percentage),
        _ => base,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    use super::*;
    use crate::{CurrencyCode, Percentage, SaleId};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    fn hundred() -> Price {
        Price::new(Decimal::from(100), CurrencyCode::USD).unwrap()
    }

    fn half_off_until(ends_at: DateTime<Utc>) -> Sale {
        Sale {
            id: SaleId::new(1),
            percentage: Percentage::new(50).unwrap(),
            ends_at,
        }
    }

    #[test]
    fn test_active_sale_halves_price() {
        let sale = half_off_until(now() + Duration::days(16));
        let price = effective_price(hundred(), Some(&sale), now());
        assert_eq!(price.amount(), Decimal::new(5000, 2));
        assert_eq!(price.to_string(), "$50.00");
    }

    #[test]
    fn test_expired_sale_keeps_base_price() {
        let sale = half_off_until(now() - Duration::seconds(1));
        let price = effective_price(hundred(), Some(&sale), now());
        assert_eq!(price.to_string(), "$100.00");
    }

    #[test]
    fn test_no_sale() {
        assert_eq!(effective_price(hundred(), None, now()), hundred());
    }

    #[test]
    fn test_full_and_zero_discounts() {
        let mut sale = half_off_until(now() + Duration::hours(1));
        sale.percentage = Percentage::new(100).unwrap();
        assert_eq!(
            effective_price(hundred(), Some(&sale), now()).amount(),
            Decimal::ZERO
        );

        sale.percentage = Percentage::new(0).unwrap();
        assert_eq!(
            effective_price(hundred(), Some(&sale), now()).amount(),
            Decimal::from(100)
        );
    }
}
