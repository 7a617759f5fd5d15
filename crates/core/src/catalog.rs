//! Products, sales and the validated inputs that change them.
//!
//! Catalog entities are only changed through the explicit input structs in
//! this module ([`NewProduct`], [`ProductUpdate`], [`NewSale`]); each lists
//! exactly the fields an administrator may set and validates them up front.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing;
use crate::types::{Percentage, Price, ProductId, SaleId};

/// Maximum length of a product title.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Decimal places a stored price keeps (`NUMERIC(12, 4)`).
pub const MAX_PRICE_SCALE: u32 = 4;

/// Integer digits a stored price may have (`NUMERIC(12, 4)`).
pub const MAX_PRICE_INTEGER_DIGITS: u32 = 8;

/// A time-limited percentage discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sale {
    /// Unique sale ID.
    pub id: SaleId,
    /// Discount applied to the product price.
    pub percentage: Percentage,
    /// The sale stops applying at this instant.
    pub ends_at: DateTime<Utc>,
}

impl Sale {
    /// A sale is active strictly before its end.
    #[must_use]
    pub fn is_active(&self, as_of: DateTime<Utc>) -> bool {
        as_of < self.ends_at
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Base unit price before any sale.
    pub price: Price,
    /// Sale attached to the product, active or not.
    pub sale: Option<Sale>,
    /// Set once an administrator retires the product.
    pub retired_at: Option<DateTime<Utc>>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Retired products can no longer be added to carts.
    #[must_use]
    pub const fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }

    /// The attached sale if it is active at `as_of`.
    #[must_use]
    pub fn active_sale(&self, as_of: DateTime<Utc>) -> Option<&Sale> {
        self.sale.as_ref().filter(|sale| sale.is_active(as_of))
    }

    /// Unit price after any active sale.
    #[must_use]
    pub fn effective_price(&self, as_of: DateTime<Utc>) -> Price {
        pricing::effective_price(self.price, self.sale.as_ref(), as_of)
    }
}

/// Validation failures for catalog input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty after trimming.
    #[error("title cannot be empty")]
    EmptyTitle,
    /// Title exceeds [`MAX_TITLE_LENGTH`].
    #[error("title must be at most {max} characters")]
    TitleTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Price is below zero.
    #[error("price cannot be negative")]
    NegativePrice,
    /// The price has more decimal places than are stored.
    #[error("price must have at most {max} decimal places")]
    PriceTooPrecise { max: u32 },
    /// The price is too large to store.
    #[error("price must be below 10^{max_digits}")]
    PriceTooLarge { max_digits: u32 },
    /// Both `sale_id` and `clear_sale` were given.
    #[error("cannot set and clear a sale in the same update")]
    ConflictingSaleChange,
    /// The update changes nothing.
    #[error("update contains no changes")]
    EmptyUpdate,
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong {
            max: MAX_TITLE_LENGTH,
        });
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), ValidationError> {
    if price < Decimal::ZERO {
        return Err(ValidationError::NegativePrice);
    }
    if price.normalize().scale() > MAX_PRICE_SCALE {
        return Err(ValidationError::PriceTooPrecise {
            max: MAX_PRICE_SCALE,
        });
    }
    if price >= Decimal::from(10_u64.pow(MAX_PRICE_INTEGER_DIGITS)) {
        return Err(ValidationError::PriceTooLarge {
            max_digits: MAX_PRICE_INTEGER_DIGITS,
        });
    }
    Ok(())
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub sale_id: Option<SaleId>,
}

impl NewProduct {
    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_price(self.price)
    }
}

/// Partial update of a product.
///
/// `None` leaves a field unchanged. The sale reference is changed with
/// `sale_id` and removed with `clear_sale`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub sale_id: Option<SaleId>,
    #[serde(default)]
    pub clear_sale: bool,
}

impl ProductUpdate {
    /// Check every provided field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        if self.sale_id.is_some() && self.clear_sale {
            return Err(ValidationError::ConflictingSaleChange);
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// True when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.sale_id.is_none()
            && !self.clear_sale
    }

    /// Apply the update to a product in place.
    ///
    /// `sale` is the already-resolved sale for `sale_id`; callers look it up
    /// so that a dangling reference is reported before anything changes.
    pub fn apply(&self, product: &mut Product, sale: Option<Sale>, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            title.trim().clone_into(&mut product.title);
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if let Some(amount) = self.price
            && let Ok(price) = Price::new(amount, product.price.currency_code())
        {
            product.price = price;
        }
        if self.clear_sale {
            product.sale = None;
        } else if self.sale_id.is_some() {
            product.sale = sale;
        }
        product.updated_at = now;
    }
}

/// Input for creating a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub percentage: Percentage,
    pub ends_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::CurrencyCode;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).unwrap()
    }

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            title: "Mango".to_owned(),
            description: None,
            price: Price::new(Decimal::from(100), CurrencyCode::USD).unwrap(),
            sale: None,
            retired_at: None,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn test_sale_active_strictly_before_end() {
        let sale = Sale {
            id: SaleId::new(1),
            percentage: Percentage::new(50).unwrap(),
            ends_at: at(12),
        };
        assert!(sale.is_active(at(11)));
        assert!(!sale.is_active(at(12)));
        assert!(!sale.is_active(at(12) + Duration::seconds(1)));
    }

    #[test]
    fn test_new_product_validation() {
        let mut input = NewProduct {
            title: "  ".to_owned(),
            description: None,
            price: Decimal::from(5),
            sale_id: None,
        };
        assert_eq!(input.validate(), Err(ValidationError::EmptyTitle));

        input.title = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(matches!(
            input.validate(),
            Err(ValidationError::TitleTooLong { .. })
        ));

        input.title = "Lemonade".to_owned();
        input.price = Decimal::new(-1, 0);
        assert_eq!(input.validate(), Err(ValidationError::NegativePrice));

        input.price = Decimal::ZERO;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_price_must_fit_storage() {
        let update = |price: Decimal| ProductUpdate {
            price: Some(price),
            ..ProductUpdate::default()
        };

        // 0.00001 needs a fifth decimal place
        assert_eq!(
            update(Decimal::new(1, 5)).validate(),
            Err(ValidationError::PriceTooPrecise { max: 4 })
        );
        // Trailing zeros do not count
        assert!(update(Decimal::new(250_000, 5)).validate().is_ok());
        assert!(update(Decimal::new(12_345, 4)).validate().is_ok());

        assert_eq!(
            update(Decimal::from(100_000_000)).validate(),
            Err(ValidationError::PriceTooLarge { max_digits: 8 })
        );
        assert!(update(Decimal::new(999_999_999_999, 4)).validate().is_ok());
    }

    #[test]
    fn test_product_update_validation() {
        assert_eq!(
            ProductUpdate::default().validate(),
            Err(ValidationError::EmptyUpdate)
        );

        let conflicting = ProductUpdate {
            sale_id: Some(SaleId::new(1)),
            clear_sale: true,
            ..ProductUpdate::default()
        };
        assert_eq!(
            conflicting.validate(),
            Err(ValidationError::ConflictingSaleChange)
        );

        let unknown_field = serde_json::from_str::<ProductUpdate>(r#"{"id": 5}"#);
        assert!(unknown_field.is_err());
    }

    #[test]
    fn test_product_update_apply() {
        let mut p = product();
        let sale = Sale {
            id: SaleId::new(3),
            percentage: Percentage::new(25).unwrap(),
            ends_at: at(23),
        };
        let update = ProductUpdate {
            title: Some(" Ripe Mango ".to_owned()),
            price: Some(Decimal::from(80)),
            sale_id: Some(sale.id),
            ..ProductUpdate::default()
        };
        update.apply(&mut p, Some(sale), at(5));

        assert_eq!(p.title, "Ripe Mango");
        assert_eq!(p.price.amount(), Decimal::from(80));
        assert_eq!(p.sale, Some(sale));
        assert_eq!(p.updated_at, at(5));
        assert_eq!(p.effective_price(at(6)).amount(), Decimal::from(60));

        let clear = ProductUpdate {
            clear_sale: true,
            ..ProductUpdate::default()
        };
        clear.apply(&mut p, None, at(7));
        assert!(p.sale.is_none());
    }
}
