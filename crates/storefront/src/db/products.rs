//! Product and sale queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use tuckshop_core::{
    CurrencyCode, NewProduct, NewSale, Percentage, Price, Product, ProductId, ProductUpdate, Sale,
    SaleId,
};

use super::{Catalog, PgStore, RepositoryError};

/// Product columns with the attached sale, selected from `p` joined to `s`.
const PRODUCT_COLUMNS: &str = "\
    p.id, p.title, p.description, p.price, p.currency_code, p.retired_at, \
    p.created_at, p.updated_at, \
    s.id AS sale_id, s.percentage AS sale_percentage, s.ends_at AS sale_ends_at";

const SALE_COLUMNS: &str = "id, percentage, ends_at";

/// `SELECT` products from `source`, which is a table or a CTE name.
fn select_products(source: &str) -> String {
    format!(
        "SELECT {PRODUCT_COLUMNS} FROM {source} p \
         LEFT JOIN storefront.sale s ON s.id = p.sale_id"
    )
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: SaleId,
    percentage: i16,
    ends_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = RepositoryError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        let percentage = Percentage::new(i64::from(row.percentage)).map_err(|e| {
            RepositoryError::DataCorruption(format!("sale {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            percentage,
            ends_at: row.ends_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    description: Option<String>,
    price: Decimal,
    currency_code: String,
    retired_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sale_id: Option<SaleId>,
    sale_percentage: Option<i16>,
    sale_ends_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let currency: CurrencyCode = row.currency_code.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;
        let price = Price::new(row.price, currency)
            .map_err(|e| RepositoryError::DataCorruption(format!("product {}: {e}", row.id)))?;

        let sale = match (row.sale_id, row.sale_percentage, row.sale_ends_at) {
            (Some(id), Some(percentage), Some(ends_at)) => Some(Sale::try_from(SaleRow {
                id,
                percentage,
                ends_at,
            })?),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price,
            sale,
            retired_at: row.retired_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A product write pointing at a missing sale is reported as `NotFound`.
fn missing_sale(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl Catalog for PgStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let query = format!(
            "{} WHERE p.retired_at IS NULL ORDER BY p.title, p.id",
            select_products("storefront.product")
        );
        let rows = sqlx::query_as::<_, ProductRow>(&query)
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let query = format!("{} WHERE p.id = $1", select_products("storefront.product"));
        let row = sqlx::query_as::<_, ProductRow>(&query)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(Product::try_from).transpose()
    }

    async fn create_product(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let query = format!(
            "WITH inserted AS ( \
                 INSERT INTO storefront.product (title, description, price, currency_code, sale_id) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING * \
             ) {}",
            select_products("inserted")
        );
        let row = sqlx::query_as::<_, ProductRow>(&query)
            .bind(input.title.trim())
            .bind(input.description.as_deref())
            .bind(input.price)
            .bind(self.currency.code())
            .bind(input.sale_id)
            .fetch_one(self.pool())
            .await
            .map_err(missing_sale)?;

        row.try_into()
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let query = format!(
            "WITH updated AS ( \
                 UPDATE storefront.product SET \
                     title = COALESCE($2, title), \
                     description = COALESCE($3, description), \
                     price = COALESCE($4, price), \
                     sale_id = CASE WHEN $6 THEN NULL ELSE COALESCE($5, sale_id) END, \
                     updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING * \
             ) {}",
            select_products("updated")
        );
        let row = sqlx::query_as::<_, ProductRow>(&query)
            .bind(id)
            .bind(update.title.as_deref().map(str::trim))
            .bind(update.description.as_deref())
            .bind(update.price)
            .bind(update.sale_id)
            .bind(update.clear_sale)
            .fetch_optional(self.pool())
            .await
            .map_err(missing_sale)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn retire_product(
        &self,
        id: ProductId,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError> {
        let query = format!(
            "WITH retired AS ( \
                 UPDATE storefront.product SET \
                     updated_at = CASE WHEN retired_at IS NULL THEN $2 ELSE updated_at END, \
                     retired_at = COALESCE(retired_at, $2) \
                 WHERE id = $1 \
                 RETURNING * \
             ) {}",
            select_products("retired")
        );
        let row = sqlx::query_as::<_, ProductRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(self.pool())
            .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn create_sale(&self, input: &NewSale) -> Result<Sale, RepositoryError> {
        let query = format!(
            "INSERT INTO storefront.sale (percentage, ends_at) VALUES ($1, $2) \
             RETURNING {SALE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SaleRow>(&query)
            .bind(i16::from(input.percentage.get()))
            .bind(input.ends_at)
            .fetch_one(self.pool())
            .await?;

        row.try_into()
    }

    async fn find_sale(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        let query = format!("SELECT {SALE_COLUMNS} FROM storefront.sale WHERE id = $1");
        let row = sqlx::query_as::<_, SaleRow>(&query)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(Sale::try_from).transpose()
    }
}
