//! Cart and line item queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use tuckshop_core::{Cart, CartId, CartOwner, LineItem, LineItemId, ProductId, Quantity, UserId};

use super::{CartStore, PgStore, RepositoryError, conflict_on_unique};

const CART_COLUMNS: &str = "id, user_id, created_at";

const LINE_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, added_at";

/// Upsert that adds to an existing line, capped at the `INTEGER` range.
const INCREMENT_LINE_ITEM: &str = "\
    INSERT INTO storefront.cart_product (cart_id, product_id, quantity) \
    VALUES ($1, $2, $3) \
    ON CONFLICT (cart_id, product_id) DO UPDATE \
    SET quantity = LEAST(cart_product.quantity::BIGINT + EXCLUDED.quantity, 2147483647)::INTEGER";

#[derive(Debug, FromRow)]
struct CartRow {
    id: CartId,
    user_id: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            owner: row.user_id.map_or(CartOwner::Anonymous, CartOwner::User),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: LineItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: i32,
    added_at: DateTime<Utc>,
}

impl TryFrom<LineItemRow> for LineItem {
    type Error = RepositoryError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .ok()
            .and_then(Quantity::new)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "line item {} has quantity {}",
                    row.id, row.quantity
                ))
            })?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity,
            added_at: row.added_at,
        })
    }
}

/// A write pointing at a missing cart, product or user is reported as `NotFound`.
fn missing_reference(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl CartStore for PgStore {
    async fn find_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let query = format!("SELECT {CART_COLUMNS} FROM storefront.cart WHERE id = $1");
        let row = sqlx::query_as::<_, CartRow>(&query)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(Cart::from))
    }

    async fn find_cart_for_user(&self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        let query = format!("SELECT {CART_COLUMNS} FROM storefront.cart WHERE user_id = $1");
        let row = sqlx::query_as::<_, CartRow>(&query)
            .bind(user)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(Cart::from))
    }

    async fn create_cart(&self, owner: CartOwner) -> Result<Cart, RepositoryError> {
        let Some(user) = owner.user_id() else {
            let query = format!(
                "INSERT INTO storefront.cart (user_id) VALUES (NULL) RETURNING {CART_COLUMNS}"
            );
            let row = sqlx::query_as::<_, CartRow>(&query)
                .fetch_one(self.pool())
                .await?;
            return Ok(row.into());
        };

        // Two first requests for the same user race here; the loser re-reads.
        let query = format!(
            "INSERT INTO storefront.cart (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO NOTHING \
             RETURNING {CART_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, CartRow>(&query)
            .bind(user)
            .fetch_optional(self.pool())
            .await
            .map_err(missing_reference)?;

        match inserted {
            Some(row) => Ok(row.into()),
            None => self
                .find_cart_for_user(user)
                .await?
                .ok_or(RepositoryError::NotFound),
        }
    }

    async fn assign_owner(&self, cart: CartId, user: UserId) -> Result<Cart, RepositoryError> {
        let query = format!(
            "UPDATE storefront.cart SET user_id = $2 \
             WHERE id = $1 AND user_id IS NULL \
             RETURNING {CART_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CartRow>(&query)
            .bind(cart)
            .bind(user)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| conflict_on_unique(e, "cart for user"))?;

        row.map(Cart::from).ok_or(RepositoryError::NotFound)
    }

    async fn merge_carts(&self, source: CartId, target: CartId) -> Result<(), RepositoryError> {
        if source == target {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;

        // Lock both carts in id order so concurrent merges cannot deadlock.
        let locked: Vec<CartId> = sqlx::query_scalar(
            "SELECT id FROM storefront.cart WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(vec![source.as_i32(), target.as_i32()])
        .fetch_all(&mut *tx)
        .await?;

        if !locked.contains(&target) {
            return Err(RepositoryError::NotFound);
        }
        if !locked.contains(&source) {
            tracing::debug!(%source, %target, "merge source already gone");
            return Ok(());
        }

        let query = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM storefront.cart_product \
             WHERE cart_id = $1 ORDER BY added_at, id"
        );
        let rows = sqlx::query_as::<_, LineItemRow>(&query)
            .bind(source)
            .fetch_all(&mut *tx)
            .await?;

        for row in rows {
            let item = LineItem::try_from(row)?;
            sqlx::query(INCREMENT_LINE_ITEM)
                .bind(target)
                .bind(item.product_id)
                .bind(item.quantity.as_i32())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM storefront.cart WHERE id = $1")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn line_items(&self, cart: CartId) -> Result<Vec<LineItem>, RepositoryError> {
        let query = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM storefront.cart_product \
             WHERE cart_id = $1 ORDER BY added_at, id"
        );
        let rows = sqlx::query_as::<_, LineItemRow>(&query)
            .bind(cart)
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(LineItem::try_from).collect()
    }

    async fn increment_line_item(
        &self,
        cart: CartId,
        product: ProductId,
        by: Quantity,
    ) -> Result<LineItem, RepositoryError> {
        let query = format!("{INCREMENT_LINE_ITEM} RETURNING {LINE_ITEM_COLUMNS}");
        let row = sqlx::query_as::<_, LineItemRow>(&query)
            .bind(cart)
            .bind(product)
            .bind(by.as_i32())
            .fetch_one(self.pool())
            .await
            .map_err(missing_reference)?;

        row.try_into()
    }

    async fn set_line_item_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<LineItem, RepositoryError> {
        let query = format!(
            "INSERT INTO storefront.cart_product (cart_id, product_id, quantity) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity \
             RETURNING {LINE_ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LineItemRow>(&query)
            .bind(cart)
            .bind(product)
            .bind(quantity.as_i32())
            .fetch_one(self.pool())
            .await
            .map_err(missing_reference)?;

        row.try_into()
    }

    async fn delete_line_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.cart_product WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart)
        .bind(product)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_line_items_for_product(
        &self,
        product: ProductId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_product WHERE product_id = $1")
            .bind(product)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
