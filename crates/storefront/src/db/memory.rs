//! In-process store with the same semantics as [`PgStore`](super::PgStore).
//!
//! Every operation takes one lock over the whole state, which makes each of
//! them atomic, merges included.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use tuckshop_core::{
    Cart, CartId, CartOwner, CurrencyCode, Email, LineItem, LineItemId, NewProduct, NewSale,
    Price, Product, ProductId, ProductUpdate, Quantity, Sale, SaleId, UserId,
};

use super::{CartStore, Catalog, RepositoryError, UserStore};
use crate::models::user::User;

/// Store backed by maps behind a `tokio` mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    currency: CurrencyCode,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i32,
    carts: BTreeMap<CartId, Cart>,
    /// All line items, in insertion order.
    lines: Vec<LineItem>,
    products: BTreeMap<ProductId, Product>,
    sales: BTreeMap<SaleId, Sale>,
    users: BTreeMap<UserId, (User, String)>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn line_position(&self, cart: CartId, product: ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.cart_id == cart && line.product_id == product)
    }

    fn ensure_line_target(&self, cart: CartId, product: ProductId) -> Result<(), RepositoryError> {
        if self.carts.contains_key(&cart) && self.products.contains_key(&product) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn push_line(&mut self, cart: CartId, product: ProductId, quantity: Quantity) -> LineItem {
        let line = LineItem {
            id: LineItemId::new(self.next_id()),
            cart_id: cart,
            product_id: product,
            quantity,
            added_at: Utc::now(),
        };
        self.lines.push(line);
        line
    }

    /// Add `by` to an existing line or append a new one.
    fn increment(&mut self, cart: CartId, product: ProductId, by: Quantity) -> LineItem {
        if let Some(index) = self.line_position(cart, product)
            && let Some(line) = self.lines.get_mut(index)
        {
            line.quantity = line.quantity.saturating_add(by);
            return *line;
        }
        self.push_line(cart, product, by)
    }

    fn sale(&self, id: Option<SaleId>) -> Result<Option<Sale>, RepositoryError> {
        id.map(|id| self.sales.get(&id).copied().ok_or(RepositoryError::NotFound))
            .transpose()
    }
}

impl MemoryStore {
    /// An empty store pricing new products in `currency`.
    #[must_use]
    pub fn new(currency: CurrencyCode) -> Self {
        Self {
            currency,
            state: Mutex::default(),
        }
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.state.lock().await.carts.get(&id).copied())
    }

    async fn find_cart_for_user(&self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .carts
            .values()
            .find(|cart| cart.is_owned_by(user))
            .copied())
    }

    async fn create_cart(&self, owner: CartOwner) -> Result<Cart, RepositoryError> {
        let mut state = self.state.lock().await;

        if let CartOwner::User(user) = owner {
            if !state.users.contains_key(&user) {
                return Err(RepositoryError::NotFound);
            }
            if let Some(existing) = state.carts.values().find(|cart| cart.is_owned_by(user)) {
                return Ok(*existing);
            }
        }

        let cart = Cart {
            id: CartId::new(state.next_id()),
            owner,
            created_at: Utc::now(),
        };
        state.carts.insert(cart.id, cart);
        Ok(cart)
    }

    async fn assign_owner(&self, cart: CartId, user: UserId) -> Result<Cart, RepositoryError> {
        let mut state = self.state.lock().await;

        if state.carts.values().any(|c| c.is_owned_by(user)) {
            return Err(RepositoryError::Conflict(
                "cart for user already exists".to_owned(),
            ));
        }

        let entry = state
            .carts
            .get_mut(&cart)
            .filter(|c| c.is_anonymous())
            .ok_or(RepositoryError::NotFound)?;
        entry.owner = CartOwner::User(user);
        Ok(*entry)
    }

    async fn merge_carts(&self, source: CartId, target: CartId) -> Result<(), RepositoryError> {
        if source == target {
            return Ok(());
        }

        let mut state = self.state.lock().await;

        if !state.carts.contains_key(&target) {
            return Err(RepositoryError::NotFound);
        }
        if state.carts.remove(&source).is_none() {
            return Ok(());
        }

        let (moved, kept): (Vec<LineItem>, Vec<LineItem>) = std::mem::take(&mut state.lines)
            .into_iter()
            .partition(|line| line.cart_id == source);
        state.lines = kept;

        for line in moved {
            state.increment(target, line.product_id, line.quantity);
        }

        Ok(())
    }

    async fn line_items(&self, cart: CartId) -> Result<Vec<LineItem>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .lines
            .iter()
            .filter(|line| line.cart_id == cart)
            .copied()
            .collect())
    }

    async fn increment_line_item(
        &self,
        cart: CartId,
        product: ProductId,
        by: Quantity,
    ) -> Result<LineItem, RepositoryError> {
        let mut state = self.state.lock().await;
        state.ensure_line_target(cart, product)?;
        Ok(state.increment(cart, product, by))
    }

    async fn set_line_item_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<LineItem, RepositoryError> {
        let mut state = self.state.lock().await;
        state.ensure_line_target(cart, product)?;

        if let Some(index) = state.line_position(cart, product)
            && let Some(line) = state.lines.get_mut(index)
        {
            line.quantity = quantity;
            return Ok(*line);
        }
        Ok(state.push_line(cart, product, quantity))
    }

    async fn delete_line_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let before = state.lines.len();
        state
            .lines
            .retain(|line| !(line.cart_id == cart && line.product_id == product));
        Ok(state.lines.len() < before)
    }

    async fn delete_line_items_for_product(
        &self,
        product: ProductId,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().await;
        let before = state.lines.len();
        state.lines.retain(|line| line.product_id != product);
        Ok(u64::try_from(before - state.lines.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|product| !product.is_retired())
            .cloned()
            .collect();
        products.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn create_product(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        let sale = state.sale(input.sale_id)?;
        let price = Price::new(input.price, self.currency)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
        let now = Utc::now();

        let product = Product {
            id: ProductId::new(state.next_id()),
            title: input.title.trim().to_owned(),
            description: input.description.clone(),
            price,
            sale,
            retired_at: None,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        let sale = state.sale(update.sale_id)?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        update.apply(product, sale, Utc::now());
        Ok(product.clone())
    }

    async fn retire_product(
        &self,
        id: ProductId,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        if product.retired_at.is_none() {
            product.retired_at = Some(at);
            product.updated_at = at;
        }
        Ok(product.clone())
    }

    async fn create_sale(&self, input: &NewSale) -> Result<Sale, RepositoryError> {
        let mut state = self.state.lock().await;
        let sale = Sale {
            id: SaleId::new(state.next_id()),
            percentage: input.percentage,
            ends_at: input.ends_at,
        };
        state.sales.insert(sale.id, sale);
        Ok(sale)
    }

    async fn find_sale(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        Ok(self.state.lock().await.sales.get(&id).copied())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;

        if state.users.values().any(|(user, _)| &user.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(state.next_id()),
            email: email.clone(),
            is_admin,
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .insert(user.id, (user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    async fn product(store: &MemoryStore, title: &str) -> ProductId {
        store
            .create_product(&NewProduct {
                title: title.to_owned(),
                description: None,
                price: Decimal::from(10),
                sale_id: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_increment_keeps_one_line_per_product() {
        let store = MemoryStore::default();
        let cart = store.create_cart(CartOwner::Anonymous).await.unwrap();
        let pen = product(&store, "Pen").await;

        store
            .increment_line_item(cart.id, pen, Quantity::ONE)
            .await
            .unwrap();
        let line = store
            .increment_line_item(cart.id, pen, Quantity::ONE)
            .await
            .unwrap();

        assert_eq!(line.quantity.get(), 2);
        assert_eq!(store.line_items(cart.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_merge_sums_and_deletes_source() {
        let store = MemoryStore::default();
        let user = store
            .create_user(&Email::parse("a@b.co").unwrap(), "hash", false)
            .await
            .unwrap();
        let source = store.create_cart(CartOwner::Anonymous).await.unwrap();
        let target = store.create_cart(CartOwner::User(user.id)).await.unwrap();
        let pen = product(&store, "Pen").await;
        let ink = product(&store, "Ink").await;

        store
            .increment_line_item(target.id, pen, Quantity::ONE)
            .await
            .unwrap();
        store
            .increment_line_item(source.id, ink, Quantity::ONE)
            .await
            .unwrap();
        store
            .increment_line_item(source.id, pen, Quantity::new(2).unwrap())
            .await
            .unwrap();

        store.merge_carts(source.id, target.id).await.unwrap();

        let lines = store.line_items(target.id).await.unwrap();
        let summary: Vec<(ProductId, u32)> = lines
            .iter()
            .map(|line| (line.product_id, line.quantity.get()))
            .collect();
        assert_eq!(summary, vec![(pen, 3), (ink, 1)]);
        assert!(store.find_cart(source.id).await.unwrap().is_none());
        assert!(store.line_items(source.id).await.unwrap().is_empty());

        // A second merge of the same source is a no-op.
        store.merge_carts(source.id, target.id).await.unwrap();
        assert_eq!(store.line_items(target.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_assign_owner_rules() {
        let store = MemoryStore::default();
        let user = store
            .create_user(&Email::parse("a@b.co").unwrap(), "hash", false)
            .await
            .unwrap();
        let first = store.create_cart(CartOwner::Anonymous).await.unwrap();
        let second = store.create_cart(CartOwner::Anonymous).await.unwrap();

        let adopted = store.assign_owner(first.id, user.id).await.unwrap();
        assert!(adopted.is_owned_by(user.id));

        assert!(matches!(
            store.assign_owner(second.id, user.id).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert!(matches!(
            store.assign_owner(CartId::new(999), UserId::new(998)).await,
            Err(RepositoryError::NotFound)
        ));

        let again = store.create_cart(CartOwner::User(user.id)).await.unwrap();
        assert_eq!(again.id, first.id);
    }

    #[tokio::test]
    async fn test_retire_is_idempotent_and_hides_product() {
        let store = MemoryStore::default();
        let pen = product(&store, "Pen").await;
        let first = Utc::now();

        store.retire_product(pen, first).await.unwrap();
        let again = store
            .retire_product(pen, first + chrono::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(again.retired_at, Some(first));
        assert!(store.list_products().await.unwrap().is_empty());
        assert!(store.find_product(pen).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::default();
        let email = Email::parse("a@b.co").unwrap();
        store.create_user(&email, "hash", false).await.unwrap();
        assert!(matches!(
            store.create_user(&email, "hash", true).await,
            Err(RepositoryError::Conflict(_))
        ));
    }
}
