//! Line-item mutations and pricing through a resolved cart.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use chrono::{Duration, Utc};

use tuckshop_core::{Percentage, ProductId, Quantity};
use tuckshop_integration_tests::{TestShop, Visitor, far_future};
use tuckshop_storefront::db::CartStore;
use tuckshop_storefront::services::CartError;

#[tokio::test]
async fn adding_twice_keeps_one_line() {
    let shop = TestShop::new();
    let pen = shop.product("Pen", 3).await.unwrap();
    let mut visitor = Visitor::default();
    let cart = visitor.visit(&shop).await.unwrap();

    shop.carts.add(cart.id, pen, Quantity::ONE).await.unwrap();
    shop.carts.add(cart.id, pen, Quantity::ONE).await.unwrap();

    let lines = shop.store.line_items(cart.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity.get(), 2);
}

#[tokio::test]
async fn anonymous_total_sums_products() {
    let shop = TestShop::new();
    let a = shop.product("A", 10).await.unwrap();
    let b = shop.product("B", 20).await.unwrap();
    let mut visitor = Visitor::default();

    let cart = visitor.visit(&shop).await.unwrap();
    shop.carts.add(cart.id, a, Quantity::ONE).await.unwrap();

    // Second request in the same session sees the same cart
    let cart = visitor.visit(&shop).await.unwrap();
    shop.carts.add(cart.id, b, Quantity::ONE).await.unwrap();

    let total = shop.carts.total(cart.id, Utc::now()).await.unwrap();
    assert_eq!(total.to_string(), "$30.00");
}

#[tokio::test]
async fn sale_halves_the_total() {
    let shop = TestShop::new();
    let half = shop
        .sale(Percentage::new(50).unwrap(), far_future())
        .await
        .unwrap();
    let kettle = shop.product_with_sale("Kettle", 100, Some(half)).await.unwrap();
    let mut visitor = Visitor::default();
    let cart = visitor.visit(&shop).await.unwrap();

    shop.carts.add(cart.id, kettle, Quantity::ONE).await.unwrap();

    let now = Utc::now();
    assert_eq!(shop.carts.total(cart.id, now).await.unwrap().to_string(), "$50.00");

    // Once the sale has ended the base price applies again
    let later = far_future() + Duration::seconds(1);
    assert_eq!(
        shop.carts.total(cart.id, later).await.unwrap().to_string(),
        "$100.00"
    );
}

#[tokio::test]
async fn sale_ending_at_evaluation_time_is_over() {
    let shop = TestShop::new();
    let ends_at = Utc::now() + Duration::hours(1);
    let sale = shop.sale(Percentage::new(50).unwrap(), ends_at).await.unwrap();
    let id = shop.product_with_sale("Toaster", 100, Some(sale)).await.unwrap();
    let product = shop.catalog.show(id).await.unwrap();

    assert_eq!(
        product.effective_price(ends_at - Duration::seconds(1)).to_string(),
        "$50.00"
    );
    assert_eq!(product.effective_price(ends_at).to_string(), "$100.00");
}

#[tokio::test]
async fn zero_or_negative_quantity_removes_line() {
    let shop = TestShop::new();
    let cup = shop.product("Cup", 4).await.unwrap();
    let plate = shop.product("Plate", 6).await.unwrap();
    let mut visitor = Visitor::default();
    let cart = visitor.visit(&shop).await.unwrap();

    shop.carts.add(cart.id, cup, Quantity::ONE).await.unwrap();
    shop.carts.add(cart.id, plate, Quantity::ONE).await.unwrap();

    assert!(shop.carts.set_quantity(cart.id, cup, 0).await.unwrap().is_none());
    assert!(shop.carts.set_quantity(cart.id, plate, -3).await.unwrap().is_none());
    assert!(shop.store.line_items(cart.id).await.unwrap().is_empty());

    // Absent line with a non-positive quantity is a no-op
    assert!(shop.carts.set_quantity(cart.id, cup, -1).await.unwrap().is_none());
}

#[tokio::test]
async fn set_quantity_overwrites() {
    let shop = TestShop::new();
    let cup = shop.product("Cup", 4).await.unwrap();
    let mut visitor = Visitor::default();
    let cart = visitor.visit(&shop).await.unwrap();

    shop.carts.add(cart.id, cup, Quantity::ONE).await.unwrap();
    let line = shop.carts.set_quantity(cart.id, cup, 5).await.unwrap().unwrap();
    assert_eq!(line.quantity.get(), 5);

    let summary = shop.carts.summary(cart, Utc::now()).await.unwrap();
    assert_eq!(summary.item_count, 5);
    assert_eq!(summary.total.to_string(), "$20.00");
}

#[tokio::test]
async fn missing_and_retired_products_cannot_be_added() {
    let shop = TestShop::new();
    let mug = shop.product("Mug", 8).await.unwrap();
    shop.catalog.retire(mug).await.unwrap();
    let mut visitor = Visitor::default();
    let cart = visitor.visit(&shop).await.unwrap();

    assert!(matches!(
        shop.carts.add(cart.id, mug, Quantity::ONE).await,
        Err(CartError::ProductNotFound(id)) if id == mug
    ));
    assert!(matches!(
        shop.carts.add(cart.id, ProductId::new(4040), Quantity::ONE).await,
        Err(CartError::ProductNotFound(_))
    ));
    assert!(shop.store.line_items(cart.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn removing_absent_line_is_not_an_error() {
    let shop = TestShop::new();
    let cup = shop.product("Cup", 4).await.unwrap();
    let mut visitor = Visitor::default();
    let cart = visitor.visit(&shop).await.unwrap();

    assert!(!shop.carts.remove(cart.id, cup).await.unwrap());
}
