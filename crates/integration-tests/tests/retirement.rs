//! Retiring a product purges it from every cart.

#![allow(clippy::unwrap_used)]

use chrono::Utc;

use tuckshop_core::Quantity;
use tuckshop_integration_tests::{TestShop, Visitor};
use tuckshop_storefront::db::CartStore;
use tuckshop_storefront::services::CatalogError;

#[tokio::test]
async fn retiring_purges_all_carts() {
    let shop = TestShop::new();
    let gum = shop.product("Gum", 1).await.unwrap();
    let tea = shop.product("Tea", 5).await.unwrap();
    let user = shop.customer("ivy@example.com").await.unwrap();

    let mut anonymous = Visitor::default();
    let first = anonymous.visit(&shop).await.unwrap();
    shop.carts.add(first.id, gum, Quantity::ONE).await.unwrap();
    shop.carts.add(first.id, tea, Quantity::ONE).await.unwrap();

    let mut member = Visitor::default();
    let second = member.log_in(&shop, user).await.unwrap();
    shop.carts
        .add(second.id, gum, Quantity::new(4).unwrap())
        .await
        .unwrap();

    let retirement = shop.catalog.retire(gum).await.unwrap();
    assert_eq!(retirement.purged_lines, 2);

    // Neither cart was viewed; both are already clean
    let first_lines = shop.store.line_items(first.id).await.unwrap();
    assert_eq!(first_lines.len(), 1);
    assert_eq!(first_lines.first().unwrap().product_id, tea);
    assert!(shop.store.line_items(second.id).await.unwrap().is_empty());

    let total = shop.carts.total(first.id, Utc::now()).await.unwrap();
    assert_eq!(total.to_string(), "$5.00");
}

#[tokio::test]
async fn retired_product_leaves_the_catalog() {
    let shop = TestShop::new();
    let gum = shop.product("Gum", 1).await.unwrap();
    let tea = shop.product("Tea", 5).await.unwrap();

    shop.catalog.retire(gum).await.unwrap();

    let listed: Vec<_> = shop.catalog.list().await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(listed, vec![tea]);
    assert!(matches!(
        shop.catalog.show(gum).await,
        Err(CatalogError::NotFound(_))
    ));
}

#[tokio::test]
async fn retiring_twice_is_harmless() {
    let shop = TestShop::new();
    let gum = shop.product("Gum", 1).await.unwrap();

    let first = shop.catalog.retire(gum).await.unwrap();
    let second = shop.catalog.retire(gum).await.unwrap();

    assert_eq!(first.product.retired_at, second.product.retired_at);
    assert_eq!(second.purged_lines, 0);
}
