//! Integration tests for the destructive storefront wipe
//!
//! The wipe walks six entity listings and deletes every node. These tests
//! run it against a mockito storefront through the public API.

use mockito::Matcher;
use secrecy::SecretString;
use serde_json::json;
use shopsync::adapters::StorefrontClient;
use shopsync::config::ShopConfig;
use shopsync::core::wipe_storefront;
use std::sync::Arc;

const GRAPHQL_PATH: &str = "/admin/api/2024-07/graphql.json";

const LIST_OPERATIONS: [(&str, &str); 6] = [
    ("listProducts", "products"),
    ("listCollections", "collections"),
    ("listPriceLists", "priceLists"),
    ("listCatalogs", "catalogs"),
    ("listMetafieldDefinitions", "metafieldDefinitions"),
    ("listMarkets", "markets"),
];

fn client(shop: &mockito::Server) -> Arc<StorefrontClient> {
    let config = ShopConfig {
        domain: shop.url(),
        access_token: SecretString::from("shpat_test".to_string()),
        api_version: "2024-07".to_string(),
        timeout_ms: 5_000,
    };
    Arc::new(StorefrontClient::new(&config).expect("Failed to build shop client"))
}

async fn mock_listing(
    shop: &mut mockito::ServerGuard,
    operation: &str,
    field: &str,
    nodes: serde_json::Value,
) {
    shop.mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::Regex(operation.to_string()))
        .with_body(
            json!({
                "data": {
                    field: {
                        "nodes": nodes,
                        "pageInfo": {"hasNextPage": false, "endCursor": ""}
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
}

#[tokio::test]
async fn test_wipe_of_empty_storefront_deletes_nothing() {
    let mut shop = mockito::Server::new_async().await;
    for (operation, field) in LIST_OPERATIONS {
        mock_listing(&mut shop, operation, field, json!([])).await;
    }

    let summary = wipe_storefront(client(&shop)).await.unwrap();

    assert_eq!(summary.total(), 0);
    assert_eq!(summary.products, 0);
    assert_eq!(summary.markets, 0);
}

#[tokio::test]
async fn test_wipe_deletes_listed_products() {
    let mut shop = mockito::Server::new_async().await;
    for (operation, field) in LIST_OPERATIONS {
        if operation == "listProducts" {
            continue;
        }
        mock_listing(&mut shop, operation, field, json!([])).await;
    }
    mock_listing(
        &mut shop,
        "listProducts",
        "products",
        json!([{"id": "gid://shopify/Product/1"}, {"id": "gid://shopify/Product/2"}]),
    )
    .await;
    let deletes = shop
        .mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::Regex("productDelete".to_string()))
        .with_body(
            json!({"data": {"productDelete": {"deletedProductId": "x", "userErrors": []}}})
                .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let summary = wipe_storefront(client(&shop)).await.unwrap();

    deletes.assert_async().await;
    assert_eq!(summary.products, 2);
    assert_eq!(summary.total(), 2);
}

#[tokio::test]
async fn test_wipe_surfaces_delete_failures() {
    let mut shop = mockito::Server::new_async().await;
    for (operation, field) in LIST_OPERATIONS {
        if operation == "listCollections" {
            continue;
        }
        mock_listing(&mut shop, operation, field, json!([])).await;
    }
    mock_listing(
        &mut shop,
        "listCollections",
        "collections",
        json!([{"id": "gid://shopify/Collection/5"}]),
    )
    .await;
    shop.mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::Regex("collectionDelete".to_string()))
        .with_body(
            json!({
                "data": {
                    "collectionDelete": {
                        "deletedCollectionId": null,
                        "userErrors": [{"field": ["input"], "message": "collection is locked"}]
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = wipe_storefront(client(&shop)).await.unwrap_err();

    assert!(err.to_string().contains("collection is locked"), "was: {err}");
}
