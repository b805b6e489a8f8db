//! Integration tests driving the sync engine through its public API
//!
//! Both collaborators are mockito servers: the ERP serves canned dataset
//! snapshots, the storefront answers the GraphQL operations each flow
//! performs. Flow internals are covered by unit tests; these tests check
//! that the public surface wires clients, flows, and summaries together.

use mockito::Matcher;
use secrecy::SecretString;
use serde_json::json;
use shopsync::adapters::{ErpClient, StorefrontClient};
use shopsync::config::{ErpConfig, ShopConfig};
use shopsync::core::SyncEngine;
use std::sync::Arc;

const GRAPHQL_PATH: &str = "/admin/api/2024-07/graphql.json";

fn engine(erp: &mockito::Server, shop: &mockito::Server) -> SyncEngine {
    let erp_config = ErpConfig {
        base_url: erp.url(),
        token: SecretString::from("erp-token".to_string()),
        timeout_ms: 5_000,
    };
    let shop_config = ShopConfig {
        domain: shop.url(),
        access_token: SecretString::from("shpat_test".to_string()),
        api_version: "2024-07".to_string(),
        timeout_ms: 5_000,
    };

    let erp_client = ErpClient::new(&erp_config).expect("Failed to build ERP client");
    let shop_client = StorefrontClient::new(&shop_config).expect("Failed to build shop client");
    SyncEngine::new(Arc::new(erp_client), Arc::new(shop_client))
}

async fn variant_search_mock(
    shop: &mut mockito::ServerGuard,
    sku: &str,
    product_id: Option<&str>,
) {
    let nodes = match product_id {
        Some(id) => json!([{
            "id": format!("{id}-variant"),
            "sku": sku,
            "product": {"id": id}
        }]),
        None => json!([]),
    };
    shop.mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::PartialJson(json!({
            "variables": {"query": format!("sku:{sku}")}
        })))
        .with_body(json!({"data": {"productVariants": {"nodes": nodes}}}).to_string())
        .create_async()
        .await;
}

#[tokio::test]
async fn test_products_flow_updates_existing_product() {
    let mut erp = mockito::Server::new_async().await;
    let mut shop = mockito::Server::new_async().await;

    erp.mock("POST", "/products")
        .with_body(
            json!({
                "status": "ok",
                "totalPages": 1,
                "products": [
                    {"ItemKey": "SKU-1", "ItemName": "Plate", "ForignName": "Plate", "status": true}
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    variant_search_mock(&mut shop, "SKU-1", Some("gid://shopify/Product/101")).await;
    let update = shop
        .mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::Regex("productUpdate".to_string()))
        .with_body(
            json!({
                "data": {
                    "productUpdate": {
                        "product": {"id": "gid://shopify/Product/101"},
                        "userErrors": []
                    }
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    shop.mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::Regex("productPrimaryVariant".to_string()))
        .with_body(
            json!({
                "data": {
                    "product": {
                        "variants": {"nodes": [{"id": "gid://shopify/ProductVariant/11"}]}
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    shop.mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::Regex("productVariantsBulkUpdate".to_string()))
        .with_body(
            json!({
                "data": {
                    "productVariantsBulkUpdate": {
                        "productVariants": [{"id": "gid://shopify/ProductVariant/11"}],
                        "userErrors": []
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let summary = engine(&erp, &shop).sync_products().await.unwrap();

    update.assert_async().await;
    assert_eq!(summary.flow, "Products");
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.skipped_total(), 0);
    assert!(summary.status_line().contains("Products"));
}

#[tokio::test]
async fn test_erp_envelope_failure_aborts_flow() {
    let mut erp = mockito::Server::new_async().await;
    let shop = mockito::Server::new_async().await;

    erp.mock("POST", "/products")
        .with_body(json!({"status": "error", "products": []}).to_string())
        .create_async()
        .await;

    let err = engine(&erp, &shop).sync_products().await.unwrap_err();

    assert!(err.to_string().contains("ERP error"), "was: {err}");
}

#[tokio::test]
async fn test_storefront_user_errors_fail_the_flow() {
    let mut erp = mockito::Server::new_async().await;
    let mut shop = mockito::Server::new_async().await;

    erp.mock("POST", "/products")
        .with_body(
            json!({
                "status": "ok",
                "totalPages": 1,
                "products": [
                    {"ItemKey": "SKU-2", "ItemName": "Cup", "ForignName": "Cup", "status": true}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    variant_search_mock(&mut shop, "SKU-2", None).await;
    shop.mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::Regex("productCreate".to_string()))
        .with_body(
            json!({
                "data": {
                    "productCreate": {
                        "product": null,
                        "userErrors": [{"field": ["input", "title"], "message": "Title is taken"}]
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = engine(&erp, &shop).sync_products().await.unwrap_err();

    assert!(err.to_string().contains("Title is taken"), "was: {err}");
}

#[tokio::test]
async fn test_related_products_flow_links_products() {
    let mut erp = mockito::Server::new_async().await;
    let mut shop = mockito::Server::new_async().await;

    erp.mock("POST", "/similar-products")
        .with_body(
            json!({
                "status": "ok",
                "products": [{"sku": "ABC-1", "similarSkus": ["DEF-2"]}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    shop.mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::Regex("listMetafieldDefinitions".to_string()))
        .with_body(
            json!({
                "data": {
                    "metafieldDefinitions": {
                        "nodes": [{
                            "id": "gid://shopify/MetafieldDefinition/9",
                            "name": "Related products",
                            "namespace": "custom",
                            "key": "related_products"
                        }],
                        "pageInfo": {"hasNextPage": false, "endCursor": ""}
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    variant_search_mock(&mut shop, "ABC-1", Some("gid://shopify/Product/1")).await;
    variant_search_mock(&mut shop, "DEF-2", Some("gid://shopify/Product/2")).await;
    let set = shop
        .mock("POST", GRAPHQL_PATH)
        .match_body(Matcher::PartialJson(json!({
            "variables": {
                "metafields": [{
                    "ownerId": "gid://shopify/Product/1",
                    "namespace": "custom",
                    "key": "related_products"
                }]
            }
        })))
        .with_body(json!({"data": {"metafieldsSet": {"userErrors": []}}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let summary = engine(&erp, &shop).sync_related_products().await.unwrap();

    set.assert_async().await;
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.updated, 1);
}
