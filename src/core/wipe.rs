//! Bulk storefront reset
//!
//! Deletes every product, collection, metafield definition, price list,
//! catalog and market the shop allows. The six entity steps run
//! concurrently; when several fail, the error reported is the first in
//! step order, after every step has settled.

use std::sync::Arc;

use crate::adapters::storefront::StorefrontClient;
use crate::core::pool::WorkerPool;
use crate::domain::{Result, SyncError};

/// Products are deleted with a wider pool than the sync flows use; the
/// other entity types are few enough to delete sequentially.
const WIPE_DELETE_CONCURRENCY: usize = 5;

/// Deletion counts per entity type.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WipeSummary {
    pub products: u64,
    pub collections: u64,
    pub metafield_definitions: u64,
    pub price_lists: u64,
    pub catalogs: u64,
    pub markets: u64,
}

impl WipeSummary {
    pub fn total(&self) -> u64 {
        self.products
            + self.collections
            + self.metafield_definitions
            + self.price_lists
            + self.catalogs
            + self.markets
    }
}

/// Remove all catalog data from the storefront.
///
/// Listings walk their cursor once, so entities created while the wipe is
/// running are left for a later run.
pub async fn wipe_storefront(client: Arc<StorefrontClient>) -> Result<WipeSummary> {
    tracing::warn!("Wiping all storefront catalog data");

    let (products, collections, definitions, price_lists, catalogs, markets) = tokio::join!(
        wipe_products(Arc::clone(&client)),
        wipe_collections(Arc::clone(&client)),
        wipe_metafield_definitions(Arc::clone(&client)),
        wipe_price_lists(Arc::clone(&client)),
        wipe_catalogs(Arc::clone(&client)),
        wipe_markets(Arc::clone(&client)),
    );

    let summary = WipeSummary {
        products: products?,
        collections: collections?,
        metafield_definitions: definitions?,
        price_lists: price_lists?,
        catalogs: catalogs?,
        markets: markets?,
    };
    tracing::info!(
        products = summary.products,
        collections = summary.collections,
        metafield_definitions = summary.metafield_definitions,
        price_lists = summary.price_lists,
        catalogs = summary.catalogs,
        markets = summary.markets,
        total = summary.total(),
        "Storefront wipe finished"
    );
    Ok(summary)
}

async fn wipe_products(client: Arc<StorefrontClient>) -> Result<u64> {
    let mut deleted = 0u64;
    let mut after: Option<String> = None;
    loop {
        let (ids, next) = client.list_product_ids_page(after.as_deref()).await?;
        let page_size = ids.len() as u64;
        let mut pool = WorkerPool::new(WIPE_DELETE_CONCURRENCY);
        for product_id in ids {
            let client = Arc::clone(&client);
            pool.spawn(async move { client.delete_product(&product_id).await });
        }
        pool.join().await?;
        deleted += page_size;
        match next {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }
    tracing::info!(deleted, "Deleted storefront products");
    Ok(deleted)
}

async fn wipe_collections(client: Arc<StorefrontClient>) -> Result<u64> {
    let mut deleted = 0u64;
    let mut after: Option<String> = None;
    loop {
        let (ids, next) = client.list_collection_ids_page(after.as_deref()).await?;
        for collection_id in ids {
            client.delete_collection(&collection_id).await?;
            deleted += 1;
        }
        match next {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }
    tracing::info!(deleted, "Deleted storefront collections");
    Ok(deleted)
}

async fn wipe_metafield_definitions(client: Arc<StorefrontClient>) -> Result<u64> {
    let mut deleted = 0u64;
    let mut after: Option<String> = None;
    loop {
        let (ids, next) = client
            .list_metafield_definition_ids_page(after.as_deref())
            .await?;
        for definition_id in ids {
            if let Err(err) = client.delete_metafield_definition(&definition_id).await {
                // App-reserved definitions reject deletion for the whole
                // shop, not per definition; keep what was already removed.
                if is_definition_access_denied(&err) {
                    tracing::warn!(
                        deleted,
                        error = %err,
                        "Metafield definition deletion denied, keeping the rest"
                    );
                    return Ok(deleted);
                }
                return Err(err);
            }
            deleted += 1;
        }
        match next {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }
    tracing::info!(deleted, "Deleted metafield definitions");
    Ok(deleted)
}

async fn wipe_price_lists(client: Arc<StorefrontClient>) -> Result<u64> {
    let mut deleted = 0u64;
    let mut after: Option<String> = None;
    loop {
        let (ids, next) = client.list_price_list_ids_page(after.as_deref()).await?;
        for price_list_id in ids {
            client.delete_price_list(&price_list_id).await?;
            deleted += 1;
        }
        match next {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }
    tracing::info!(deleted, "Deleted price lists");
    Ok(deleted)
}

async fn wipe_catalogs(client: Arc<StorefrontClient>) -> Result<u64> {
    let mut deleted = 0u64;
    let mut after: Option<String> = None;
    loop {
        let (ids, next) = client.list_catalog_ids_page(after.as_deref()).await?;
        for catalog_id in ids {
            match client.delete_catalog(&catalog_id).await {
                Ok(()) => deleted += 1,
                Err(err) if is_app_owned_catalog(&err) => {
                    tracing::warn!(catalog_id = %catalog_id, "Skipping app-owned catalog");
                }
                Err(err) => return Err(err),
            }
        }
        match next {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }
    tracing::info!(deleted, "Deleted catalogs");
    Ok(deleted)
}

async fn wipe_markets(client: Arc<StorefrontClient>) -> Result<u64> {
    let markets = client.list_markets().await?;
    let mut deleted = 0u64;
    for market in markets {
        match client.delete_market(&market.id).await {
            Ok(()) => deleted += 1,
            Err(err) if is_last_region_market(&err) => {
                tracing::warn!(
                    market_id = %market.id,
                    name = %market.name,
                    "Skipping market holding the shop's last region"
                );
            }
            Err(err) => return Err(err),
        }
    }
    tracing::info!(deleted, "Deleted markets");
    Ok(deleted)
}

fn is_definition_access_denied(err: &SyncError) -> bool {
    err.to_string()
        .contains("Access denied for metafieldDefinitionDelete field")
}

fn is_app_owned_catalog(err: &SyncError) -> bool {
    err.to_string().contains("Cannot delete a catalog for an app")
}

fn is_last_region_market(err: &SyncError) -> bool {
    err.to_string().contains("last region")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storefront::testing::{client_for, GRAPHQL_PATH};
    use mockito::Matcher;
    use serde_json::json;

    async fn mock_empty_listings(server: &mut mockito::ServerGuard, except: &[&str]) {
        let pages = [
            ("listProducts", "products"),
            ("listCollections", "collections"),
            ("listPriceLists", "priceLists"),
            ("listCatalogs", "catalogs"),
            ("listMetafieldDefinitions", "metafieldDefinitions"),
            ("listMarkets", "markets"),
        ];
        for (operation, field) in pages {
            if except.contains(&operation) {
                continue;
            }
            server
                .mock("POST", GRAPHQL_PATH)
                .match_body(Matcher::Regex(operation.to_string()))
                .with_body(
                    json!({
                        "data": {
                            field: {
                                "nodes": [],
                                "pageInfo": {"hasNextPage": false, "endCursor": ""}
                            }
                        }
                    })
                    .to_string(),
                )
                .create_async()
                .await;
        }
    }

    fn single_page(field: &str, nodes: serde_json::Value) -> String {
        json!({
            "data": {
                field: {
                    "nodes": nodes,
                    "pageInfo": {"hasNextPage": false, "endCursor": ""}
                }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_wipe_deletes_every_entity_type() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listProducts".to_string()))
            .with_body(single_page(
                "products",
                json!([{"id": "gid://shopify/Product/1"}, {"id": "gid://shopify/Product/2"}]),
            ))
            .create_async()
            .await;
        let product_deletes = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("productDelete".to_string()))
            .with_body(
                json!({"data": {"productDelete": {"deletedProductId": "x", "userErrors": []}}})
                    .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listCollections".to_string()))
            .with_body(single_page(
                "collections",
                json!([{"id": "gid://shopify/Collection/50", "title": "Kitchen"}]),
            ))
            .create_async()
            .await;
        let collection_delete = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("collectionDelete".to_string()))
            .with_body(json!({"data": {"collectionDelete": {"userErrors": []}}}).to_string())
            .expect(1)
            .create_async()
            .await;

        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listMetafieldDefinitions".to_string()))
            .with_body(single_page(
                "metafieldDefinitions",
                json!([{
                    "id": "gid://shopify/MetafieldDefinition/1",
                    "name": "Filter",
                    "namespace": "attributes",
                    "key": "filter"
                }]),
            ))
            .create_async()
            .await;
        let definition_delete = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("metafieldDefinitionDelete".to_string()))
            .with_body(
                json!({
                    "data": {
                        "metafieldDefinitionDelete": {"deletedDefinitionId": "x", "userErrors": []}
                    }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listPriceLists".to_string()))
            .with_body(single_page(
                "priceLists",
                json!([{"id": "gid://shopify/PriceList/6", "name": "Israel ILS", "currency": "ILS"}]),
            ))
            .create_async()
            .await;
        let price_list_delete = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("priceListDelete".to_string()))
            .with_body(json!({"data": {"priceListDelete": {"deletedId": "x", "userErrors": []}}}).to_string())
            .expect(1)
            .create_async()
            .await;

        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listCatalogs".to_string()))
            .with_body(single_page(
                "catalogs",
                json!([{"id": "gid://shopify/Catalog/3", "title": "Israel Catalog", "status": "ACTIVE"}]),
            ))
            .create_async()
            .await;
        let catalog_delete = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("catalogDelete".to_string()))
            .with_body(json!({"data": {"catalogDelete": {"deletedId": "x", "userErrors": []}}}).to_string())
            .expect(1)
            .create_async()
            .await;

        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listMarkets".to_string()))
            .with_body(single_page(
                "markets",
                json!([
                    {"id": "gid://shopify/Market/1", "name": "Primary"},
                    {"id": "gid://shopify/Market/7", "name": "Israel"}
                ]),
            ))
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {"id": "gid://shopify/Market/1"}
            })))
            .with_body(
                json!({
                    "data": {
                        "marketDelete": {
                            "deletedId": null,
                            "userErrors": [{"field": ["id"], "message": "cannot remove the last region"}]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {"id": "gid://shopify/Market/7"}
            })))
            .with_body(
                json!({"data": {"marketDelete": {"deletedId": "gid://shopify/Market/7", "userErrors": []}}})
                    .to_string(),
            )
            .create_async()
            .await;

        let summary = wipe_storefront(Arc::new(client_for(&server))).await.unwrap();

        product_deletes.assert_async().await;
        collection_delete.assert_async().await;
        definition_delete.assert_async().await;
        price_list_delete.assert_async().await;
        catalog_delete.assert_async().await;
        assert_eq!(
            summary,
            WipeSummary {
                products: 2,
                collections: 1,
                metafield_definitions: 1,
                price_lists: 1,
                catalogs: 1,
                markets: 1,
            }
        );
        assert_eq!(summary.total(), 7);
    }

    #[tokio::test]
    async fn test_wipe_walks_product_pages() {
        let mut server = mockito::Server::new_async().await;
        mock_empty_listings(&mut server, &["listProducts"]).await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("listProducts".to_string()),
                Matcher::PartialJson(json!({"variables": {"after": null}})),
            ]))
            .with_body(
                json!({
                    "data": {
                        "products": {
                            "nodes": [{"id": "gid://shopify/Product/1"}],
                            "pageInfo": {"hasNextPage": true, "endCursor": "c1"}
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("listProducts".to_string()),
                Matcher::PartialJson(json!({"variables": {"after": "c1"}})),
            ]))
            .with_body(single_page("products", json!([{"id": "gid://shopify/Product/2"}])))
            .create_async()
            .await;
        let deletes = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("productDelete".to_string()))
            .with_body(
                json!({"data": {"productDelete": {"deletedProductId": "x", "userErrors": []}}})
                    .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let summary = wipe_storefront(Arc::new(client_for(&server))).await.unwrap();

        deletes.assert_async().await;
        assert_eq!(summary.products, 2);
    }

    #[tokio::test]
    async fn test_wipe_reports_the_earliest_step_error() {
        let mut server = mockito::Server::new_async().await;
        mock_empty_listings(&mut server, &["listProducts", "listCatalogs"]).await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listProducts".to_string()))
            .with_body(single_page("products", json!([{"id": "gid://shopify/Product/1"}])))
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("productDelete".to_string()))
            .with_body(
                json!({
                    "data": {
                        "productDelete": {
                            "deletedProductId": null,
                            "userErrors": [{"field": ["input"], "message": "product is locked"}]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listCatalogs".to_string()))
            .with_body(single_page(
                "catalogs",
                json!([{"id": "gid://shopify/Catalog/3", "title": "Israel Catalog", "status": "ACTIVE"}]),
            ))
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("catalogDelete".to_string()))
            .with_body(
                json!({
                    "data": {
                        "catalogDelete": {
                            "deletedId": null,
                            "userErrors": [{"field": ["id"], "message": "catalog is busy"}]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = wipe_storefront(Arc::new(client_for(&server)))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("product is locked"));
    }

    #[tokio::test]
    async fn test_wipe_definition_access_denied_keeps_partial_count() {
        let mut server = mockito::Server::new_async().await;
        mock_empty_listings(&mut server, &["listMetafieldDefinitions"]).await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listMetafieldDefinitions".to_string()))
            .with_body(single_page(
                "metafieldDefinitions",
                json!([
                    {"id": "gid://shopify/MetafieldDefinition/1", "name": "Filter", "namespace": "attributes", "key": "filter"},
                    {"id": "gid://shopify/MetafieldDefinition/2", "name": "Size", "namespace": "attributes", "key": "size"}
                ]),
            ))
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {"id": "gid://shopify/MetafieldDefinition/1"}
            })))
            .with_body(
                json!({
                    "data": {
                        "metafieldDefinitionDelete": {"deletedDefinitionId": "x", "userErrors": []}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {"id": "gid://shopify/MetafieldDefinition/2"}
            })))
            .with_body(
                json!({
                    "data": {
                        "metafieldDefinitionDelete": {
                            "deletedDefinitionId": null,
                            "userErrors": [{
                                "field": ["id"],
                                "message": "Access denied for metafieldDefinitionDelete field"
                            }]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let summary = wipe_storefront(Arc::new(client_for(&server))).await.unwrap();

        assert_eq!(summary.metafield_definitions, 1);
    }

    #[tokio::test]
    async fn test_wipe_skips_app_owned_catalogs() {
        let mut server = mockito::Server::new_async().await;
        mock_empty_listings(&mut server, &["listCatalogs"]).await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("listCatalogs".to_string()))
            .with_body(single_page(
                "catalogs",
                json!([
                    {"id": "gid://shopify/Catalog/3", "title": "Israel Catalog", "status": "ACTIVE"},
                    {"id": "gid://shopify/Catalog/9", "title": "App Catalog", "status": "ACTIVE"}
                ]),
            ))
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {"id": "gid://shopify/Catalog/3"}
            })))
            .with_body(
                json!({"data": {"catalogDelete": {"deletedId": "gid://shopify/Catalog/3", "userErrors": []}}})
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {"id": "gid://shopify/Catalog/9"}
            })))
            .with_body(
                json!({
                    "data": {
                        "catalogDelete": {
                            "deletedId": null,
                            "userErrors": [{"field": ["id"], "message": "Cannot delete a catalog for an app"}]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let summary = wipe_storefront(Arc::new(client_for(&server))).await.unwrap();

        assert_eq!(summary.catalogs, 1);
    }
}
