//! Collection operations

use super::client::StorefrontClient;
use super::types::{
    build_search_query, check_user_errors, CollectionMove, CollectionNode, PageInfo,
    WIPE_PAGE_SIZE,
};
use crate::domain::{Result, StorefrontError, SyncError, UserError};
use serde::Deserialize;
use serde_json::json;

/// Position moves accepted by a single reorder mutation.
const MAX_REORDER_MOVES: usize = 250;

#[derive(Deserialize)]
struct CollectionsSearchData {
    collections: CollectionConnection,
}

#[derive(Default, Deserialize)]
struct CollectionConnection {
    #[serde(default)]
    nodes: Vec<CollectionNode>,
}

#[derive(Deserialize)]
struct CollectionMutationPayload {
    #[serde(default)]
    collection: Option<CollectionNode>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct CollectionCreateData {
    #[serde(rename = "collectionCreate")]
    collection_create: CollectionMutationPayload,
}

#[derive(Deserialize)]
struct CollectionUpdateData {
    #[serde(rename = "collectionUpdate")]
    collection_update: CollectionMutationPayload,
}

#[derive(Deserialize)]
struct UserErrorsPayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct CollectionAddProductsData {
    #[serde(rename = "collectionAddProducts")]
    add_products: UserErrorsPayload,
}

#[derive(Deserialize)]
struct CollectionReorderData {
    #[serde(rename = "collectionReorderProducts")]
    reorder: UserErrorsPayload,
}

#[derive(Deserialize)]
struct CollectionsPageData {
    collections: CollectionsPage,
}

#[derive(Default, Deserialize)]
struct CollectionsPage {
    #[serde(default)]
    nodes: Vec<CollectionNode>,
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct CollectionDeleteData {
    #[serde(rename = "collectionDelete")]
    collection_delete: UserErrorsPayload,
}

impl StorefrontClient {
    /// First collection whose title matches, if any.
    pub async fn find_collection_by_title(&self, title: &str) -> Result<Option<CollectionNode>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SyncError::Validation("collection title is required".to_string()));
        }

        let query = r#"
            query collectionsByTitle($first: Int!, $query: String!) {
                collections(first: $first, query: $query) {
                    nodes {
                        id
                        title
                    }
                }
            }
        "#;
        let data: CollectionsSearchData = self
            .transport
            .execute(
                query,
                json!({
                    "first": 1,
                    "query": build_search_query("title", title),
                }),
            )
            .await?;

        Ok(data
            .collections
            .nodes
            .into_iter()
            .next()
            .filter(|node| !node.id.trim().is_empty()))
    }

    /// Create a collection and return its id.
    pub async fn create_collection(&self, title: &str) -> Result<String> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SyncError::Validation("collection title is required".to_string()));
        }

        let query = r#"
            mutation collectionCreate($input: CollectionInput!) {
                collectionCreate(input: $input) {
                    collection {
                        id
                        title
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: CollectionCreateData = self
            .transport
            .execute(query, json!({ "input": { "title": title } }))
            .await?;
        check_user_errors("collectionCreate", data.collection_create.user_errors)?;

        let collection_id = data
            .collection_create
            .collection
            .unwrap_or_default()
            .id
            .trim()
            .to_string();
        if collection_id.is_empty() {
            return Err(StorefrontError::InvalidResponse(
                "collection create returned empty collection id".to_string(),
            )
            .into());
        }
        Ok(collection_id)
    }

    pub async fn rename_collection(&self, collection_id: &str, title: &str) -> Result<()> {
        let query = r#"
            mutation collectionUpdate($input: CollectionInput!) {
                collectionUpdate(input: $input) {
                    collection {
                        id
                        title
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: CollectionUpdateData = self
            .transport
            .execute(
                query,
                json!({ "input": { "id": collection_id, "title": title.trim() } }),
            )
            .await?;
        check_user_errors("collectionUpdate", data.collection_update.user_errors)
    }

    /// Switch a collection to manual sorting so reorder moves stick.
    pub async fn set_collection_manual_order(&self, collection_id: &str) -> Result<()> {
        let query = r#"
            mutation collectionUpdate($input: CollectionInput!) {
                collectionUpdate(input: $input) {
                    userErrors { field message }
                }
            }
        "#;
        let data: CollectionUpdateData = self
            .transport
            .execute(
                query,
                json!({ "input": { "id": collection_id, "sortOrder": "MANUAL" } }),
            )
            .await?;
        check_user_errors("collectionUpdate", data.collection_update.user_errors)
    }

    pub async fn add_product_to_collection(
        &self,
        collection_id: &str,
        product_id: &str,
    ) -> Result<()> {
        let query = r#"
            mutation collectionAddProducts($id: ID!, $productIds: [ID!]!) {
                collectionAddProducts(id: $id, productIds: $productIds) {
                    userErrors { field message }
                }
            }
        "#;
        let data: CollectionAddProductsData = self
            .transport
            .execute(
                query,
                json!({ "id": collection_id, "productIds": [product_id] }),
            )
            .await?;
        check_user_errors("collectionAddProducts", data.add_products.user_errors)
    }

    /// Apply manual position moves, batched to the mutation's ceiling. The
    /// API takes positions as stringified integers.
    pub async fn reorder_collection_products(
        &self,
        collection_id: &str,
        moves: &[CollectionMove],
    ) -> Result<()> {
        if moves.is_empty() {
            return Ok(());
        }

        let query = r#"
            mutation collectionReorderProducts($id: ID!, $moves: [MoveInput!]!) {
                collectionReorderProducts(id: $id, moves: $moves) {
                    userErrors { field message }
                }
            }
        "#;
        for batch in moves.chunks(MAX_REORDER_MOVES) {
            let wire_moves: Vec<serde_json::Value> = batch
                .iter()
                .map(|entry| {
                    json!({
                        "id": entry.product_id,
                        "newPosition": entry.position.to_string(),
                    })
                })
                .collect();
            let data: CollectionReorderData = self
                .transport
                .execute(query, json!({ "id": collection_id, "moves": wire_moves }))
                .await?;
            check_user_errors("collectionReorderProducts", data.reorder.user_errors)?;
        }
        Ok(())
    }

    /// One page of collection ids, for destructive cleanup.
    pub async fn list_collection_ids_page(
        &self,
        after: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let query = r#"
            query listCollections($first: Int!, $after: String) {
                collections(first: $first, after: $after) {
                    nodes { id }
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                }
            }
        "#;
        let data: CollectionsPageData = self
            .transport
            .execute(query, json!({ "first": WIPE_PAGE_SIZE, "after": after }))
            .await?;

        let ids = data
            .collections
            .nodes
            .into_iter()
            .map(|node| node.id)
            .collect();
        Ok((ids, data.collections.page_info.next_cursor()))
    }

    pub async fn delete_collection(&self, collection_id: &str) -> Result<()> {
        let query = r#"
            mutation collectionDelete($input: CollectionDeleteInput!) {
                collectionDelete(input: $input) {
                    deletedCollectionId
                    userErrors { field message }
                }
            }
        "#;
        let data: CollectionDeleteData = self
            .transport
            .execute(query, json!({ "input": { "id": collection_id } }))
            .await?;
        check_user_errors("collectionDelete", data.collection_delete.user_errors)
    }
}
