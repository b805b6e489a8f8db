//! Inventory operations
//!
//! Stock writes land on a single location: the first active one on the
//! shop (or the first at all), resolved once and cached on the client.
//! Items are switched to tracked and activated at that location before
//! quantities are set.

use super::client::StorefrontClient;
use super::types::{
    build_search_query, check_user_errors, InventoryItemNode, InventoryItemRef,
    InventoryVariantNode, LocationNode, OnHandQuantity,
};
use crate::domain::{Result, StorefrontError, UserError};
use serde::Deserialize;
use serde_json::json;

const LOCATIONS_PAGE_SIZE: u32 = 50;
const STOCK_BATCH_SIZE: usize = 100;
const STOCK_CORRECTION_REASON: &str = "correction";

#[derive(Deserialize)]
struct LocationsData {
    locations: LocationsConnection,
}

#[derive(Default, Deserialize)]
struct LocationsConnection {
    #[serde(default)]
    nodes: Vec<LocationNode>,
}

#[derive(Deserialize)]
struct VariantInventoryData {
    #[serde(rename = "productVariants")]
    product_variants: VariantInventoryConnection,
}

#[derive(Default, Deserialize)]
struct VariantInventoryConnection {
    #[serde(default)]
    nodes: Vec<InventoryVariantNode>,
}

#[derive(Deserialize)]
struct InventoryItemUpdateData {
    #[serde(rename = "inventoryItemUpdate")]
    item_update: InventoryItemUpdatePayload,
}

#[derive(Deserialize)]
struct InventoryItemUpdatePayload {
    #[serde(default, rename = "inventoryItem")]
    #[allow(dead_code)]
    inventory_item: Option<InventoryItemNode>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct InventoryActivateData {
    #[serde(rename = "inventoryActivate")]
    activate: UserErrorsPayload,
}

#[derive(Deserialize)]
struct SetOnHandData {
    #[serde(rename = "inventorySetOnHandQuantities")]
    set_on_hand: UserErrorsPayload,
}

#[derive(Deserialize)]
struct UserErrorsPayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

impl StorefrontClient {
    /// Location all stock writes target. Resolved on first use and cached
    /// for the lifetime of the client.
    pub async fn primary_location_id(&self) -> Result<String> {
        let id = self
            .primary_location
            .get_or_try_init(|| self.lookup_primary_location())
            .await?;
        Ok(id.clone())
    }

    async fn lookup_primary_location(&self) -> Result<String> {
        let query = r#"
            query listLocations($first: Int!) {
                locations(first: $first) {
                    nodes {
                        id
                        name
                        isActive
                    }
                }
            }
        "#;
        let data: LocationsData = self
            .transport
            .execute(query, json!({ "first": LOCATIONS_PAGE_SIZE }))
            .await?;

        let nodes = data.locations.nodes;
        let location = nodes
            .iter()
            .find(|node| node.is_active)
            .or_else(|| nodes.first());
        match location {
            Some(node) if !node.id.trim().is_empty() => {
                tracing::info!(
                    location_id = %node.id,
                    name = %node.name,
                    "Using storefront location for stock writes"
                );
                Ok(node.id.clone())
            }
            _ => Err(StorefrontError::InvalidResponse(
                "no locations found on storefront".to_string(),
            )
            .into()),
        }
    }

    /// Variant and inventory item for a SKU. A variant without an
    /// inventory item is malformed and rejected.
    pub async fn find_inventory_item_by_sku(&self, sku: &str) -> Result<Option<InventoryItemRef>> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Ok(None);
        }
        let query = r#"
            query variantInventoryBySku($first: Int!, $query: String!) {
                productVariants(first: $first, query: $query) {
                    nodes {
                        id
                        sku
                        inventoryItem {
                            id
                            tracked
                        }
                    }
                }
            }
        "#;
        let data: VariantInventoryData = self
            .transport
            .execute(
                query,
                json!({ "first": 1, "query": build_search_query("sku", sku) }),
            )
            .await?;

        let variant = data
            .product_variants
            .nodes
            .into_iter()
            .find(|node| !node.id.trim().is_empty());
        let Some(variant) = variant else {
            return Ok(None);
        };
        let Some(item) = variant.inventory_item else {
            return Err(StorefrontError::InvalidResponse(format!(
                "variant {} has no inventory item",
                variant.id
            ))
            .into());
        };
        Ok(Some(InventoryItemRef {
            variant_id: variant.id,
            inventory_item_id: item.id,
            tracked: item.tracked,
        }))
    }

    /// Turn on quantity tracking for an item. Already-tracked items are
    /// left alone.
    pub async fn enable_inventory_tracking(&self, item: &InventoryItemRef) -> Result<()> {
        if item.tracked {
            return Ok(());
        }
        let query = r#"
            mutation inventoryItemUpdate($id: ID!, $input: InventoryItemInput!) {
                inventoryItemUpdate(id: $id, input: $input) {
                    inventoryItem {
                        id
                        tracked
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: InventoryItemUpdateData = self
            .transport
            .execute(
                query,
                json!({ "id": item.inventory_item_id, "input": { "tracked": true } }),
            )
            .await?;
        check_user_errors("inventoryItemUpdate", data.item_update.user_errors)
    }

    /// Stock the item at a location so quantities can be written there.
    pub async fn activate_inventory_at_location(
        &self,
        inventory_item_id: &str,
        location_id: &str,
    ) -> Result<()> {
        let query = r#"
            mutation inventoryActivate($inventoryItemId: ID!, $locationId: ID!) {
                inventoryActivate(inventoryItemId: $inventoryItemId, locationId: $locationId) {
                    inventoryLevel { id }
                    userErrors { field message }
                }
            }
        "#;
        let data: InventoryActivateData = self
            .transport
            .execute(
                query,
                json!({ "inventoryItemId": inventory_item_id, "locationId": location_id }),
            )
            .await?;
        check_user_errors("inventoryActivate", data.activate.user_errors)
    }

    /// Set absolute on-hand quantities at a location.
    pub async fn set_on_hand_quantities(
        &self,
        location_id: &str,
        quantities: &[OnHandQuantity],
    ) -> Result<()> {
        if quantities.is_empty() {
            return Ok(());
        }
        let query = r#"
            mutation inventorySetOnHandQuantities($input: InventorySetOnHandQuantitiesInput!) {
                inventorySetOnHandQuantities(input: $input) {
                    userErrors { field message }
                }
            }
        "#;

        for chunk in quantities.chunks(STOCK_BATCH_SIZE) {
            let set_quantities: Vec<serde_json::Value> = chunk
                .iter()
                .map(|entry| {
                    json!({
                        "inventoryItemId": entry.inventory_item_id,
                        "locationId": location_id,
                        "quantity": entry.quantity,
                    })
                })
                .collect();
            let data: SetOnHandData = self
                .transport
                .execute(
                    query,
                    json!({
                        "input": {
                            "reason": STOCK_CORRECTION_REASON,
                            "setQuantities": set_quantities,
                        }
                    }),
                )
                .await?;
            check_user_errors("inventorySetOnHandQuantities", data.set_on_hand.user_errors)?;
            tracing::debug!(location_id, count = chunk.len(), "Set on-hand quantities");
        }
        Ok(())
    }
}
