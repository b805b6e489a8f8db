//! Related-products links
//!
//! Cross-sell links live in one `list.product_reference` metafield per
//! product under the `custom` namespace. The value is always rewritten in
//! full, so dropped links disappear on the next sync.

use super::client::StorefrontClient;
use super::types::check_user_errors;
use crate::domain::{Result, SyncError, UserError};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

const RELATED_NAMESPACE: &str = "custom";
const RELATED_KEY: &str = "related_products";
const RELATED_NAME: &str = "Related products";
const RELATED_TYPE: &str = "list.product_reference";

#[derive(Deserialize)]
struct RelatedSetData {
    #[serde(rename = "metafieldsSet")]
    metafields_set: RelatedSetPayload,
}

#[derive(Deserialize)]
struct RelatedSetPayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

impl StorefrontClient {
    /// Make sure the related-products definition exists. Keys compare
    /// case-insensitively, matching how the storefront stores them.
    pub async fn ensure_related_products_definition(&self) -> Result<()> {
        let existing = self
            .list_metafield_definitions(Some(RELATED_NAMESPACE))
            .await?;
        if existing
            .iter()
            .any(|node| node.key.eq_ignore_ascii_case(RELATED_KEY))
        {
            return Ok(());
        }

        self.create_product_metafield_definition(
            RELATED_NAMESPACE,
            RELATED_KEY,
            RELATED_NAME,
            RELATED_TYPE,
        )
        .await?;
        tracing::info!(
            namespace = RELATED_NAMESPACE,
            key = RELATED_KEY,
            "Created related products metafield definition"
        );
        Ok(())
    }

    /// Replace a product's related-products references. Unknown related
    /// SKUs are logged and dropped; an empty remainder still writes `[]` so
    /// stale links clear. Returns false when the owner SKU has no
    /// storefront product and nothing was written.
    pub async fn upsert_related_products(
        &self,
        sku: &str,
        related_skus: &[String],
    ) -> Result<bool> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(SyncError::Validation("sku is required".to_string()));
        }

        let Some(owner_id) = self.find_product_by_sku(sku).await? else {
            tracing::warn!(sku, "Product not found on storefront, skipping related products");
            return Ok(false);
        };

        let mut seen = HashSet::new();
        let mut related_ids: Vec<String> = Vec::new();
        for related in related_skus {
            let related = related.trim();
            if related.is_empty() || related.eq_ignore_ascii_case(sku) {
                continue;
            }
            if !seen.insert(related.to_lowercase()) {
                continue;
            }
            match self.find_product_by_sku(related).await? {
                Some(id) => related_ids.push(id),
                None => {
                    tracing::warn!(
                        sku,
                        related_sku = related,
                        "Related product not found on storefront, skipping"
                    );
                }
            }
        }

        let value = serde_json::to_string(&related_ids)?;
        let query = r#"
            mutation metafieldsSet($metafields: [MetafieldsSetInput!]!) {
                metafieldsSet(metafields: $metafields) {
                    userErrors { field message }
                }
            }
        "#;
        let data: RelatedSetData = self
            .transport
            .execute(
                query,
                json!({
                    "metafields": [{
                        "ownerId": owner_id,
                        "namespace": RELATED_NAMESPACE,
                        "key": RELATED_KEY,
                        "type": RELATED_TYPE,
                        "value": value,
                    }]
                }),
            )
            .await?;
        check_user_errors("metafieldsSet", data.metafields_set.user_errors)?;
        Ok(true)
    }
}
