//! Product metafield operations
//!
//! Attribute values land as `single_line_text_field` metafields with the
//! English value as the primary content and Hebrew registered as a
//! translation. Definitions are ensured per namespace before values are
//! written so the fields show up in the admin with readable names.

use super::client::StorefrontClient;
use super::translations::should_update_translation;
use super::types::{
    check_user_errors, MetafieldDefinitionNode, MetafieldNode, PageInfo, ProductMetafieldInput,
    ProductMetafieldDefinitionInput,
};
use crate::domain::{Result, SyncError, UserError};
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

pub(crate) const METAFIELD_TYPE_TEXT: &str = "single_line_text_field";
const METAFIELD_OWNER_PRODUCT: &str = "PRODUCT";
const DEFINITION_PAGE_SIZE: u32 = 100;

/// Writes accepted by a single `metafieldsSet` call.
const METAFIELDS_SET_BATCH_SIZE: usize = 25;

struct CleanField {
    namespace: String,
    key: String,
    english: String,
    hebrew: String,
}

#[derive(Deserialize)]
struct MetafieldsSetData {
    #[serde(rename = "metafieldsSet")]
    metafields_set: MetafieldsSetPayload,
}

#[derive(Deserialize)]
struct MetafieldsSetPayload {
    #[serde(default)]
    metafields: Vec<MetafieldNode>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct DefinitionsPageData {
    #[serde(rename = "metafieldDefinitions")]
    metafield_definitions: DefinitionsPage,
}

#[derive(Default, Deserialize)]
struct DefinitionsPage {
    #[serde(default)]
    nodes: Vec<MetafieldDefinitionNode>,
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct DefinitionCreateData {
    #[serde(rename = "metafieldDefinitionCreate")]
    definition_create: DefinitionCreatePayload,
}

#[derive(Deserialize)]
struct DefinitionCreatePayload {
    #[serde(default, rename = "createdDefinition")]
    created_definition: Option<MetafieldDefinitionNode>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct DefinitionDeleteData {
    #[serde(rename = "metafieldDefinitionDelete")]
    definition_delete: DefinitionDeletePayload,
}

#[derive(Deserialize)]
struct DefinitionDeletePayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

impl StorefrontClient {
    /// Write attribute metafields for one SKU, batched, with Hebrew value
    /// translations registered after each batch. A SKU without a storefront
    /// product is logged and skipped.
    pub async fn upsert_product_metafields(
        &self,
        sku: &str,
        fields: &[ProductMetafieldInput],
    ) -> Result<()> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(SyncError::Validation("sku is required".to_string()));
        }
        if fields.is_empty() {
            return Ok(());
        }

        let Some(product_id) = self.find_product_by_sku(sku).await? else {
            tracing::warn!(sku, "Product not found on storefront, skipping metafields");
            return Ok(());
        };

        let clean: Vec<CleanField> = fields.iter().filter_map(sanitize_field).collect();
        if clean.is_empty() {
            return Ok(());
        }

        let query = r#"
            mutation metafieldsSet($metafields: [MetafieldsSetInput!]!) {
                metafieldsSet(metafields: $metafields) {
                    metafields {
                        id
                        namespace
                        key
                        value
                        type
                    }
                    userErrors { field message }
                }
            }
        "#;
        for batch in clean.chunks(METAFIELDS_SET_BATCH_SIZE) {
            let metafields: Vec<serde_json::Value> = batch
                .iter()
                .map(|field| {
                    json!({
                        "ownerId": product_id,
                        "namespace": field.namespace,
                        "key": field.key,
                        "type": METAFIELD_TYPE_TEXT,
                        "value": field.english,
                    })
                })
                .collect();
            let data: MetafieldsSetData = self
                .transport
                .execute(query, json!({ "metafields": metafields }))
                .await?;
            check_user_errors("metafieldsSet", data.metafields_set.user_errors)?;

            let returned: HashMap<String, String> = data
                .metafields_set
                .metafields
                .into_iter()
                .map(|node| (metafield_key(&node.namespace, &node.key), node.id))
                .collect();
            for field in batch {
                if !should_update_translation(&field.english, &field.hebrew) {
                    continue;
                }
                let Some(metafield_id) = returned.get(&metafield_key(&field.namespace, &field.key))
                else {
                    continue;
                };
                if let Err(err) = self
                    .update_hebrew_translation(metafield_id, "value", &field.hebrew)
                    .await
                {
                    tracing::warn!(
                        sku,
                        namespace = %field.namespace,
                        key = %field.key,
                        error = %err,
                        "Metafield value translation failed"
                    );
                }
            }
        }
        Ok(())
    }

    /// Make sure every attribute definition exists, creating the missing
    /// ones and keeping Hebrew display names translated.
    pub async fn ensure_product_metafield_definitions(
        &self,
        definitions: &[ProductMetafieldDefinitionInput],
    ) -> Result<()> {
        // First definition per (namespace, key) wins; keys compare
        // case-insensitively like the storefront treats them.
        let mut by_namespace: BTreeMap<String, BTreeMap<String, CleanDefinition>> = BTreeMap::new();
        for def in definitions {
            let Some(clean) = sanitize_definition(def) else {
                continue;
            };
            by_namespace
                .entry(clean.namespace.clone())
                .or_default()
                .entry(clean.key.to_lowercase())
                .or_insert(clean);
        }

        for (namespace, group) in by_namespace {
            let existing = self.list_metafield_definitions(Some(&namespace)).await?;
            tracing::info!(
                namespace = %namespace,
                existing = existing.len(),
                incoming = group.len(),
                "Ensuring metafield definitions"
            );
            let existing_by_key: HashMap<String, MetafieldDefinitionNode> = existing
                .into_iter()
                .map(|node| (node.key.to_lowercase(), node))
                .collect();

            let mut created = 0usize;
            for (key_lower, def) in group {
                match existing_by_key.get(&key_lower) {
                    Some(node) => {
                        self.translate_definition_name(node, &def).await;
                    }
                    None => {
                        let created_node = self
                            .create_product_metafield_definition(
                                &def.namespace,
                                &def.key,
                                &def.name,
                                METAFIELD_TYPE_TEXT,
                            )
                            .await?;
                        created += 1;
                        if let Some(node) = created_node {
                            self.translate_definition_name(&node, &def).await;
                        }
                    }
                }
            }
            tracing::info!(namespace = %namespace, created, "Metafield definitions ensured");
        }
        Ok(())
    }

    /// All product metafield definitions, optionally narrowed to one
    /// namespace.
    pub(crate) async fn list_metafield_definitions(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<MetafieldDefinitionNode>> {
        let mut nodes = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let (page, next) = self
                .metafield_definitions_page(namespace, after.as_deref())
                .await?;
            nodes.extend(page);
            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }
        Ok(nodes)
    }

    pub(crate) async fn create_product_metafield_definition(
        &self,
        namespace: &str,
        key: &str,
        name: &str,
        value_type: &str,
    ) -> Result<Option<MetafieldDefinitionNode>> {
        let query = r#"
            mutation metafieldDefinitionCreate($definition: MetafieldDefinitionInput!) {
                metafieldDefinitionCreate(definition: $definition) {
                    createdDefinition {
                        id
                        name
                        namespace
                        key
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: DefinitionCreateData = self
            .transport
            .execute(
                query,
                json!({
                    "definition": {
                        "name": name,
                        "namespace": namespace,
                        "key": key,
                        "type": value_type,
                        "ownerType": METAFIELD_OWNER_PRODUCT,
                    }
                }),
            )
            .await?;
        check_user_errors("metafieldDefinitionCreate", data.definition_create.user_errors)?;
        Ok(data.definition_create.created_definition)
    }

    /// One page of definition ids, for destructive cleanup.
    pub async fn list_metafield_definition_ids_page(
        &self,
        after: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let (nodes, next) = self.metafield_definitions_page(None, after).await?;
        Ok((nodes.into_iter().map(|node| node.id).collect(), next))
    }

    /// Delete a definition together with every metafield written under it.
    pub async fn delete_metafield_definition(&self, definition_id: &str) -> Result<()> {
        let query = r#"
            mutation metafieldDefinitionDelete($id: ID!, $deleteAllAssociatedMetafields: Boolean!) {
                metafieldDefinitionDelete(id: $id, deleteAllAssociatedMetafields: $deleteAllAssociatedMetafields) {
                    deletedDefinitionId
                    userErrors { field message }
                }
            }
        "#;
        let data: DefinitionDeleteData = self
            .transport
            .execute(
                query,
                json!({ "id": definition_id, "deleteAllAssociatedMetafields": true }),
            )
            .await?;
        check_user_errors("metafieldDefinitionDelete", data.definition_delete.user_errors)
    }

    async fn metafield_definitions_page(
        &self,
        namespace: Option<&str>,
        after: Option<&str>,
    ) -> Result<(Vec<MetafieldDefinitionNode>, Option<String>)> {
        let query = r#"
            query listMetafieldDefinitions($first: Int!, $after: String, $ownerType: MetafieldOwnerType!, $namespace: String) {
                metafieldDefinitions(first: $first, after: $after, ownerType: $ownerType, namespace: $namespace) {
                    nodes {
                        id
                        name
                        namespace
                        key
                    }
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                }
            }
        "#;
        let data: DefinitionsPageData = self
            .transport
            .execute(
                query,
                json!({
                    "first": DEFINITION_PAGE_SIZE,
                    "after": after,
                    "ownerType": METAFIELD_OWNER_PRODUCT,
                    "namespace": namespace,
                }),
            )
            .await?;

        let next = data.metafield_definitions.page_info.next_cursor();
        Ok((data.metafield_definitions.nodes, next))
    }

    async fn translate_definition_name(
        &self,
        node: &MetafieldDefinitionNode,
        def: &CleanDefinition,
    ) {
        if !should_update_translation(&def.name, &def.hebrew_name) {
            return;
        }
        if let Err(err) = self
            .update_hebrew_translation(&node.id, "name", &def.hebrew_name)
            .await
        {
            tracing::warn!(
                namespace = %def.namespace,
                key = %def.key,
                error = %err,
                "Metafield definition name translation failed"
            );
        }
    }
}

struct CleanDefinition {
    namespace: String,
    key: String,
    name: String,
    hebrew_name: String,
}

fn sanitize_field(field: &ProductMetafieldInput) -> Option<CleanField> {
    let namespace = field.namespace.trim();
    let key = field.key.trim();
    let hebrew = field.value_hebrew.trim();
    let mut english = field.value_english.trim();
    if english.is_empty() {
        english = hebrew;
    }
    if namespace.is_empty() || key.is_empty() || english.is_empty() {
        return None;
    }
    Some(CleanField {
        namespace: namespace.to_string(),
        key: key.to_string(),
        english: english.to_string(),
        hebrew: hebrew.to_string(),
    })
}

fn sanitize_definition(def: &ProductMetafieldDefinitionInput) -> Option<CleanDefinition> {
    let namespace = def.namespace.trim();
    let key = def.key.trim();
    let hebrew_name = def.name_hebrew.trim();
    let mut name = def.name_english.trim();
    if name.is_empty() {
        name = hebrew_name;
    }
    if namespace.is_empty() || key.is_empty() || name.is_empty() {
        return None;
    }
    Some(CleanDefinition {
        namespace: namespace.to_string(),
        key: key.to_string(),
        name: name.to_string(),
        hebrew_name: hebrew_name.to_string(),
    })
}

fn metafield_key(namespace: &str, key: &str) -> String {
    format!("{}/{}", namespace.to_lowercase(), key.to_lowercase())
}
