//! Attribute metafield flow
//!
//! ERP attributes become product metafields under the `attributes`
//! namespace. Attribute names are slugified into metafield keys; the
//! definitions are ensured up front so values land on named fields, then
//! each SKU's values are written in one batched call.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::SyncEngine;
use crate::adapters::storefront::{ProductMetafieldDefinitionInput, ProductMetafieldInput};
use crate::core::summary::FlowSummary;
use crate::domain::{Attribute, Result};

/// Namespace every ERP attribute metafield lives under.
const ATTRIBUTES_NAMESPACE: &str = "attributes";

/// Key length ceiling imposed by the storefront.
const MAX_KEY_LENGTH: usize = 30;

/// Resolved metafield identity for one attribute.
struct AttributeKey {
    key: String,
    name_english: String,
    name_hebrew: String,
}

impl SyncEngine {
    /// Write attribute values as product metafields, ensuring the schema
    /// definitions first.
    pub async fn sync_attributes(&self) -> Result<FlowSummary> {
        let started = Instant::now();
        let mut summary = FlowSummary::new("Attributes");

        let (attributes, assignments) = self.erp.fetch_attributes().await?;
        summary.processed = assignments.len() as u64;
        tracing::info!(
            attributes = attributes.len(),
            assignments = assignments.len(),
            "Fetched ERP attributes"
        );

        let (keys, invalid_ids) = build_attribute_keys(&attributes);

        let definitions: Vec<ProductMetafieldDefinitionInput> = keys
            .values()
            .map(|entry| ProductMetafieldDefinitionInput {
                namespace: ATTRIBUTES_NAMESPACE.to_string(),
                key: entry.key.clone(),
                name_english: entry.name_english.clone(),
                name_hebrew: entry.name_hebrew.clone(),
            })
            .collect();
        self.storefront
            .ensure_product_metafield_definitions(&definitions)
            .await?;

        // First assignment per (SKU, key) wins; later duplicates are noise
        // from the ERP's denormalized export.
        let mut by_sku: BTreeMap<String, BTreeMap<String, ProductMetafieldInput>> = BTreeMap::new();
        let mut skipped_empty_sku = 0u64;
        let mut skipped_missing_attribute = 0u64;
        let mut skipped_empty_value = 0u64;
        let mut skipped_invalid_key = 0u64;
        for assignment in &assignments {
            let sku = assignment.sku.trim();
            if sku.is_empty() {
                skipped_empty_sku += 1;
                continue;
            }
            if invalid_ids.contains(&assignment.attribute_id) {
                skipped_invalid_key += 1;
                continue;
            }
            let Some(entry) = keys.get(&assignment.attribute_id) else {
                tracing::warn!(
                    sku,
                    attribute_id = assignment.attribute_id,
                    "Assignment references an unknown attribute"
                );
                skipped_missing_attribute += 1;
                continue;
            };
            let value = assignment.resolved_value();
            if value.is_empty() {
                skipped_empty_value += 1;
                continue;
            }
            by_sku
                .entry(sku.to_string())
                .or_default()
                .entry(entry.key.clone())
                .or_insert_with(|| ProductMetafieldInput {
                    namespace: ATTRIBUTES_NAMESPACE.to_string(),
                    key: entry.key.clone(),
                    value_english: value.to_string(),
                    value_hebrew: assignment.value_hebrew.trim().to_string(),
                });
        }

        let products = by_sku.len() as u64;
        let synced = Arc::new(AtomicU64::new(0));
        let mut pool = self.pool();
        for (sku, fields) in by_sku {
            let storefront = Arc::clone(&self.storefront);
            let synced = Arc::clone(&synced);
            let fields: Vec<ProductMetafieldInput> = fields.into_values().collect();
            pool.spawn(async move {
                storefront.upsert_product_metafields(&sku, &fields).await?;
                synced.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
        }
        pool.join().await?;

        summary.updated = synced.load(Ordering::Relaxed);
        summary.record_skips("empty_sku", skipped_empty_sku);
        summary.record_skips("missing_attribute", skipped_missing_attribute);
        summary.record_skips("empty_value", skipped_empty_value);
        summary.record_skips("invalid_key", skipped_invalid_key);
        let summary = summary.with_duration(started.elapsed());

        tracing::info!(
            assignments = summary.processed,
            products,
            synced = summary.updated,
            skipped = summary.skipped_total(),
            "Attributes sync finished"
        );
        Ok(summary)
    }
}

/// Derive a metafield key per attribute id. A name that slugs to nothing,
/// or a key already taken by an earlier attribute, falls back to
/// `attr_<id>`; a slug that survives non-empty but still fails validation
/// disqualifies the attribute and is reported separately.
fn build_attribute_keys(attributes: &[Attribute]) -> (BTreeMap<i64, AttributeKey>, HashSet<i64>) {
    let mut sorted: Vec<&Attribute> = attributes.iter().filter(|entry| entry.id > 0).collect();
    sorted.sort_by_key(|entry| entry.id);

    let mut taken: HashSet<String> = HashSet::new();
    let mut keys: BTreeMap<i64, AttributeKey> = BTreeMap::new();
    let mut invalid: HashSet<i64> = HashSet::new();
    for attribute in sorted {
        if keys.contains_key(&attribute.id) {
            continue;
        }
        let slug = slugify_key(attribute.resolved_name());
        let key = if slug.is_empty() || taken.contains(&slug) {
            format!("attr_{}", attribute.id)
        } else {
            slug
        };
        if !is_valid_metafield_key(&key) {
            tracing::warn!(
                attribute_id = attribute.id,
                name = attribute.resolved_name(),
                key,
                "Attribute name does not produce a usable metafield key"
            );
            invalid.insert(attribute.id);
            continue;
        }
        taken.insert(key.clone());
        let name = attribute.resolved_name();
        keys.insert(
            attribute.id,
            AttributeKey {
                name_english: if name.is_empty() { key.clone() } else { name.to_string() },
                name_hebrew: attribute.hebrew_name.trim().to_string(),
                key,
            },
        );
    }
    (keys, invalid)
}

/// Lowercase the name and collapse everything that is not ASCII
/// alphanumeric into single underscores, capped at the key length ceiling.
fn slugify_key(name: &str) -> String {
    let mut slug = String::new();
    let mut pending_separator = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if slug.len() > MAX_KEY_LENGTH {
        slug.truncate(MAX_KEY_LENGTH);
        while slug.ends_with('_') {
            slug.pop();
        }
    }
    slug
}

/// Keys must be 2..=30 characters of `[a-z0-9_]` and start alphanumeric.
fn is_valid_metafield_key(key: &str) -> bool {
    if key.len() < 2 || key.len() > MAX_KEY_LENGTH {
        return false;
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first.is_ascii_digit() => {}
        _ => return false,
    }
    key.chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::super::testing::engine_for;
    use super::*;
    use crate::adapters::storefront::testing::GRAPHQL_PATH;
    use mockito::Matcher;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("Item Size (cm)", "item_size_cm")]
    #[test_case("Net weight (kg)", "net_weight_kg")]
    #[test_case("  Cup capacity (ml) ", "cup_capacity_ml")]
    #[test_case("Filter", "filter")]
    #[test_case("מידות", ""; "hebrew slugs to nothing")]
    fn test_slugify_key(name: &str, expected: &str) {
        assert_eq!(slugify_key(name), expected);
    }

    #[test]
    fn test_slugify_key_caps_length() {
        let slug = slugify_key("An Extremely Long Attribute Name That Keeps Going");
        assert!(slug.len() <= MAX_KEY_LENGTH);
        assert!(!slug.ends_with('_'));
        assert!(is_valid_metafield_key(&slug));
    }

    #[test]
    fn test_build_attribute_keys_falls_back_and_detects_collisions() {
        let attributes = vec![
            Attribute {
                id: 86,
                hebrew_name: "סינון".to_string(),
                english_name: "Filter".to_string(),
            },
            Attribute {
                id: 87,
                hebrew_name: "מסנן".to_string(),
                english_name: "filter!".to_string(),
            },
            Attribute {
                id: 88,
                hebrew_name: "מידות".to_string(),
                english_name: String::new(),
            },
            Attribute {
                id: 89,
                hebrew_name: String::new(),
                english_name: "X".to_string(),
            },
        ];

        let (keys, invalid) = build_attribute_keys(&attributes);

        assert_eq!(keys.get(&86).unwrap().key, "filter");
        // Collision with 86's slug falls back to the id form.
        assert_eq!(keys.get(&87).unwrap().key, "attr_87");
        // Hebrew-only name slugs to nothing and falls back too.
        assert_eq!(keys.get(&88).unwrap().key, "attr_88");
        // A one-character slug is invalid and disqualifies the attribute.
        assert!(!keys.contains_key(&89));
        assert!(invalid.contains(&89));
    }

    #[test]
    fn test_is_valid_metafield_key() {
        assert!(is_valid_metafield_key("item_size_cm"));
        assert!(is_valid_metafield_key("a1"));
        assert!(!is_valid_metafield_key("x"));
        assert!(!is_valid_metafield_key("_leading"));
        assert!(!is_valid_metafield_key("Upper"));
        assert!(!is_valid_metafield_key(""));
    }

    #[tokio::test]
    async fn test_sync_attributes_groups_values_per_sku() {
        let mut erp = mockito::Server::new_async().await;
        let mut shop = mockito::Server::new_async().await;
        erp.mock("POST", "/attributes")
            .with_body(
                json!({
                    "status": "ok",
                    "attributesMain": [
                        {"NoteName": "Filter", "NoteNameEnglish": "Filter", "NoteID": 86},
                        {"NoteName": "Item Size (cm)", "NoteNameEnglish": "Item Size (cm)", "NoteID": 87}
                    ],
                    "attributesProducts": [
                        {"KeF": "SKU-1", "Note": "", "NoteEnglish": "Glass", "NoteID": 86},
                        {"KeF": "SKU-1", "Note": "", "NoteEnglish": "10x10", "NoteID": 87},
                        {"KeF": "SKU-1", "Note": "", "NoteEnglish": "Crystal", "NoteID": 86},
                        {"KeF": "SKU-2", "Note": "", "NoteEnglish": "", "NoteID": 86},
                        {"KeF": "  ", "Note": "", "NoteEnglish": "Lost", "NoteID": 86},
                        {"KeF": "SKU-3", "Note": "", "NoteEnglish": "Orphan", "NoteID": 99}
                    ]
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
                            "nodes": [
                                {"id": "gid://shopify/MetafieldDefinition/1", "name": "Filter", "namespace": "attributes", "key": "filter"},
                                {"id": "gid://shopify/MetafieldDefinition/2", "name": "Item Size (cm)", "namespace": "attributes", "key": "item_size_cm"}
                            ],
                            "pageInfo": {"hasNextPage": false, "endCursor": ""}
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let definition_create = shop
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("metafieldDefinitionCreate".to_string()))
            .expect(0)
            .create_async()
            .await;
        shop.mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {"query": "sku:SKU-1"}
            })))
            .with_body(
                json!({
                    "data": {
                        "productVariants": {
                            "nodes": [{"id": "gid://shopify/ProductVariant/11", "sku": "SKU-1", "product": {"id": "gid://shopify/Product/101"}}]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let set = shop
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {
                    "metafields": [
                        {
                            "ownerId": "gid://shopify/Product/101",
                            "namespace": "attributes",
                            "key": "filter",
                            "type": "single_line_text_field",
                            "value": "Glass"
                        },
                        {
                            "ownerId": "gid://shopify/Product/101",
                            "namespace": "attributes",
                            "key": "item_size_cm",
                            "type": "single_line_text_field",
                            "value": "10x10"
                        }
                    ]
                }
            })))
            .with_body(
                json!({
                    "data": {
                        "metafieldsSet": {
                            "metafields": [
                                {"id": "gid://shopify/Metafield/1", "namespace": "attributes", "key": "filter", "value": "Glass", "type": "single_line_text_field"},
                                {"id": "gid://shopify/Metafield/2", "namespace": "attributes", "key": "item_size_cm", "value": "10x10", "type": "single_line_text_field"}
                            ],
                            "userErrors": []
                        }
                    }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let summary = engine_for(&erp, &shop).sync_attributes().await.unwrap();

        definition_create.assert_async().await;
        set.assert_async().await;
        assert_eq!(summary.processed, 6);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped.get("empty_sku"), Some(&1));
        assert_eq!(summary.skipped.get("empty_value"), Some(&1));
        assert_eq!(summary.skipped.get("missing_attribute"), Some(&1));
    }

    #[tokio::test]
    async fn test_sync_attributes_creates_missing_definitions() {
        let mut erp = mockito::Server::new_async().await;
        let mut shop = mockito::Server::new_async().await;
        erp.mock("POST", "/attributes")
            .with_body(
                json!({
                    "status": "ok",
                    "attributesMain": [
                        {"NoteName": "Filter", "NoteNameEnglish": "Filter", "NoteID": 86}
                    ],
                    "attributesProducts": []
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
                            "nodes": [],
                            "pageInfo": {"hasNextPage": false, "endCursor": ""}
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let create = shop
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::PartialJson(json!({
                "variables": {
                    "definition": {
                        "name": "Filter",
                        "namespace": "attributes",
                        "key": "filter",
                        "type": "single_line_text_field",
                        "ownerType": "PRODUCT"
                    }
                }
            })))
            .with_body(
                json!({
                    "data": {
                        "metafieldDefinitionCreate": {
                            "createdDefinition": {
                                "id": "gid://shopify/MetafieldDefinition/1",
                                "name": "Filter",
                                "namespace": "attributes",
                                "key": "filter"
                            },
                            "userErrors": []
                        }
                    }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let summary = engine_for(&erp, &shop).sync_attributes().await.unwrap();

        create.assert_async().await;
        assert_eq!(summary.updated, 0);
    }
}
