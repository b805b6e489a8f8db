//! Category (collection) flow
//!
//! ERP categories become storefront collections matched by exact title.
//! Duplicate categories collapse case-insensitively, first-seen title wins.
//! Product attachment runs as a second pass after every collection exists,
//! so two rows naming the same new category never race a create.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::SyncEngine;
use crate::adapters::storefront::translations::should_update_translation;
use crate::adapters::storefront::StorefrontClient;
use crate::core::summary::FlowSummary;
use crate::domain::{Result, SyncError};

/// One deduplicated category with the SKUs assigned to it.
struct CategoryGroup {
    title: String,
    title_hebrew: String,
    skus: Vec<String>,
}

#[derive(Default)]
struct Counters {
    created: AtomicU64,
    renamed: AtomicU64,
    missing_product: AtomicU64,
    add_failed: AtomicU64,
}

impl SyncEngine {
    /// Upsert collections from ERP categories and attach their products.
    pub async fn sync_categories(&self) -> Result<FlowSummary> {
        let started = Instant::now();
        let mut summary = FlowSummary::new("Categories");

        let rows = self.erp.fetch_product_categories().await?;
        summary.processed = rows.len() as u64;
        tracing::info!(rows = rows.len(), "Fetched ERP product categories");

        let mut groups: BTreeMap<String, CategoryGroup> = BTreeMap::new();
        let mut skipped_empty_sku = 0u64;
        let mut skipped_blank_category = 0u64;
        for row in &rows {
            let sku = row.sku.trim();
            if sku.is_empty() {
                skipped_empty_sku += 1;
                continue;
            }
            for category in &row.categories {
                if category.is_blank() {
                    skipped_blank_category += 1;
                    continue;
                }
                let group = groups
                    .entry(category.dedupe_key())
                    .or_insert_with(|| CategoryGroup {
                        title: category.resolved_title().to_string(),
                        title_hebrew: category.title_hebrew.trim().to_string(),
                        skus: Vec::new(),
                    });
                if !group.skus.iter().any(|seen| seen.eq_ignore_ascii_case(sku)) {
                    group.skus.push(sku.to_string());
                }
            }
        }
        tracing::info!(categories = groups.len(), "Deduplicated ERP categories");

        let counters = Arc::new(Counters::default());

        // First pass: every collection exists before any product attaches.
        let collection_ids = Arc::new(Mutex::new(BTreeMap::<String, String>::new()));
        let mut pool = self.pool();
        for (key, group) in &groups {
            let storefront = Arc::clone(&self.storefront);
            let counters = Arc::clone(&counters);
            let collection_ids = Arc::clone(&collection_ids);
            let key = key.clone();
            let title = group.title.clone();
            let title_hebrew = group.title_hebrew.clone();
            pool.spawn(async move {
                let collection_id =
                    ensure_collection(&storefront, &title, &title_hebrew, &counters).await?;
                collection_ids
                    .lock()
                    .map_err(|_| SyncError::Other("collection id map poisoned".to_string()))?
                    .insert(key, collection_id);
                Ok(())
            });
        }
        pool.join().await?;

        // Second pass: attach products.
        let mut pool = self.pool();
        for (key, group) in groups {
            let Some(collection_id) = collection_ids
                .lock()
                .map_err(|_| SyncError::Other("collection id map poisoned".to_string()))?
                .get(&key)
                .cloned()
            else {
                continue;
            };
            for sku in group.skus {
                let storefront = Arc::clone(&self.storefront);
                let counters = Arc::clone(&counters);
                let collection_id = collection_id.clone();
                let title = group.title.clone();
                pool.spawn(async move {
                    attach_product(&storefront, &collection_id, &title, &sku, &counters).await
                });
            }
        }
        pool.join().await?;

        summary.created = counters.created.load(Ordering::Relaxed);
        summary.updated = counters.renamed.load(Ordering::Relaxed);
        summary.record_skips("empty_sku", skipped_empty_sku);
        summary.record_skips("blank_category", skipped_blank_category);
        summary.record_skips(
            "missing_product",
            counters.missing_product.load(Ordering::Relaxed),
        );
        summary.record_skips("add_failed", counters.add_failed.load(Ordering::Relaxed));
        let summary = summary.with_duration(started.elapsed());

        tracing::info!(
            rows = summary.processed,
            created = summary.created,
            renamed = summary.updated,
            skipped = summary.skipped_total(),
            "Categories sync finished"
        );
        Ok(summary)
    }
}

/// Find or create the collection for one category title, fixing the stored
/// title when it drifted in case or whitespace.
async fn ensure_collection(
    storefront: &StorefrontClient,
    title: &str,
    title_hebrew: &str,
    counters: &Counters,
) -> Result<String> {
    let collection_id = match storefront.find_collection_by_title(title).await? {
        Some(found) => {
            if found.title.trim() != title {
                storefront.rename_collection(&found.id, title).await?;
                counters.renamed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(collection_id = %found.id, title, "Renamed collection");
            }
            found.id
        }
        None => {
            let created = storefront.create_collection(title).await?;
            counters.created.fetch_add(1, Ordering::Relaxed);
            tracing::info!(collection_id = %created, title, "Created collection");
            created
        }
    };

    if should_update_translation(title, title_hebrew) {
        if let Err(err) = storefront
            .update_hebrew_translation(&collection_id, "title", title_hebrew)
            .await
        {
            tracing::warn!(title, error = %err, "Hebrew collection title translation failed");
        }
    }
    Ok(collection_id)
}

/// Attach one SKU's product to a collection. A missing product or a
/// rejected add is counted and logged, never fatal.
async fn attach_product(
    storefront: &StorefrontClient,
    collection_id: &str,
    title: &str,
    sku: &str,
    counters: &Counters,
) -> Result<()> {
    let Some(product_id) = storefront.find_product_by_sku(sku).await? else {
        tracing::warn!(sku, title, "Product not found on storefront, skipping attachment");
        counters.missing_product.fetch_add(1, Ordering::Relaxed);
        return Ok(());
    };

    if let Err(err) = storefront
        .add_product_to_collection(collection_id, &product_id)
        .await
    {
        tracing::warn!(sku, title, error = %err, "Adding product to collection failed");
        counters.add_failed.fetch_add(1, Ordering::Relaxed);
    }
    Ok(())
}
