//! Product order flow
//!
//! ERP ordering directives pin products to manual positions inside their
//! collections. The smallest order number wins when a SKU appears twice in
//! the same category, and positions are assigned densely from zero in
//! (order number, SKU) order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::SyncEngine;
use crate::adapters::storefront::CollectionMove;
use crate::core::summary::FlowSummary;
use crate::domain::Result;

/// Directives for one category, keyed by lowercased SKU.
struct CategoryOrders {
    title: String,
    entries: BTreeMap<String, OrderEntry>,
}

struct OrderEntry {
    sku: String,
    order: i64,
}

#[derive(Default)]
struct Counters {
    moved: AtomicU64,
    missing_collection: AtomicU64,
    missing_product: AtomicU64,
    add_failed: AtomicU64,
}

impl SyncEngine {
    /// Apply manual product ordering inside collections.
    ///
    /// A failed collection add is counted and skipped by default; engines
    /// built with [`SyncEngine::with_order_add_failure_fatal`] abort the
    /// flow instead.
    pub async fn sync_product_order(&self) -> Result<FlowSummary> {
        let started = Instant::now();
        let mut summary = FlowSummary::new("Product order");

        let rows = self.erp.fetch_product_order().await?;
        summary.processed = rows.len() as u64;
        tracing::info!(rows = rows.len(), "Fetched ERP product ordering");

        let mut groups: BTreeMap<String, CategoryOrders> = BTreeMap::new();
        let mut skipped_empty_sku = 0u64;
        let mut skipped_empty_category = 0u64;
        let mut skipped_negative = 0u64;
        for row in &rows {
            let sku = row.sku.trim();
            if sku.is_empty() {
                skipped_empty_sku += 1;
                continue;
            }
            for directive in &row.categories {
                let title = directive.resolved_title();
                if title.is_empty() {
                    skipped_empty_category += 1;
                    continue;
                }
                if directive.order_number < 0 {
                    tracing::warn!(
                        sku,
                        category = title,
                        order = directive.order_number,
                        "Negative order number ignored"
                    );
                    skipped_negative += 1;
                    continue;
                }
                let group = groups
                    .entry(title.to_lowercase())
                    .or_insert_with(|| CategoryOrders {
                        title: title.to_string(),
                        entries: BTreeMap::new(),
                    });
                group
                    .entries
                    .entry(sku.to_lowercase())
                    .and_modify(|entry| entry.order = entry.order.min(directive.order_number))
                    .or_insert_with(|| OrderEntry {
                        sku: sku.to_string(),
                        order: directive.order_number,
                    });
            }
        }

        let categories = groups.len() as u64;
        let counters = Arc::new(Counters::default());
        let fatal_adds = self.order_add_failure_fatal;
        let mut pool = self.pool();
        for group in groups.into_values() {
            let storefront = Arc::clone(&self.storefront);
            let counters = Arc::clone(&counters);
            pool.spawn(async move {
                order_one_collection(&storefront, group, &counters, fatal_adds).await
            });
        }
        pool.join().await?;

        summary.updated = counters.moved.load(Ordering::Relaxed);
        summary.record_skips("empty_sku", skipped_empty_sku);
        summary.record_skips("empty_category", skipped_empty_category);
        summary.record_skips("negative_order", skipped_negative);
        summary.record_skips(
            "missing_collection",
            counters.missing_collection.load(Ordering::Relaxed),
        );
        summary.record_skips(
            "missing_product",
            counters.missing_product.load(Ordering::Relaxed),
        );
        summary.record_skips("add_failed", counters.add_failed.load(Ordering::Relaxed));
        let summary = summary.with_duration(started.elapsed());

        tracing::info!(
            rows = summary.processed,
            categories,
            moved = summary.updated,
            skipped = summary.skipped_total(),
            "Product order sync finished"
        );
        Ok(summary)
    }
}

async fn order_one_collection(
    storefront: &crate::adapters::storefront::StorefrontClient,
    group: CategoryOrders,
    counters: &Counters,
    fatal_adds: bool,
) -> Result<()> {
    let Some(collection) = storefront.find_collection_by_title(&group.title).await? else {
        tracing::warn!(category = %group.title, "No collection for ordered category");
        counters.missing_collection.fetch_add(1, Ordering::Relaxed);
        return Ok(());
    };
    storefront
        .set_collection_manual_order(&collection.id)
        .await?;

    let mut entries: Vec<OrderEntry> = group.entries.into_values().collect();
    entries.sort_by(|a, b| (a.order, a.sku.as_str()).cmp(&(b.order, b.sku.as_str())));

    // Products must be members before a move can place them, and only
    // successful adds get a position.
    let mut moves: Vec<CollectionMove> = Vec::new();
    for entry in entries {
        let Some(product_id) = storefront.find_product_by_sku(&entry.sku).await? else {
            tracing::warn!(
                sku = %entry.sku,
                category = %group.title,
                "No storefront product for ordered SKU"
            );
            counters.missing_product.fetch_add(1, Ordering::Relaxed);
            continue;
        };
        if let Err(err) = storefront
            .add_product_to_collection(&collection.id, &product_id)
            .await
        {
            if fatal_adds {
                return Err(err);
            }
            tracing::warn!(
                sku = %entry.sku,
                category = %group.title,
                error = %err,
                "Adding product to ordered collection failed"
            );
            counters.add_failed.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        moves.push(CollectionMove {
            product_id,
            position: moves.len() as i64,
        });
    }

    storefront
        .reorder_collection_products(&collection.id, &moves)
        .await?;
    counters.moved.fetch_add(moves.len() as u64, Ordering::Relaxed);
    Ok(())
}
