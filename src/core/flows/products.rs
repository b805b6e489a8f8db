//! Product catalog flow
//!
//! Every ERP product is matched to a storefront product by SKU and either
//! updated or created. Creation needs an English title; updates tolerate a
//! missing one. The Hebrew title is registered as a translation after the
//! upsert, best-effort.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::SyncEngine;
use crate::adapters::storefront::translations::should_update_translation;
use crate::adapters::storefront::StorefrontClient;
use crate::core::summary::FlowSummary;
use crate::domain::{Product, Result};

#[derive(Default)]
struct Counters {
    created: AtomicU64,
    updated: AtomicU64,
    localized: AtomicU64,
    missing_title: AtomicU64,
}

impl SyncEngine {
    /// Upsert the full product catalog.
    pub async fn sync_products(&self) -> Result<FlowSummary> {
        let started = Instant::now();
        let mut summary = FlowSummary::new("Products");

        let products = self.erp.fetch_products().await?;
        summary.processed = products.len() as u64;
        tracing::info!(products = products.len(), "Fetched ERP products");

        let counters = Arc::new(Counters::default());
        let mut skipped_empty_sku = 0u64;
        let mut pool = self.pool();
        for product in products {
            if product.sku.trim().is_empty() {
                tracing::warn!(
                    title = product.display_title(),
                    "ERP product has no SKU, skipping"
                );
                skipped_empty_sku += 1;
                continue;
            }
            let storefront = Arc::clone(&self.storefront);
            let counters = Arc::clone(&counters);
            pool.spawn(async move { sync_one(&storefront, &product, &counters).await });
        }
        pool.join().await?;

        summary.created = counters.created.load(Ordering::Relaxed);
        summary.updated = counters.updated.load(Ordering::Relaxed);
        summary.record_skips("empty_sku", skipped_empty_sku);
        summary.record_skips(
            "missing_title",
            counters.missing_title.load(Ordering::Relaxed),
        );
        let summary = summary.with_duration(started.elapsed());

        tracing::info!(
            products = summary.processed,
            created = summary.created,
            updated = summary.updated,
            localized = counters.localized.load(Ordering::Relaxed),
            skipped = summary.skipped_total(),
            "Products sync finished"
        );
        Ok(summary)
    }
}

async fn sync_one(
    storefront: &StorefrontClient,
    product: &Product,
    counters: &Counters,
) -> Result<()> {
    let sku = product.sku.trim();
    let product_id = match storefront.find_product_by_sku(sku).await? {
        Some(product_id) => {
            storefront.update_product(&product_id, product).await?;
            counters.updated.fetch_add(1, Ordering::Relaxed);
            product_id
        }
        None => {
            if product.english_title.trim().is_empty() {
                tracing::warn!(sku, "ERP product has no English title, cannot create");
                counters.missing_title.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            let product_id = storefront.create_product(product).await?;
            counters.created.fetch_add(1, Ordering::Relaxed);
            tracing::info!(sku, product_id = %product_id, "Created storefront product");
            product_id
        }
    };

    // Localization is best-effort: a failed translation never fails the
    // product it belongs to.
    if should_update_translation(&product.english_title, &product.hebrew_title) {
        match storefront
            .update_hebrew_translation(&product_id, "title", &product.hebrew_title)
            .await
        {
            Ok(()) => {
                counters.localized.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                tracing::warn!(sku, error = %err, "Hebrew title translation failed");
            }
        }
    }
    Ok(())
}
