//! Related-products flow
//!
//! Cross-sell links from the ERP replace each product's related-products
//! metafield wholesale. The shared definition is ensured once up front so
//! the first sync on a fresh shop works.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::SyncEngine;
use crate::core::summary::FlowSummary;
use crate::domain::Result;

impl SyncEngine {
    /// Rewrite related-product links for every ERP grouping.
    pub async fn sync_related_products(&self) -> Result<FlowSummary> {
        let started = Instant::now();
        let mut summary = FlowSummary::new("Related products");

        let rows = self.erp.fetch_related_products().await?;
        summary.processed = rows.len() as u64;
        tracing::info!(rows = rows.len(), "Fetched ERP related products");

        self.storefront.ensure_related_products_definition().await?;

        let synced = Arc::new(AtomicU64::new(0));
        let missing_product = Arc::new(AtomicU64::new(0));
        let mut skipped_empty_sku = 0u64;
        let mut pool = self.pool();
        for row in rows {
            if row.sku.trim().is_empty() {
                skipped_empty_sku += 1;
                continue;
            }
            let storefront = Arc::clone(&self.storefront);
            let synced = Arc::clone(&synced);
            let missing_product = Arc::clone(&missing_product);
            pool.spawn(async move {
                if storefront
                    .upsert_related_products(&row.sku, &row.related_skus)
                    .await?
                {
                    synced.fetch_add(1, Ordering::Relaxed);
                } else {
                    missing_product.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            });
        }
        pool.join().await?;

        summary.updated = synced.load(Ordering::Relaxed);
        summary.record_skips("empty_sku", skipped_empty_sku);
        summary.record_skips("missing_product", missing_product.load(Ordering::Relaxed));
        let summary = summary.with_duration(started.elapsed());

        tracing::info!(
            rows = summary.processed,
            synced = summary.updated,
            skipped = summary.skipped_total(),
            "Related products sync finished"
        );
        Ok(summary)
    }
}
