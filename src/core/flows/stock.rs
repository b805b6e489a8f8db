//! Stock flow
//!
//! Warehouse balances become absolute on-hand quantities at the primary
//! location. Items are switched to tracked and activated at the location
//! before quantities are written in one batched mutation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::SyncEngine;
use crate::adapters::storefront::OnHandQuantity;
use crate::core::summary::FlowSummary;
use crate::domain::{Result, StockLevel, SyncError};

impl SyncEngine {
    /// Push ERP warehouse balances to the storefront location.
    pub async fn sync_stock(&self) -> Result<FlowSummary> {
        let started = Instant::now();
        let mut summary = FlowSummary::new("Stock");

        let rows = self.erp.fetch_stock_levels().await?;
        summary.processed = rows.len() as u64;
        tracing::info!(rows = rows.len(), "Fetched ERP stock levels");

        // Last balance per SKU wins; the export repeats SKUs when an item
        // appears in several warehouse views.
        let mut levels: BTreeMap<String, StockLevel> = BTreeMap::new();
        let mut skipped_empty_sku = 0u64;
        let mut skipped_negative = 0u64;
        let mut skipped_duplicate = 0u64;
        for row in rows {
            let sku = row.sku.trim();
            if sku.is_empty() {
                skipped_empty_sku += 1;
                continue;
            }
            if row.quantity < 0 {
                tracing::warn!(sku, quantity = row.quantity, "Negative stock balance ignored");
                skipped_negative += 1;
                continue;
            }
            if levels
                .insert(
                    sku.to_lowercase(),
                    StockLevel {
                        sku: sku.to_string(),
                        quantity: row.quantity,
                    },
                )
                .is_some()
            {
                skipped_duplicate += 1;
            }
        }

        let location_id = self.storefront.primary_location_id().await?;

        let quantities: Arc<Mutex<Vec<OnHandQuantity>>> = Arc::new(Mutex::new(Vec::new()));
        let missing_product = Arc::new(AtomicU64::new(0));
        let mut pool = self.pool();
        for level in levels.into_values() {
            let storefront = Arc::clone(&self.storefront);
            let quantities = Arc::clone(&quantities);
            let missing_product = Arc::clone(&missing_product);
            let location_id = location_id.clone();
            pool.spawn(async move {
                let Some(item) = storefront.find_inventory_item_by_sku(&level.sku).await? else {
                    tracing::warn!(sku = %level.sku, "No storefront variant for stocked SKU");
                    missing_product.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                };
                storefront.enable_inventory_tracking(&item).await?;
                storefront
                    .activate_inventory_at_location(&item.inventory_item_id, &location_id)
                    .await?;
                let mut collected = quantities
                    .lock()
                    .map_err(|_| SyncError::Other("stock quantity collection poisoned".to_string()))?;
                collected.push(OnHandQuantity {
                    inventory_item_id: item.inventory_item_id,
                    quantity: level.quantity,
                });
                Ok(())
            });
        }
        pool.join().await?;

        let mut quantities = Arc::try_unwrap(quantities)
            .map_err(|_| SyncError::Other("stock quantity collection still shared".to_string()))?
            .into_inner()
            .map_err(|_| SyncError::Other("stock quantity collection poisoned".to_string()))?;
        quantities.sort_by(|a, b| a.inventory_item_id.cmp(&b.inventory_item_id));
        let written = quantities.len() as u64;

        self.storefront
            .set_on_hand_quantities(&location_id, &quantities)
            .await?;

        summary.updated = written;
        summary.record_skips("empty_sku", skipped_empty_sku);
        summary.record_skips("negative_quantity", skipped_negative);
        summary.record_skips("duplicate_sku", skipped_duplicate);
        summary.record_skips("missing_product", missing_product.load(Ordering::Relaxed));
        let summary = summary.with_duration(started.elapsed());

        tracing::info!(
            rows = summary.processed,
            written,
            skipped = summary.skipped_total(),
            "Stock sync finished"
        );
        Ok(summary)
    }
}
