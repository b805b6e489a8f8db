//! Price flow
//!
//! USD amounts become variant base prices; ILS amounts are pinned as fixed
//! prices on the Israel price list so they never track the USD conversion
//! rate. A SKU is only written once rows for both currencies exist.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::SyncEngine;
use crate::adapters::storefront::VariantPrice;
use crate::core::summary::FlowSummary;
use crate::domain::{Result, SyncError};

const CURRENCY_USD: &str = "USD";
const CURRENCY_ILS: &str = "ILS";

/// Price rows for one SKU, folded across currencies. Later rows for the
/// same currency overwrite earlier ones.
#[derive(Default)]
struct PricePair {
    sku: String,
    usd: Option<f64>,
    ils: Option<f64>,
}

/// A complete pair attached to its storefront variant.
struct ResolvedPrices {
    product_id: String,
    variant_id: String,
    usd: f64,
    ils: f64,
}

impl SyncEngine {
    /// Write USD base prices and fixed ILS prices for every SKU that has
    /// both currencies on the ERP.
    pub async fn sync_prices(&self) -> Result<FlowSummary> {
        let started = Instant::now();
        let mut summary = FlowSummary::new("Prices");

        let resources = self.provisioner.ensure().await?;

        let rows = self.erp.fetch_prices().await?;
        summary.processed = rows.len() as u64;
        tracing::info!(rows = rows.len(), "Fetched ERP prices");

        let mut pairs: BTreeMap<String, PricePair> = BTreeMap::new();
        let mut skipped_empty_sku = 0u64;
        let mut skipped_negative = 0u64;
        for row in &rows {
            let sku = row.sku.trim();
            if sku.is_empty() {
                skipped_empty_sku += 1;
                continue;
            }
            if row.amount < 0.0 {
                tracing::warn!(
                    sku,
                    currency = %row.currency,
                    amount = row.amount,
                    "Negative price ignored"
                );
                skipped_negative += 1;
                continue;
            }
            let pair = pairs.entry(sku.to_lowercase()).or_default();
            if pair.sku.is_empty() {
                pair.sku = sku.to_string();
            }
            match row.currency.as_str() {
                CURRENCY_USD => pair.usd = Some(row.amount),
                CURRENCY_ILS => pair.ils = Some(row.amount),
                other => {
                    tracing::debug!(sku, currency = other, "Ignoring unsupported price currency");
                }
            }
        }

        let mut complete: Vec<(String, f64, f64)> = Vec::new();
        let mut skipped_missing_pair = 0u64;
        for pair in pairs.into_values() {
            match (pair.usd, pair.ils) {
                (Some(usd), Some(ils)) => complete.push((pair.sku, usd, ils)),
                (usd, ils) => {
                    tracing::warn!(
                        sku = %pair.sku,
                        has_usd = usd.is_some(),
                        has_ils = ils.is_some(),
                        "SKU lacks a complete USD/ILS price pair"
                    );
                    skipped_missing_pair += 1;
                }
            }
        }

        let resolved: Arc<Mutex<Vec<ResolvedPrices>>> = Arc::new(Mutex::new(Vec::new()));
        let missing_product = Arc::new(AtomicU64::new(0));
        let mut pool = self.pool();
        for (sku, usd, ils) in complete {
            let storefront = Arc::clone(&self.storefront);
            let resolved = Arc::clone(&resolved);
            let missing_product = Arc::clone(&missing_product);
            pool.spawn(async move {
                let Some(variant) = storefront.variant_by_sku(&sku).await? else {
                    tracing::warn!(sku, "No storefront variant for priced SKU");
                    missing_product.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                };
                let mut entries = resolved
                    .lock()
                    .map_err(|_| SyncError::Other("resolved price collection poisoned".to_string()))?;
                entries.push(ResolvedPrices {
                    product_id: variant.product.id,
                    variant_id: variant.id,
                    usd,
                    ils,
                });
                Ok(())
            });
        }
        pool.join().await?;

        let mut resolved = Arc::try_unwrap(resolved)
            .map_err(|_| SyncError::Other("resolved price collection still shared".to_string()))?
            .into_inner()
            .map_err(|_| SyncError::Other("resolved price collection poisoned".to_string()))?;
        resolved.sort_by(|a, b| {
            (a.product_id.as_str(), a.variant_id.as_str())
                .cmp(&(b.product_id.as_str(), b.variant_id.as_str()))
        });
        let written = resolved.len() as u64;

        let mut usd_by_product: BTreeMap<String, Vec<VariantPrice>> = BTreeMap::new();
        let mut ils_prices: Vec<VariantPrice> = Vec::new();
        for entry in resolved {
            usd_by_product
                .entry(entry.product_id)
                .or_default()
                .push(VariantPrice {
                    variant_id: entry.variant_id.clone(),
                    amount: entry.usd,
                });
            ils_prices.push(VariantPrice {
                variant_id: entry.variant_id,
                amount: entry.ils,
            });
        }

        let mut pool = self.pool();
        for (product_id, prices) in usd_by_product {
            let storefront = Arc::clone(&self.storefront);
            pool.spawn(async move {
                storefront
                    .update_variant_base_prices(&product_id, &prices)
                    .await
            });
        }
        pool.join().await?;

        self.storefront
            .add_fixed_ils_prices(&resources.price_list_id, &ils_prices)
            .await?;

        summary.updated = written;
        summary.record_skips("empty_sku", skipped_empty_sku);
        summary.record_skips("negative_amount", skipped_negative);
        summary.record_skips("missing_pair", skipped_missing_pair);
        summary.record_skips("missing_product", missing_product.load(Ordering::Relaxed));
        let summary = summary.with_duration(started.elapsed());

        tracing::info!(
            rows = summary.processed,
            written,
            skipped = summary.skipped_total(),
            "Prices sync finished"
        );
        Ok(summary)
    }
}
