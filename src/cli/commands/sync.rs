//! Sync command implementation
//!
//! This module implements the `sync` command, which runs the reconciliation
//! flows against the storefront in a fixed order. A failed flow is notified
//! and logged but never blocks the flows after it.

use crate::adapters::{ErpClient, StorefrontClient};
use crate::config::AppConfig;
use crate::core::{FlowSummary, SyncEngine};
use crate::domain::Result;
use crate::notify::{build_notifier, Notifier};
use clap::Args;
use std::sync::Arc;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Also reorder products inside their category collections
    #[arg(long)]
    pub order: bool,

    /// Also rewrite related-product links
    #[arg(long)]
    pub related: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!("Starting catalog sync");

        let config = match AppConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Configuration loading failed");
                eprintln!("Configuration error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let erp = match ErpClient::new(&config.erp) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build ERP client");
                eprintln!("Failed to initialize ERP client: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        let storefront = match StorefrontClient::new(&config.shop) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build storefront client");
                eprintln!("Failed to initialize storefront client: {e}");
                return Ok(4);
            }
        };

        let notifier = match build_notifier(&config.notify) {
            Ok(notifier) => notifier,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build notifier");
                eprintln!("Failed to initialize notifier: {e}");
                return Ok(4);
            }
        };

        let engine = SyncEngine::new(Arc::clone(&erp), Arc::clone(&storefront))
            .with_order_add_failure_fatal(config.sync.order_add_failure_fatal);

        notifier
            .info(&format!("Catalog sync started for {}", config.shop.domain))
            .await;

        let mut failed_steps: Vec<&'static str> = Vec::new();

        report_step(
            notifier.as_ref(),
            "products",
            engine.sync_products().await,
            &mut failed_steps,
        )
        .await;
        report_step(
            notifier.as_ref(),
            "categories",
            engine.sync_categories().await,
            &mut failed_steps,
        )
        .await;
        report_step(
            notifier.as_ref(),
            "attributes",
            engine.sync_attributes().await,
            &mut failed_steps,
        )
        .await;
        report_step(
            notifier.as_ref(),
            "prices",
            engine.sync_prices().await,
            &mut failed_steps,
        )
        .await;
        report_step(
            notifier.as_ref(),
            "stock",
            engine.sync_stock().await,
            &mut failed_steps,
        )
        .await;

        if self.order {
            report_step(
                notifier.as_ref(),
                "product order",
                engine.sync_product_order().await,
                &mut failed_steps,
            )
            .await;
        }

        if self.related {
            report_step(
                notifier.as_ref(),
                "related products",
                engine.sync_related_products().await,
                &mut failed_steps,
            )
            .await;
        }

        // The ERP-side file sync is fire-and-forget; dropping the handle
        // detaches the request, which finishes while notifications drain.
        drop(erp.trigger_file_sync());

        if failed_steps.is_empty() {
            notifier.success("Catalog sync finished").await;
            Ok(0)
        } else {
            notifier
                .error(&format!(
                    "Catalog sync finished with failed steps: {}",
                    failed_steps.join(", ")
                ))
                .await;
            Ok(1) // Partial failure
        }
    }
}

/// Forward a finished step to the notifier and record a failure.
async fn report_step(
    notifier: &dyn Notifier,
    step: &'static str,
    outcome: Result<FlowSummary>,
    failed_steps: &mut Vec<&'static str>,
) {
    match outcome {
        Ok(summary) => notifier.info(&summary.status_line()).await,
        Err(e) => {
            tracing::error!(step, error = %e, "Sync step failed");
            notifier.error(&format!("{step} sync failed: {e}")).await;
            failed_steps.push(step);
        }
    }
}
