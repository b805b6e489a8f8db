// Shopsync - ERP to Shopify catalog reconciliation
// Copyright (c) 2025 Shopsync Contributors
// Licensed under the MIT License

//! # Shopsync - ERP to Shopify catalog reconciliation
//!
//! Shopsync reconciles a wholesale ERP's product catalog into a Shopify
//! storefront: products, category collections, attribute metafields, dual
//! USD/ILS prices, stock levels, manual collection ordering, and
//! related-product links.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Fetching** catalog datasets from the ERP's HTTP API
//! - **Normalizing** rows at the wire boundary (currencies, quantities, text)
//! - **Reconciling** each dataset into the storefront as idempotent upserts
//! - **Provisioning** the Israel market chain the ILS prices depend on
//! - **Wiping** every synced entity for a clean re-import
//!
//! ## Architecture
//!
//! Shopsync follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (flows, worker pool, provisioner, wipe)
//! - [`adapters`] - External integrations (ERP, Shopify Admin GraphQL)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Environment-based configuration
//! - [`logging`] - Structured logging setup
//! - [`notify`] - Operator notifications (stdout, Telegram)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shopsync::adapters::{ErpClient, StorefrontClient};
//! use shopsync::config::AppConfig;
//! use shopsync::core::SyncEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Configuration comes from the environment (and .env via the binary)
//!     let config = AppConfig::from_env()?;
//!
//!     let erp = Arc::new(ErpClient::new(&config.erp)?);
//!     let storefront = Arc::new(StorefrontClient::new(&config.shop)?);
//!
//!     let engine = SyncEngine::new(erp, storefront);
//!     let summary = engine.sync_products().await?;
//!
//!     println!("{}", summary.status_line());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Shopsync uses the [`domain::SyncError`] type for all errors; collaborator
//! failures arrive as [`domain::ErpError`] and [`domain::StorefrontError`]
//! and convert with the `?` operator:
//!
//! ```rust,no_run
//! use shopsync::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = shopsync::config::AppConfig::from_env()?;
//!     let _ = config;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Shopsync uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn, error};
//!
//! info!(flow = "products", "Starting flow");
//! warn!(sku = "ABC-1", "No storefront variant for priced SKU");
//! error!(error = "timeout", "Flow failed");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod notify;
