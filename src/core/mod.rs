//! Core sync logic for Shopsync.
//!
//! This module contains the reconciliation engine and its supporting
//! machinery.
//!
//! # Modules
//!
//! - [`flows`] - The per-entity sync flows behind [`SyncEngine`]
//! - [`pool`] - Bounded worker pool with first-error cancellation
//! - [`provisioner`] - Israel market, catalog, publication and price list setup
//! - [`summary`] - Per-flow outcome reporting
//! - [`wipe`] - Bulk destructive storefront reset
//!
//! # Sync Workflow
//!
//! A full sync runs the flows in dependency order:
//!
//! 1. **Products**: upsert storefront products by SKU
//! 2. **Categories**: upsert collections and product membership
//! 3. **Attributes**: ensure metafield definitions and write values
//! 4. **Prices**: USD base prices plus fixed ILS prices (provisions the
//!    Israel market chain first)
//! 5. **Stock**: absolute on-hand quantities at the primary location
//! 6. **Product order**: manual collection positions (optional)
//! 7. **Related products**: cross-sell metafield links (optional)
//!
//! Each flow fetches its ERP snapshot, validates and deduplicates rows,
//! resolves storefront identity, then applies mutations through a bounded
//! worker pool. Every flow returns a [`FlowSummary`] and leaves the others
//! free to run even when it fails.

pub mod flows;
pub mod pool;
pub mod provisioner;
pub mod summary;
pub mod wipe;

pub use flows::SyncEngine;
pub use pool::{CancelToken, WorkerPool};
pub use provisioner::{IsraelMarketResources, Provisioner};
pub use summary::FlowSummary;
pub use wipe::{wipe_storefront, WipeSummary};
