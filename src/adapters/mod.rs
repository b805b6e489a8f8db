//! External system integrations.
//!
//! Two systems sit on either side of the sync:
//!
//! - [`erp`] - the ERP bridge service holding the catalog source of truth
//! - [`storefront`] - the Shopify Admin GraphQL API the catalog is pushed to
//!
//! Adapters isolate wire formats and transport concerns from the sync flows.
//! Each exposes a client over reqwest; the flows only see domain models and
//! adapter input types.

pub mod erp;
pub mod storefront;

pub use erp::ErpClient;
pub use storefront::StorefrontClient;
