//! Storefront adapter
//!
//! GraphQL Admin API client for the Shopify shop, split by capability:
//! products, collections, metafields, related products, markets, prices,
//! inventory, and translations each extend [`StorefrontClient`] with their
//! own operations. The transport underneath retries throttled and transient
//! failures with exponential backoff.

pub mod client;
pub mod collections;
pub mod inventory;
pub mod markets;
pub mod metafields;
pub mod prices;
pub mod products;
pub mod related;
pub mod transport;
pub mod translations;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::StorefrontClient;
pub use markets::CatalogDetails;
pub use transport::{GraphqlTransport, RetryConfig};
pub use types::{
    CatalogNode, CollectionMove, CollectionNode, InventoryItemRef, MarketSummary,
    MetafieldDefinitionNode, OnHandQuantity, ProductMetafieldDefinitionInput,
    ProductMetafieldInput, PriceListNode, PublicationNode, VariantPrice,
};
