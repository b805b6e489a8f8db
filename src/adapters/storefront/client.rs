//! Storefront client
//!
//! The client is one struct with its operations spread over capability
//! modules (products, collections, metafields, related, markets, prices,
//! inventory, translations), each contributing an `impl` block. Every
//! operation funnels through the shared retrying transport.

use super::transport::{GraphqlTransport, RetryConfig};
use crate::config::ShopConfig;
use crate::domain::Result;
use tokio::sync::OnceCell;

pub struct StorefrontClient {
    pub(super) transport: GraphqlTransport,
    /// Fulfillment location id, resolved once per process.
    pub(super) primary_location: OnceCell<String>,
}

impl StorefrontClient {
    pub fn new(config: &ShopConfig) -> Result<Self> {
        Ok(Self {
            transport: GraphqlTransport::new(config)?,
            primary_location: OnceCell::new(),
        })
    }

    /// Client with tuned retry settings.
    pub fn with_retry(config: &ShopConfig, retry: RetryConfig) -> Result<Self> {
        Ok(Self {
            transport: GraphqlTransport::with_retry(config, retry)?,
            primary_location: OnceCell::new(),
        })
    }
}
