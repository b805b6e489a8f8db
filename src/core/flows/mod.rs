//! Reconciliation flows
//!
//! Each flow pulls one dataset from the ERP, normalizes and deduplicates
//! it, and pushes it to the storefront as idempotent upserts. Flows are
//! independent of each other; the binary runs them in a fixed order and a
//! failed flow never blocks the ones after it.
//!
//! All flows share the same shape: fetch, group by natural key, resolve
//! target identity per unit (a missing target is a counted skip, a
//! transport failure is fatal), and execute mutations through a bounded
//! worker pool that cancels siblings on the first fatal error.

mod attributes;
mod categories;
mod order;
mod prices;
mod products;
mod related;
mod stock;

use std::sync::Arc;

use crate::adapters::{ErpClient, StorefrontClient};
use crate::core::pool::WorkerPool;
use crate::core::provisioner::Provisioner;

/// Units of work a flow keeps in flight at once.
pub(crate) const FLOW_CONCURRENCY: usize = 4;

/// Coordinates the reconciliation flows against one ERP and one storefront.
pub struct SyncEngine {
    erp: Arc<ErpClient>,
    storefront: Arc<StorefrontClient>,
    provisioner: Provisioner,
    concurrency: usize,
    order_add_failure_fatal: bool,
}

impl SyncEngine {
    pub fn new(erp: Arc<ErpClient>, storefront: Arc<StorefrontClient>) -> Self {
        Self {
            erp,
            provisioner: Provisioner::new(Arc::clone(&storefront)),
            storefront,
            concurrency: FLOW_CONCURRENCY,
            order_add_failure_fatal: false,
        }
    }

    /// Escalate a failed add-to-collection during the product-order flow
    /// from a logged warning to a flow-fatal error.
    pub fn with_order_add_failure_fatal(mut self, fatal: bool) -> Self {
        self.order_add_failure_fatal = fatal;
        self
    }

    fn pool(&self) -> WorkerPool {
        WorkerPool::new(self.concurrency)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::SyncEngine;
    use crate::adapters::storefront::testing::client_for;
    use crate::adapters::ErpClient;
    use crate::config::ErpConfig;
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::Arc;

    pub(crate) fn erp_client_for(server: &mockito::Server) -> ErpClient {
        let config = ErpConfig {
            base_url: server.url(),
            token: SecretString::from("erp-token".to_string()),
            timeout_ms: 5_000,
        };
        ErpClient::new(&config).unwrap()
    }

    pub(crate) fn engine_for(erp: &mockito::Server, storefront: &mockito::Server) -> SyncEngine {
        SyncEngine::new(
            Arc::new(erp_client_for(erp)),
            Arc::new(client_for(storefront)),
        )
    }

    /// Install storefront mocks describing a fully provisioned Israel
    /// market chain, so flows that call the provisioner can pass through it
    /// without creating anything.
    pub(crate) async fn mock_ready_israel_chain(server: &mut mockito::Server) {
        use crate::adapters::storefront::testing::GRAPHQL_PATH;

        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(mockito::Matcher::Regex("listMarkets".to_string()))
            .with_body(
                json!({
                    "data": {
                        "markets": {
                            "nodes": [{
                                "id": "gid://shopify/Market/7",
                                "name": "Israel",
                                "handle": "il",
                                "enabled": true,
                                "currencySettings": {
                                    "baseCurrency": {"currencyCode": "ILS"},
                                    "localCurrencies": false
                                },
                                "regions": {"nodes": [{"code": "IL"}]}
                            }],
                            "pageInfo": {"hasNextPage": false, "endCursor": ""}
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(mockito::Matcher::Regex("catalogsByTitle".to_string()))
            .with_body(
                json!({
                    "data": {
                        "catalogs": {
                            "nodes": [{
                                "id": "gid://shopify/Catalog/3",
                                "title": "Israel Catalog",
                                "status": "ACTIVE"
                            }]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(mockito::Matcher::Regex("marketCatalogs".to_string()))
            .with_body(
                json!({
                    "data": {
                        "market": {
                            "id": "gid://shopify/Market/7",
                            "catalogs": {
                                "nodes": [{"id": "gid://shopify/Catalog/3", "title": "Israel Catalog"}],
                                "pageInfo": {"hasNextPage": false, "endCursor": ""}
                            }
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(mockito::Matcher::Regex("catalogDetails".to_string()))
            .with_body(
                json!({
                    "data": {
                        "catalog": {
                            "id": "gid://shopify/Catalog/3",
                            "title": "Israel Catalog",
                            "publication": {"id": "gid://shopify/Publication/5", "autoPublish": true},
                            "priceList": {"id": "gid://shopify/PriceList/6", "name": "Israel ILS", "currency": "ILS"}
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
    }
}
