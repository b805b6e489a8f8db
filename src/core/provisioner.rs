//! Israel market provisioning
//!
//! Price writes need a chain of storefront resources: the Israel market,
//! the Israel catalog attached to it, the catalog's publication, and an ILS
//! price list. Each step is lookup-or-create; the chain is verified as a
//! whole before the ids are handed out, and the result is computed once per
//! process and cached.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::adapters::storefront::markets::CURRENCY_ILS;
use crate::adapters::storefront::{CatalogNode, MarketSummary, StorefrontClient};
use crate::domain::{Result, SyncError};

/// Identifiers of the provisioned resource chain.
///
/// Once returned, all four ids are non-empty, the catalog is attached to
/// the market, the publication auto-publishes, and the price list is ILS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsraelMarketResources {
    pub market_id: String,
    pub catalog_id: String,
    pub publication_id: String,
    pub price_list_id: String,
}

/// Lazily provisions and caches the Israel market resource chain.
pub struct Provisioner {
    client: Arc<StorefrontClient>,
    resources: OnceCell<IsraelMarketResources>,
}

impl Provisioner {
    pub fn new(client: Arc<StorefrontClient>) -> Self {
        Self {
            client,
            resources: OnceCell::new(),
        }
    }

    /// The provisioned resource chain, building it on first use.
    ///
    /// Concurrent callers during the first invocation share one
    /// provisioning pass; a failed pass is retried by the next caller.
    pub async fn ensure(&self) -> Result<IsraelMarketResources> {
        let resources = self.resources.get_or_try_init(|| self.provision()).await?;
        Ok(resources.clone())
    }

    async fn provision(&self) -> Result<IsraelMarketResources> {
        let market = self.ensure_market().await?;
        let catalog = self.ensure_catalog(&market).await?;
        self.ensure_attachment(&market.id, &catalog.id).await?;
        let (publication_id, price_list_id) =
            self.ensure_publication_and_price_list(&catalog.id).await?;

        let resources = IsraelMarketResources {
            market_id: market.id,
            catalog_id: catalog.id,
            publication_id,
            price_list_id,
        };
        self.verify(&resources).await?;

        tracing::info!(
            market_id = %resources.market_id,
            catalog_id = %resources.catalog_id,
            publication_id = %resources.publication_id,
            price_list_id = %resources.price_list_id,
            "Israel market resources ready"
        );
        Ok(resources)
    }

    async fn ensure_market(&self) -> Result<MarketSummary> {
        let market = match self.client.find_israel_market().await? {
            Some(found) => {
                tracing::info!(market_id = %found.id, "Israel market found");
                found
            }
            None => {
                let created = self.client.create_israel_market().await?;
                tracing::info!(market_id = %created.id, "Israel market created");
                created
            }
        };

        if !market.currency_code.eq_ignore_ascii_case(CURRENCY_ILS) || market.local_currencies {
            tracing::info!(
                market_id = %market.id,
                currency = %market.currency_code,
                local_currencies = market.local_currencies,
                "Correcting Israel market currency settings"
            );
            self.client.update_market_currency_to_ils(&market.id).await?;
        }
        if !market.enabled {
            tracing::warn!(market_id = %market.id, "Israel market is disabled");
        }
        Ok(market)
    }

    async fn ensure_catalog(&self, market: &MarketSummary) -> Result<CatalogNode> {
        match self.client.find_israel_catalog().await? {
            Some(found) => {
                tracing::info!(catalog_id = %found.id, "Israel catalog found");
                Ok(found)
            }
            None => {
                let created = self.client.create_israel_catalog(&market.id).await?;
                tracing::info!(catalog_id = %created.id, "Israel catalog created");
                Ok(created)
            }
        }
    }

    /// Attachment is confirmed by re-query, not assumed from the mutation.
    async fn ensure_attachment(&self, market_id: &str, catalog_id: &str) -> Result<()> {
        if self.client.market_has_catalog(market_id, catalog_id).await? {
            return Ok(());
        }
        self.client
            .attach_catalog_to_market(market_id, catalog_id)
            .await?;
        if self.client.market_has_catalog(market_id, catalog_id).await? {
            tracing::info!(market_id, catalog_id, "Catalog attached to market");
            return Ok(());
        }
        Err(SyncError::Provisioning(format!(
            "market {market_id} missing catalog {catalog_id} after attach"
        )))
    }

    async fn ensure_publication_and_price_list(
        &self,
        catalog_id: &str,
    ) -> Result<(String, String)> {
        let details = self.client.catalog_details(catalog_id).await?;

        let publication_id = match details.publication {
            Some(publication) if !publication.id.trim().is_empty() => {
                if !publication.auto_publish {
                    tracing::info!(
                        publication_id = %publication.id,
                        "Enabling auto-publish on catalog publication"
                    );
                    self.client
                        .enable_publication_auto_publish(&publication.id)
                        .await?;
                }
                publication.id
            }
            _ => {
                let created = self.client.create_catalog_publication(catalog_id).await?;
                tracing::info!(publication_id = %created.id, "Catalog publication created");
                created.id
            }
        };

        let price_list_id = match details.price_list {
            Some(list)
                if !list.id.trim().is_empty()
                    && list.currency.eq_ignore_ascii_case(CURRENCY_ILS) =>
            {
                list.id
            }
            Some(list) => {
                tracing::warn!(
                    price_list_id = %list.id,
                    currency = %list.currency,
                    "Catalog price list has wrong currency, creating an ILS list"
                );
                let created = self.client.create_israel_price_list(catalog_id).await?;
                created.id
            }
            None => {
                let created = self.client.create_israel_price_list(catalog_id).await?;
                tracing::info!(price_list_id = %created.id, "Israel price list created");
                created.id
            }
        };

        Ok((publication_id, price_list_id))
    }

    /// No partial resource set is ever returned: any inconsistency found
    /// here fails the whole provisioning call.
    async fn verify(&self, resources: &IsraelMarketResources) -> Result<()> {
        if resources.market_id.trim().is_empty()
            || resources.catalog_id.trim().is_empty()
            || resources.publication_id.trim().is_empty()
            || resources.price_list_id.trim().is_empty()
        {
            return Err(SyncError::Provisioning(
                "provisioning produced an empty resource id".to_string(),
            ));
        }

        if !self
            .client
            .market_has_catalog(&resources.market_id, &resources.catalog_id)
            .await?
        {
            return Err(SyncError::Provisioning(format!(
                "market {} missing catalog {}",
                resources.market_id, resources.catalog_id
            )));
        }

        let details = self.client.catalog_details(&resources.catalog_id).await?;
        let publication_ready = details
            .publication
            .as_ref()
            .is_some_and(|publication| !publication.id.trim().is_empty() && publication.auto_publish);
        if !publication_ready {
            return Err(SyncError::Provisioning(
                "catalog publication is missing or not auto-publishing".to_string(),
            ));
        }

        let price_list_ready = details.price_list.as_ref().is_some_and(|list| {
            !list.id.trim().is_empty() && list.currency.eq_ignore_ascii_case(CURRENCY_ILS)
        });
        if !price_list_ready {
            return Err(SyncError::Provisioning(
                "catalog price list is missing or not ILS".to_string(),
            ));
        }

        Ok(())
    }
}
