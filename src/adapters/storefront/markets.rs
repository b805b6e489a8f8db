//! Market, catalog, publication, and price list operations
//!
//! Primitives behind the Israel market provisioning chain: find or create
//! the IL market, keep its base currency on ILS, attach the Israel catalog,
//! and stand up the catalog's publication and ILS price list. The ensure
//! ordering and caching live in the core provisioner; this module only
//! talks wire shapes.

use super::client::StorefrontClient;
use super::types::{
    build_search_query, check_user_errors, CatalogNode, MarketNode, MarketSummary, PageInfo,
    PriceListNode, PublicationNode, WIPE_PAGE_SIZE,
};
use crate::domain::{Result, StorefrontError, UserError};
use serde::Deserialize;
use serde_json::json;

pub(crate) const ISRAEL_MARKET_NAME: &str = "Israel";
pub(crate) const ISRAEL_MARKET_HANDLE: &str = "il";
pub(crate) const ISRAEL_CATALOG_TITLE: &str = "Israel Catalog";
pub(crate) const ISRAEL_PRICE_LIST_NAME: &str = "Israel ILS";
pub(crate) const MARKET_REGION_IL: &str = "IL";
pub(crate) const CURRENCY_ILS: &str = "ILS";

const MARKETS_PAGE_SIZE: u32 = 50;
const MARKET_CATALOGS_PAGE_SIZE: u32 = 50;
const CATALOG_SEARCH_LIMIT: u32 = 5;

/// Publication and price list attached to a catalog, either possibly
/// missing on a fresh catalog.
#[derive(Debug, Default, Clone)]
pub struct CatalogDetails {
    pub publication: Option<PublicationNode>,
    pub price_list: Option<PriceListNode>,
}

#[derive(Deserialize)]
struct MarketsPageData {
    markets: MarketsPage,
}

#[derive(Default, Deserialize)]
struct MarketsPage {
    #[serde(default)]
    nodes: Vec<MarketNode>,
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct MarketMutationPayload {
    #[serde(default)]
    market: Option<MarketNode>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct MarketCreateData {
    #[serde(rename = "marketCreate")]
    market_create: MarketMutationPayload,
}

#[derive(Deserialize)]
struct MarketUpdateData {
    #[serde(rename = "marketUpdate")]
    market_update: MarketMutationPayload,
}

#[derive(Deserialize)]
struct CatalogsData {
    catalogs: CatalogsConnection,
}

#[derive(Default, Deserialize)]
struct CatalogsConnection {
    #[serde(default)]
    nodes: Vec<CatalogNode>,
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct CatalogCreateData {
    #[serde(rename = "catalogCreate")]
    catalog_create: CatalogCreatePayload,
}

#[derive(Deserialize)]
struct CatalogCreatePayload {
    #[serde(default)]
    catalog: Option<CatalogNode>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Default, Deserialize)]
struct MarketCatalogsData {
    #[serde(default)]
    market: Option<MarketCatalogsNode>,
}

#[derive(Default, Deserialize)]
struct MarketCatalogsNode {
    #[serde(default)]
    id: String,
    #[serde(default)]
    catalogs: CatalogsConnection,
}

#[derive(Default, Deserialize)]
struct CatalogDetailsData {
    #[serde(default)]
    catalog: Option<CatalogDetailsNode>,
}

#[derive(Default, Deserialize)]
struct CatalogDetailsNode {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    publication: Option<PublicationNode>,
    #[serde(default, rename = "priceList")]
    price_list: Option<PriceListNode>,
}

#[derive(Deserialize)]
struct PublicationPayload {
    #[serde(default)]
    publication: Option<PublicationNode>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct PublicationCreateData {
    #[serde(rename = "publicationCreate")]
    publication_create: PublicationPayload,
}

#[derive(Deserialize)]
struct PublicationUpdateData {
    #[serde(rename = "publicationUpdate")]
    publication_update: PublicationPayload,
}

#[derive(Deserialize)]
struct PriceListCreateData {
    #[serde(rename = "priceListCreate")]
    price_list_create: PriceListCreatePayload,
}

#[derive(Deserialize)]
struct PriceListCreatePayload {
    #[serde(default, rename = "priceList")]
    price_list: Option<PriceListNode>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct DeletePayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct CatalogDeleteData {
    #[serde(rename = "catalogDelete")]
    catalog_delete: DeletePayload,
}

#[derive(Deserialize)]
struct MarketDeleteData {
    #[serde(rename = "marketDelete")]
    market_delete: DeletePayload,
}

impl StorefrontClient {
    /// Every market on the shop, regions included.
    pub async fn list_markets(&self) -> Result<Vec<MarketNode>> {
        let query = r#"
            query listMarkets($first: Int!, $after: String) {
                markets(first: $first, after: $after) {
                    nodes {
                        id
                        name
                        handle
                        enabled
                        currencySettings {
                            baseCurrency { currencyCode }
                            localCurrencies
                        }
                        regions(first: 250) {
                            nodes {
                                ... on MarketRegionCountry {
                                    code
                                }
                            }
                        }
                    }
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                }
            }
        "#;

        let mut markets = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let data: MarketsPageData = self
                .transport
                .execute(
                    query,
                    json!({ "first": MARKETS_PAGE_SIZE, "after": after.as_deref() }),
                )
                .await?;
            let next = data.markets.page_info.next_cursor();
            markets.extend(data.markets.nodes);
            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }
        Ok(markets)
    }

    /// First market whose regions include Israel. More than one match is
    /// logged and the first is kept.
    pub async fn find_israel_market(&self) -> Result<Option<MarketSummary>> {
        let markets = self.list_markets().await?;

        let mut found: Option<MarketSummary> = None;
        for market in markets {
            if !market.includes_country(MARKET_REGION_IL) {
                continue;
            }
            match &found {
                None => found = Some(MarketSummary::from(market)),
                Some(kept) => {
                    tracing::warn!(
                        kept = %kept.id,
                        ignored = %market.id,
                        "Multiple markets include IL, keeping the first"
                    );
                    break;
                }
            }
        }
        Ok(found)
    }

    /// Create the Israel market: IL region, ILS base currency, no local
    /// currency conversion.
    pub async fn create_israel_market(&self) -> Result<MarketSummary> {
        let query = r#"
            mutation marketCreate($input: MarketCreateInput!) {
                marketCreate(input: $input) {
                    market {
                        id
                        name
                        handle
                        enabled
                        currencySettings {
                            baseCurrency { currencyCode }
                            localCurrencies
                        }
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: MarketCreateData = self
            .transport
            .execute(
                query,
                json!({
                    "input": {
                        "name": ISRAEL_MARKET_NAME,
                        "handle": ISRAEL_MARKET_HANDLE,
                        "regionsCondition": { "countryCodes": [MARKET_REGION_IL] },
                        "currencySettings": {
                            "baseCurrency": CURRENCY_ILS,
                            "localCurrencies": false,
                        },
                    }
                }),
            )
            .await?;
        check_user_errors("marketCreate", data.market_create.user_errors)?;

        let summary = MarketSummary::from(data.market_create.market.unwrap_or_default());
        if summary.id.is_empty() {
            return Err(StorefrontError::InvalidResponse(
                "market create returned empty id".to_string(),
            )
            .into());
        }
        Ok(summary)
    }

    /// Reset a market's base currency to ILS with local currencies off.
    pub async fn update_market_currency_to_ils(&self, market_id: &str) -> Result<()> {
        let query = r#"
            mutation marketUpdate($id: ID!, $input: MarketUpdateInput!) {
                marketUpdate(id: $id, input: $input) {
                    market { id }
                    userErrors { field message }
                }
            }
        "#;
        let data: MarketUpdateData = self
            .transport
            .execute(
                query,
                json!({
                    "id": market_id,
                    "input": {
                        "currencySettings": {
                            "baseCurrency": CURRENCY_ILS,
                            "localCurrencies": false,
                        }
                    }
                }),
            )
            .await?;
        check_user_errors("marketUpdate", data.market_update.user_errors)
    }

    pub async fn attach_catalog_to_market(&self, market_id: &str, catalog_id: &str) -> Result<()> {
        let query = r#"
            mutation marketUpdate($id: ID!, $input: MarketUpdateInput!) {
                marketUpdate(id: $id, input: $input) {
                    market { id }
                    userErrors { field message }
                }
            }
        "#;
        let data: MarketUpdateData = self
            .transport
            .execute(
                query,
                json!({ "id": market_id, "input": { "catalogsToAdd": [catalog_id] } }),
            )
            .await?;
        check_user_errors("marketUpdate", data.market_update.user_errors)
    }

    /// Whether the market already lists this catalog.
    pub async fn market_has_catalog(&self, market_id: &str, catalog_id: &str) -> Result<bool> {
        let query = r#"
            query marketCatalogs($id: ID!, $first: Int!, $after: String) {
                market(id: $id) {
                    id
                    catalogs(first: $first, after: $after) {
                        nodes {
                            id
                            title
                        }
                        pageInfo {
                            hasNextPage
                            endCursor
                        }
                    }
                }
            }
        "#;

        let mut after: Option<String> = None;
        loop {
            let data: MarketCatalogsData = self
                .transport
                .execute(
                    query,
                    json!({
                        "id": market_id,
                        "first": MARKET_CATALOGS_PAGE_SIZE,
                        "after": after.as_deref(),
                    }),
                )
                .await?;
            let Some(market) = data.market else {
                return Ok(false);
            };
            if market
                .catalogs
                .nodes
                .iter()
                .any(|node| node.id.eq_ignore_ascii_case(catalog_id))
            {
                return Ok(true);
            }
            match market.catalogs.page_info.next_cursor() {
                Some(cursor) => after = Some(cursor),
                None => return Ok(false),
            }
        }
    }

    /// The Israel catalog, found by title.
    pub async fn find_israel_catalog(&self) -> Result<Option<CatalogNode>> {
        let query = r#"
            query catalogsByTitle($first: Int!, $query: String!) {
                catalogs(first: $first, query: $query) {
                    nodes {
                        id
                        title
                        status
                    }
                }
            }
        "#;
        let data: CatalogsData = self
            .transport
            .execute(
                query,
                json!({
                    "first": CATALOG_SEARCH_LIMIT,
                    "query": build_search_query("title", ISRAEL_CATALOG_TITLE),
                }),
            )
            .await?;

        Ok(data
            .catalogs
            .nodes
            .into_iter()
            .find(|node| node.title.trim().eq_ignore_ascii_case(ISRAEL_CATALOG_TITLE)))
    }

    /// Create the Israel catalog, active and scoped to the market.
    pub async fn create_israel_catalog(&self, market_id: &str) -> Result<CatalogNode> {
        let query = r#"
            mutation catalogCreate($input: CatalogCreateInput!) {
                catalogCreate(input: $input) {
                    catalog {
                        id
                        title
                        status
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: CatalogCreateData = self
            .transport
            .execute(
                query,
                json!({
                    "input": {
                        "title": ISRAEL_CATALOG_TITLE,
                        "status": "ACTIVE",
                        "context": { "marketIds": [market_id] },
                    }
                }),
            )
            .await?;
        check_user_errors("catalogCreate", data.catalog_create.user_errors)?;

        let catalog = data.catalog_create.catalog.unwrap_or_default();
        if catalog.id.trim().is_empty() {
            return Err(StorefrontError::InvalidResponse(
                "catalog create returned empty id".to_string(),
            )
            .into());
        }
        Ok(catalog)
    }

    /// Publication and price list currently attached to a catalog.
    pub async fn catalog_details(&self, catalog_id: &str) -> Result<CatalogDetails> {
        let query = r#"
            query catalogDetails($id: ID!) {
                catalog(id: $id) {
                    id
                    title
                    publication {
                        id
                        autoPublish
                    }
                    priceList {
                        id
                        name
                        currency
                    }
                }
            }
        "#;
        let data: CatalogDetailsData = self
            .transport
            .execute(query, json!({ "id": catalog_id }))
            .await?;

        let Some(catalog) = data.catalog else {
            return Err(StorefrontError::InvalidResponse("catalog not found".to_string()).into());
        };
        Ok(CatalogDetails {
            publication: catalog.publication,
            price_list: catalog.price_list,
        })
    }

    /// Publish the whole product range through the catalog, auto-publishing
    /// new products as they appear.
    pub async fn create_catalog_publication(&self, catalog_id: &str) -> Result<PublicationNode> {
        let query = r#"
            mutation publicationCreate($input: PublicationCreateInput!) {
                publicationCreate(input: $input) {
                    publication {
                        id
                        autoPublish
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: PublicationCreateData = self
            .transport
            .execute(
                query,
                json!({
                    "input": {
                        "catalogId": catalog_id,
                        "defaultState": "ALL_PRODUCTS",
                        "autoPublish": true,
                    }
                }),
            )
            .await?;
        check_user_errors("publicationCreate", data.publication_create.user_errors)?;

        let publication = data.publication_create.publication.unwrap_or_default();
        if publication.id.trim().is_empty() {
            return Err(StorefrontError::InvalidResponse(
                "publication create returned empty id".to_string(),
            )
            .into());
        }
        Ok(publication)
    }

    pub async fn enable_publication_auto_publish(
        &self,
        publication_id: &str,
    ) -> Result<PublicationNode> {
        let query = r#"
            mutation publicationUpdate($id: ID!, $input: PublicationUpdateInput!) {
                publicationUpdate(id: $id, input: $input) {
                    publication {
                        id
                        autoPublish
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: PublicationUpdateData = self
            .transport
            .execute(
                query,
                json!({ "id": publication_id, "input": { "autoPublish": true } }),
            )
            .await?;
        check_user_errors("publicationUpdate", data.publication_update.user_errors)?;
        Ok(data.publication_update.publication.unwrap_or_default())
    }

    /// ILS price list for the catalog, pinned to the base price (zero
    /// percent adjustment) so fixed prices are the only source of change.
    pub async fn create_israel_price_list(&self, catalog_id: &str) -> Result<PriceListNode> {
        let query = r#"
            mutation priceListCreate($input: PriceListCreateInput!) {
                priceListCreate(input: $input) {
                    priceList {
                        id
                        name
                        currency
                    }
                    userErrors { field message }
                }
            }
        "#;
        let data: PriceListCreateData = self
            .transport
            .execute(
                query,
                json!({
                    "input": {
                        "catalogId": catalog_id,
                        "name": ISRAEL_PRICE_LIST_NAME,
                        "currency": CURRENCY_ILS,
                        "parent": {
                            "adjustment": { "type": "PERCENTAGE_INCREASE", "value": 0 }
                        },
                    }
                }),
            )
            .await?;
        check_user_errors("priceListCreate", data.price_list_create.user_errors)?;

        let price_list = data.price_list_create.price_list.unwrap_or_default();
        if price_list.id.trim().is_empty() {
            return Err(StorefrontError::InvalidResponse(
                "price list create returned empty id".to_string(),
            )
            .into());
        }
        Ok(price_list)
    }

    /// One page of catalog ids, for destructive cleanup.
    pub async fn list_catalog_ids_page(
        &self,
        after: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let query = r#"
            query listCatalogs($first: Int!, $after: String) {
                catalogs(first: $first, after: $after) {
                    nodes {
                        id
                        title
                        status
                    }
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                }
            }
        "#;
        let data: CatalogsData = self
            .transport
            .execute(query, json!({ "first": WIPE_PAGE_SIZE, "after": after }))
            .await?;

        let next = data.catalogs.page_info.next_cursor();
        let ids = data.catalogs.nodes.into_iter().map(|node| node.id).collect();
        Ok((ids, next))
    }

    pub async fn delete_catalog(&self, catalog_id: &str) -> Result<()> {
        let query = r#"
            mutation catalogDelete($id: ID!) {
                catalogDelete(id: $id) {
                    deletedId
                    userErrors { field message }
                }
            }
        "#;
        let data: CatalogDeleteData = self
            .transport
            .execute(query, json!({ "id": catalog_id }))
            .await?;
        check_user_errors("catalogDelete", data.catalog_delete.user_errors)
    }

    pub async fn delete_market(&self, market_id: &str) -> Result<()> {
        let query = r#"
            mutation marketDelete($id: ID!) {
                marketDelete(id: $id) {
                    deletedId
                    userErrors { field message }
                }
            }
        "#;
        let data: MarketDeleteData = self
            .transport
            .execute(query, json!({ "id": market_id }))
            .await?;
        check_user_errors("marketDelete", data.market_delete.user_errors)
    }
}
