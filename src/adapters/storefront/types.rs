//! Storefront API wire models
//!
//! Node and input types shared by the storefront capability modules, plus
//! the small helpers every GraphQL call site leans on: search-query
//! escaping, money formatting, and `userErrors` checking. Payload wrappers
//! that only one operation reads are declared next to that operation.

use crate::domain::{format_user_errors, Result, StorefrontError, UserError};
use serde::Deserialize;

/// Page size for the destructive-cleanup listings.
pub(crate) const WIPE_PAGE_SIZE: u32 = 50;

/// Relay-style page info returned by paginated connections.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageInfo {
    #[serde(default, rename = "hasNextPage")]
    pub has_next_page: bool,
    #[serde(default, rename = "endCursor")]
    pub end_cursor: String,
}

impl PageInfo {
    /// Next cursor to request, or `None` when the connection is exhausted.
    pub fn next_cursor(&self) -> Option<String> {
        let cursor = self.end_cursor.trim();
        if self.has_next_page && !cursor.is_empty() {
            Some(cursor.to_string())
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CollectionNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MarketNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "currencySettings")]
    pub currency_settings: MarketCurrencySettings,
    #[serde(default)]
    pub regions: RegionConnection,
}

impl MarketNode {
    /// True when one of the market's regions is the given country code.
    pub fn includes_country(&self, country_code: &str) -> bool {
        self.regions
            .nodes
            .iter()
            .any(|region| region.code.trim().eq_ignore_ascii_case(country_code.trim()))
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MarketCurrencySettings {
    #[serde(default, rename = "baseCurrency")]
    pub base_currency: BaseCurrency,
    #[serde(default, rename = "localCurrencies")]
    pub local_currencies: bool,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BaseCurrency {
    #[serde(default, rename = "currencyCode")]
    pub currency_code: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RegionConnection {
    #[serde(default)]
    pub nodes: Vec<RegionNode>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RegionNode {
    #[serde(default)]
    pub code: String,
}

/// Flattened view of a market, as the provisioning chain consumes it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarketSummary {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub enabled: bool,
    pub currency_code: String,
    pub local_currencies: bool,
}

impl From<MarketNode> for MarketSummary {
    fn from(node: MarketNode) -> Self {
        Self {
            id: node.id.trim().to_string(),
            name: node.name.trim().to_string(),
            handle: node.handle.trim().to_string(),
            enabled: node.enabled,
            currency_code: node.currency_settings.base_currency.currency_code.trim().to_string(),
            local_currencies: node.currency_settings.local_currencies,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CatalogNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PublicationNode {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "autoPublish")]
    pub auto_publish: bool,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PriceListNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LocationNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "isActive")]
    pub is_active: bool,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductRef {
    #[serde(default)]
    pub id: String,
}

/// Variant node from SKU searches.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct VariantNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub product: ProductRef,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct InventoryItemNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tracked: bool,
}

/// Variant node from inventory lookups; the item is absent on malformed
/// variants and callers must treat that as an error.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct InventoryVariantNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default, rename = "inventoryItem")]
    pub inventory_item: Option<InventoryItemNode>,
}

/// Resolved inventory coordinates for one SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItemRef {
    pub variant_id: String,
    pub inventory_item_id: String,
    pub tracked: bool,
}

/// One on-hand quantity write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnHandQuantity {
    pub inventory_item_id: String,
    pub quantity: i32,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MetafieldNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, rename = "type")]
    pub value_type: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MetafieldDefinitionNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TranslatableContentEntry {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub locale: String,
}

/// One metafield write for a product, bilingual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMetafieldInput {
    pub namespace: String,
    pub key: String,
    pub value_english: String,
    pub value_hebrew: String,
}

/// One metafield definition to ensure, bilingual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMetafieldDefinitionInput {
    pub namespace: String,
    pub key: String,
    pub name_english: String,
    pub name_hebrew: String,
}

/// One variant price write, in whichever currency the call site implies.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPrice {
    pub variant_id: String,
    pub amount: f64,
}

/// One position move inside a manually sorted collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMove {
    pub product_id: String,
    pub position: i64,
}

/// Build a `field:value` search query, quoting values that contain spaces
/// or quotes so the search syntax survives.
pub fn build_search_query(field: &str, value: &str) -> String {
    let value = value.trim();
    if value.contains(' ') || value.contains('"') {
        let escaped = value.replace('"', "\\\"");
        format!("{field}:\"{escaped}\"")
    } else {
        format!("{field}:{value}")
    }
}

/// Money amounts cross the wire as strings with exactly two decimals.
pub fn format_money(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Turn a mutation's `userErrors` into an error, dropping entries with
/// blank messages the way the API sometimes pads them.
pub fn check_user_errors(action: &str, errors: Vec<UserError>) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }

    let mut detailed: Vec<UserError> = errors
        .into_iter()
        .filter(|entry| !entry.message.trim().is_empty())
        .collect();
    if detailed.is_empty() {
        detailed.push(UserError {
            field: None,
            message: "user errors returned".to_string(),
        });
    }

    tracing::error!(
        action,
        errors = %format_user_errors(&detailed),
        "Storefront mutation returned user errors"
    );
    Err(StorefrontError::UserErrors(detailed).into())
}
