//! Variant pricing operations
//!
//! Base (USD) prices go through the product variant bulk mutation, grouped
//! per product by the caller. ILS prices are written as fixed entries on
//! the Israel price list so they do not track the base price.

use super::client::StorefrontClient;
use super::markets::CURRENCY_ILS;
use super::types::{
    check_user_errors, format_money, PageInfo, PriceListNode, VariantPrice, WIPE_PAGE_SIZE,
};
use crate::domain::{Result, UserError};
use serde::Deserialize;
use serde_json::json;

const PRICE_BATCH_SIZE: usize = 250;

#[derive(Deserialize)]
struct VariantsBulkUpdateData {
    #[serde(rename = "productVariantsBulkUpdate")]
    bulk_update: UserErrorsPayload,
}

#[derive(Deserialize)]
struct FixedPricesAddData {
    #[serde(rename = "priceListFixedPricesAdd")]
    fixed_prices_add: UserErrorsPayload,
}

#[derive(Deserialize)]
struct PriceListDeleteData {
    #[serde(rename = "priceListDelete")]
    price_list_delete: UserErrorsPayload,
}

#[derive(Deserialize)]
struct UserErrorsPayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct PriceListsPageData {
    #[serde(rename = "priceLists")]
    price_lists: PriceListsPage,
}

#[derive(Default, Deserialize)]
struct PriceListsPage {
    #[serde(default)]
    nodes: Vec<PriceListNode>,
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
}

impl StorefrontClient {
    /// Set base prices for variants of a single product.
    pub async fn update_variant_base_prices(
        &self,
        product_id: &str,
        prices: &[VariantPrice],
    ) -> Result<()> {
        if prices.is_empty() {
            return Ok(());
        }
        let query = r#"
            mutation productVariantsBulkUpdate($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
                productVariantsBulkUpdate(productId: $productId, variants: $variants) {
                    userErrors { field message }
                }
            }
        "#;

        for chunk in prices.chunks(PRICE_BATCH_SIZE) {
            let variants: Vec<serde_json::Value> = chunk
                .iter()
                .map(|price| {
                    json!({ "id": price.variant_id, "price": format_money(price.amount) })
                })
                .collect();
            let data: VariantsBulkUpdateData = self
                .transport
                .execute(
                    query,
                    json!({ "productId": product_id, "variants": variants }),
                )
                .await?;
            check_user_errors("productVariantsBulkUpdate", data.bulk_update.user_errors)?;
            tracing::debug!(
                product_id,
                count = chunk.len(),
                "Updated variant base prices"
            );
        }
        Ok(())
    }

    /// Pin ILS amounts on the price list as fixed prices.
    pub async fn add_fixed_ils_prices(
        &self,
        price_list_id: &str,
        prices: &[VariantPrice],
    ) -> Result<()> {
        if prices.is_empty() {
            return Ok(());
        }
        let query = r#"
            mutation priceListFixedPricesAdd($priceListId: ID!, $prices: [PriceListPriceInput!]!) {
                priceListFixedPricesAdd(priceListId: $priceListId, prices: $prices) {
                    userErrors { field message }
                }
            }
        "#;

        for chunk in prices.chunks(PRICE_BATCH_SIZE) {
            let entries: Vec<serde_json::Value> = chunk
                .iter()
                .map(|price| {
                    json!({
                        "variantId": price.variant_id,
                        "price": {
                            "amount": format_money(price.amount),
                            "currencyCode": CURRENCY_ILS,
                        },
                    })
                })
                .collect();
            let data: FixedPricesAddData = self
                .transport
                .execute(
                    query,
                    json!({ "priceListId": price_list_id, "prices": entries }),
                )
                .await?;
            check_user_errors("priceListFixedPricesAdd", data.fixed_prices_add.user_errors)?;
            tracing::debug!(
                price_list_id,
                count = chunk.len(),
                "Added fixed ILS prices"
            );
        }
        Ok(())
    }

    /// One page of price list ids, for destructive cleanup.
    pub async fn list_price_list_ids_page(
        &self,
        after: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let query = r#"
            query listPriceLists($first: Int!, $after: String) {
                priceLists(first: $first, after: $after) {
                    nodes {
                        id
                        name
                        currency
                    }
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                }
            }
        "#;
        let data: PriceListsPageData = self
            .transport
            .execute(query, json!({ "first": WIPE_PAGE_SIZE, "after": after }))
            .await?;

        let next = data.price_lists.page_info.next_cursor();
        let ids = data
            .price_lists
            .nodes
            .into_iter()
            .map(|node| node.id)
            .collect();
        Ok((ids, next))
    }

    pub async fn delete_price_list(&self, price_list_id: &str) -> Result<()> {
        let query = r#"
            mutation priceListDelete($id: ID!) {
                priceListDelete(id: $id) {
                    deletedId
                    userErrors { field message }
                }
            }
        "#;
        let data: PriceListDeleteData = self
            .transport
            .execute(query, json!({ "id": price_list_id }))
            .await?;
        check_user_errors("priceListDelete", data.price_list_delete.user_errors)
    }
}
