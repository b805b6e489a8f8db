//! Product operations
//!
//! Creating and updating products also writes the primary variant's SKU and
//! barcode, since the storefront only exposes those through a separate
//! variant mutation.

use super::client::StorefrontClient;
use super::types::{
    build_search_query, check_user_errors, PageInfo, VariantNode, WIPE_PAGE_SIZE,
};
use crate::domain::{Product, Result, StorefrontError, SyncError, UserError};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
struct ProductPayloadRef {
    #[serde(default)]
    id: String,
}

#[derive(Deserialize)]
struct ProductMutationPayload {
    #[serde(default)]
    product: Option<ProductPayloadRef>,
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct ProductCreateData {
    #[serde(rename = "productCreate")]
    product_create: ProductMutationPayload,
}

#[derive(Deserialize)]
struct ProductUpdateData {
    #[serde(rename = "productUpdate")]
    product_update: ProductMutationPayload,
}

#[derive(Deserialize)]
struct VariantSearchData {
    #[serde(rename = "productVariants")]
    product_variants: VariantConnection,
}

#[derive(Default, Deserialize)]
struct VariantConnection {
    #[serde(default)]
    nodes: Vec<VariantNode>,
}

#[derive(Default, Deserialize)]
struct ProductVariantsData {
    #[serde(default)]
    product: Option<ProductWithVariants>,
}

#[derive(Default, Deserialize)]
struct ProductWithVariants {
    #[serde(default)]
    variants: VariantIdConnection,
}

#[derive(Default, Deserialize)]
struct VariantIdConnection {
    #[serde(default)]
    nodes: Vec<IdNode>,
}

#[derive(Default, Deserialize)]
struct IdNode {
    #[serde(default)]
    id: String,
}

#[derive(Deserialize)]
struct VariantsBulkUpdateData {
    #[serde(rename = "productVariantsBulkUpdate")]
    bulk_update: BulkUpdatePayload,
}

#[derive(Deserialize)]
struct BulkUpdatePayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct ProductsPageData {
    products: ProductsPage,
}

#[derive(Default, Deserialize)]
struct ProductsPage {
    #[serde(default)]
    nodes: Vec<IdNode>,
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct ProductDeleteData {
    #[serde(rename = "productDelete")]
    product_delete: ProductDeletePayload,
}

#[derive(Deserialize)]
struct ProductDeletePayload {
    #[serde(default, rename = "userErrors")]
    user_errors: Vec<UserError>,
}

impl StorefrontClient {
    /// Create a product and stamp its primary variant with the SKU and
    /// barcode. Returns the new product id.
    pub async fn create_product(&self, product: &Product) -> Result<String> {
        let title = product.english_title.trim();
        if title.is_empty() {
            return Err(SyncError::Validation("product title is required".to_string()));
        }

        let mut input = json!({
            "title": title,
            "status": product_status(product.is_published),
        });
        let description = product.description.trim();
        if !description.is_empty() {
            input["descriptionHtml"] = json!(description);
        }

        let query = r#"
            mutation productCreate($input: ProductInput!) {
                productCreate(input: $input) {
                    product { id }
                    userErrors { field message }
                }
            }
        "#;
        let data: ProductCreateData = self
            .transport
            .execute(query, json!({ "input": input }))
            .await?;
        check_user_errors("productCreate", data.product_create.user_errors)?;

        let product_id = data
            .product_create
            .product
            .unwrap_or_default()
            .id
            .trim()
            .to_string();
        if product_id.is_empty() {
            return Err(StorefrontError::InvalidResponse(
                "product create returned empty product id".to_string(),
            )
            .into());
        }

        self.update_primary_variant_identifiers(&product_id, product)
            .await?;
        Ok(product_id)
    }

    /// Update an existing product's title, description, and status, then
    /// refresh the primary variant identifiers.
    pub async fn update_product(&self, product_id: &str, product: &Product) -> Result<()> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(SyncError::Validation("product id is required".to_string()));
        }

        let mut input = json!({
            "id": product_id,
            "status": product_status(product.is_published),
        });
        let title = product.english_title.trim();
        if !title.is_empty() {
            input["title"] = json!(title);
        }
        let description = product.description.trim();
        if !description.is_empty() {
            input["descriptionHtml"] = json!(description);
        }

        let query = r#"
            mutation productUpdate($input: ProductInput!) {
                productUpdate(input: $input) {
                    product { id }
                    userErrors { field message }
                }
            }
        "#;
        let data: ProductUpdateData = self
            .transport
            .execute(query, json!({ "input": input }))
            .await?;
        check_user_errors("productUpdate", data.product_update.user_errors)?;

        self.update_primary_variant_identifiers(product_id, product)
            .await
    }

    /// Product id owning the variant with this SKU, if any.
    pub async fn find_product_by_sku(&self, sku: &str) -> Result<Option<String>> {
        let hit = self.variant_by_sku(sku).await?;
        Ok(hit
            .map(|node| node.product.id.trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    /// Primary variant matching a SKU, if any. When several variants share
    /// the SKU the first search hit wins; the platform does not define that
    /// ordering.
    pub(crate) async fn variant_by_sku(&self, sku: &str) -> Result<Option<VariantNode>> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Ok(None);
        }

        let query = r#"
            query productVariantBySku($first: Int!, $query: String!) {
                productVariants(first: $first, query: $query) {
                    nodes {
                        id
                        sku
                        product { id }
                    }
                }
            }
        "#;
        let data: VariantSearchData = self
            .transport
            .execute(
                query,
                json!({
                    "first": 1,
                    "query": build_search_query("sku", sku),
                }),
            )
            .await?;

        Ok(data
            .product_variants
            .nodes
            .into_iter()
            .next()
            .filter(|node| !node.id.trim().is_empty()))
    }

    /// Move a product to DRAFT so it disappears from the storefront.
    pub async fn unpublish_product(&self, product_id: &str) -> Result<()> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(SyncError::Validation("product id is required".to_string()));
        }

        let query = r#"
            mutation productUpdate($input: ProductInput!) {
                productUpdate(input: $input) {
                    product { id }
                    userErrors { field message }
                }
            }
        "#;
        let data: ProductUpdateData = self
            .transport
            .execute(
                query,
                json!({ "input": { "id": product_id, "status": "DRAFT" } }),
            )
            .await?;
        check_user_errors("productUpdate", data.product_update.user_errors)
    }

    /// One page of product ids, for destructive cleanup.
    pub async fn list_product_ids_page(
        &self,
        after: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let query = r#"
            query listProducts($first: Int!, $after: String) {
                products(first: $first, after: $after) {
                    nodes { id }
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                }
            }
        "#;
        let data: ProductsPageData = self
            .transport
            .execute(query, json!({ "first": WIPE_PAGE_SIZE, "after": after }))
            .await?;

        let ids = data
            .products
            .nodes
            .into_iter()
            .map(|node| node.id)
            .collect();
        Ok((ids, data.products.page_info.next_cursor()))
    }

    pub async fn delete_product(&self, product_id: &str) -> Result<()> {
        let query = r#"
            mutation productDelete($input: ProductDeleteInput!) {
                productDelete(input: $input) {
                    deletedProductId
                    userErrors { field message }
                }
            }
        "#;
        let data: ProductDeleteData = self
            .transport
            .execute(query, json!({ "input": { "id": product_id } }))
            .await?;
        check_user_errors("productDelete", data.product_delete.user_errors)
    }

    /// Write the SKU and barcode onto the product's primary variant.
    async fn update_primary_variant_identifiers(
        &self,
        product_id: &str,
        product: &Product,
    ) -> Result<()> {
        let sku = product.sku.trim();
        let barcode = product.barcode.trim();
        if sku.is_empty() && barcode.is_empty() {
            return Ok(());
        }

        let variant_id = self.primary_variant_id(product_id).await?;

        let mut variant = json!({ "id": variant_id });
        if !sku.is_empty() {
            variant["inventoryItem"] = json!({ "sku": sku });
        }
        if !barcode.is_empty() {
            variant["barcode"] = json!(barcode);
        }

        let query = r#"
            mutation productVariantsBulkUpdate($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
                productVariantsBulkUpdate(productId: $productId, variants: $variants) {
                    productVariants { id }
                    userErrors { field message }
                }
            }
        "#;
        let data: VariantsBulkUpdateData = self
            .transport
            .execute(
                query,
                json!({ "productId": product_id, "variants": [variant] }),
            )
            .await?;
        check_user_errors("productVariantsBulkUpdate", data.bulk_update.user_errors)
    }

    async fn primary_variant_id(&self, product_id: &str) -> Result<String> {
        let query = r#"
            query productPrimaryVariant($id: ID!) {
                product(id: $id) {
                    variants(first: 1) {
                        nodes { id }
                    }
                }
            }
        "#;
        let data: ProductVariantsData = self
            .transport
            .execute(query, json!({ "id": product_id }))
            .await?;

        let variant_id = data
            .product
            .unwrap_or_default()
            .variants
            .nodes
            .into_iter()
            .next()
            .map(|node| node.id.trim().to_string())
            .unwrap_or_default();
        if variant_id.is_empty() {
            return Err(StorefrontError::InvalidResponse(
                "product has no variants to update".to_string(),
            )
            .into());
        }
        Ok(variant_id)
    }
}

fn product_status(is_published: bool) -> &'static str {
    if is_published {
        "ACTIVE"
    } else {
        "DRAFT"
    }
}
