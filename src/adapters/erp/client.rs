//! ERP HTTP client
//!
//! Thin client over the ERP bridge service. Every endpoint is a POST with a
//! JSON body scoped to the `EMANUEL` database and a raw token in the
//! `Authorization` header. Responses are checked twice: the HTTP status and
//! the envelope's application-level `status` field.

use super::models::{
    AttributesEnvelope, AttributesRequest, CategoriesEnvelope, PricesEnvelope,
    ProductsEnvelope, ProductsOrderEnvelope, ProductsRequest, RelatedEnvelope, ScopedRequest,
    StockEnvelope, ERP_DB_NAME,
};
use crate::config::ErpConfig;
use crate::domain::{
    Attribute, AttributeAssignment, ErpError, PriceRow, Product, ProductCategories,
    ProductOrder, RelatedProducts, Result, StockLevel, SyncError,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;

/// Page size for the paginated products endpoint.
const PRODUCTS_PAGE_SIZE: u32 = 100;

/// Note groups the products endpoint is filtered to.
const PRODUCT_NOTE_IDS: [&str; 5] = ["17", "78", "79", "80", "81"];

/// The fixed Hebrew/English note-name pairs the ERP exports as filterable
/// product attributes. The attributes endpoint returns only rows matching
/// the pairs named in the request.
const ATTRIBUTE_NOTE_NAMES: [[&str; 2]; 9] = [
    ["סינון", "Filter"],
    ["מידות המוצר (ס\"מ)", "Item Size (cm)"],
    ["מידות כולל אריזה (ס\"מ)", "Size of packaging (cm)"],
    ["משקל נטו (ק\"ג)", "Net weight (kg)"],
    ["משקל כולל אריזה (ק''ג)", "Weight With Packaging"],
    ["קיבולת הכוס (מ\"ל)", "Cup capacity (ml)"],
    ["תיאור", "Description"],
    ["Item Size (inch)", "Item Size (inch)"],
    ["מידות אינצ' מוצר עם קופסה", "Packaging Size (inch)"],
];

/// Longest body slice echoed into error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Client for the ERP bridge API.
pub struct ErpClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl ErpClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ErpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| {
                SyncError::Configuration(format!("failed to build ERP client: {err}"))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Fetch all products, walking the server-reported page count.
    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        let mut products = Vec::new();
        let mut page = 1u32;

        loop {
            let request = ProductsRequest {
                db_name: ERP_DB_NAME,
                page,
                page_size: PRODUCTS_PAGE_SIZE,
                note_ids: &PRODUCT_NOTE_IDS,
            };
            let envelope: ProductsEnvelope = self.post_json("/products", &request).await?;
            ensure_accepted("/products", &envelope.status)?;

            let total_pages = envelope.total_pages;
            products.extend(envelope.products.into_iter().map(|row| row.into_domain()));
            tracing::debug!(
                page,
                total_pages,
                fetched = products.len(),
                "Fetched ERP product page"
            );

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(products)
    }

    /// Fetch the latest price rows across all price lists.
    pub async fn fetch_prices(&self) -> Result<Vec<PriceRow>> {
        let envelope: PricesEnvelope = self
            .post_json("/prices-latest", &ScopedRequest::new())
            .await?;
        ensure_accepted("/prices-latest", &envelope.status)?;

        Ok(envelope
            .prices
            .into_iter()
            .map(|row| row.into_domain())
            .collect())
    }

    /// Fetch per-product category assignments.
    pub async fn fetch_product_categories(&self) -> Result<Vec<ProductCategories>> {
        let envelope: CategoriesEnvelope = self
            .post_json("/custom-categories", &ScopedRequest::new())
            .await?;
        ensure_accepted("/custom-categories", &envelope.status)?;

        Ok(envelope
            .results
            .into_iter()
            .map(|row| row.into_domain())
            .collect())
    }

    /// Fetch warehouse stock balances.
    pub async fn fetch_stock_levels(&self) -> Result<Vec<StockLevel>> {
        let envelope: StockEnvelope = self
            .post_json("/stocksProducts", &ScopedRequest::new())
            .await?;
        ensure_accepted("/stocksProducts", &envelope.status)?;

        Ok(envelope
            .items
            .into_iter()
            .map(|row| row.into_domain())
            .collect())
    }

    /// Fetch the attribute catalog and the per-product assignments in one
    /// call; the endpoint returns both collections in a single envelope.
    pub async fn fetch_attributes(&self) -> Result<(Vec<Attribute>, Vec<AttributeAssignment>)> {
        let request = AttributesRequest {
            db_name: ERP_DB_NAME,
            note_names: &ATTRIBUTE_NOTE_NAMES,
        };
        let envelope: AttributesEnvelope = self.post_json("/attributes", &request).await?;
        ensure_accepted("/attributes", &envelope.status)?;

        let attributes = envelope
            .attributes_main
            .into_iter()
            .map(|row| row.into_domain())
            .collect();
        let assignments = envelope
            .attributes_products
            .into_iter()
            .map(|row| row.into_domain())
            .collect();

        Ok((attributes, assignments))
    }

    /// Fetch the per-category product ordering.
    pub async fn fetch_product_order(&self) -> Result<Vec<ProductOrder>> {
        let envelope: ProductsOrderEnvelope = self
            .post_json("/products-order", &ScopedRequest::new())
            .await?;
        ensure_accepted("/products-order", &envelope.status)?;

        Ok(envelope
            .products
            .into_iter()
            .map(|row| row.into_domain())
            .collect())
    }

    /// Fetch related-product (similar SKU) groupings.
    pub async fn fetch_related_products(&self) -> Result<Vec<RelatedProducts>> {
        let envelope: RelatedEnvelope = self
            .post_json("/similar-products", &ScopedRequest::new())
            .await?;
        ensure_accepted("/similar-products", &envelope.status)?;

        Ok(envelope
            .products
            .into_iter()
            .map(|row| row.into_domain())
            .collect())
    }

    /// Kick the ERP's own file-sync job. Fire and forget: the request runs
    /// on a detached task and failures are logged, never propagated.
    pub fn trigger_file_sync(&self) -> JoinHandle<()> {
        let http = self.http.clone();
        let endpoint = format!("{}/files/shopify/sync", self.base_url);
        tracing::info!(endpoint = %endpoint, "Triggering ERP file sync");

        tokio::spawn(async move {
            match http.post(&endpoint).send().await {
                Ok(response) => {
                    tracing::debug!(
                        status = %response.status(),
                        "ERP file sync trigger sent"
                    );
                }
                Err(err) => {
                    tracing::warn!(error = %err, "ERP file sync trigger failed");
                }
            }
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|err| ErpError::ConnectionFailed(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ErpError::ConnectionFailed(err.to_string()))?;

        if !status.is_success() {
            tracing::error!(endpoint = path, status = status.as_u16(), "ERP request failed");
            return Err(ErpError::BadStatus {
                status: status.as_u16(),
                message: body_snippet(&text, status),
            }
            .into());
        }

        serde_json::from_str(&text)
            .map_err(|err| ErpError::InvalidResponse(format!("{path}: {err}")).into())
    }
}

/// Reject envelopes whose application status is anything but `ok`.
fn ensure_accepted(path: &str, status: &str) -> Result<()> {
    if status.eq_ignore_ascii_case("ok") {
        Ok(())
    } else {
        Err(ErpError::Rejected(format!("{path} returned status {status:?}")).into())
    }
}

fn body_snippet(body: &str, status: reqwest::StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    let mut end = trimmed.len().min(ERROR_BODY_LIMIT);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
