//! ERP API wire models
//!
//! Request and response structures for the ERP HTTP API, separate from the
//! domain models. Field names follow the ERP's JSON exactly, including its
//! irregular casing; all normalization happens in the `into_domain`
//! converters so the rest of the crate only ever sees clean values.

use crate::domain::{
    Attribute, AttributeAssignment, Category, OrderCategory, PriceRow, Product,
    ProductCategories, ProductOrder, RelatedProducts, StockLevel,
};
use serde::{Deserialize, Serialize};

/// Database name every ERP request is scoped to.
pub(crate) const ERP_DB_NAME: &str = "EMANUEL";

/// Request body for endpoints that only take the database scope.
#[derive(Debug, Serialize)]
pub(crate) struct ScopedRequest<'a> {
    #[serde(rename = "dbName")]
    pub db_name: &'a str,
}

impl ScopedRequest<'_> {
    pub(crate) fn new() -> Self {
        Self {
            db_name: ERP_DB_NAME,
        }
    }
}

/// Request body for the paginated products endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct ProductsRequest<'a> {
    #[serde(rename = "dbName")]
    pub db_name: &'a str,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(rename = "noteIds")]
    pub note_ids: &'a [&'a str],
}

/// Request body for the attributes endpoint. The ERP filters the catalog to
/// the Hebrew/English note-name pairs listed in the request.
#[derive(Debug, Serialize)]
pub(crate) struct AttributesRequest<'a> {
    #[serde(rename = "dbName")]
    pub db_name: &'a str,
    #[serde(rename = "noteName")]
    pub note_names: &'a [[&'a str; 2]],
}

/// Response envelope for the paginated products endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ProductsEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "totalPages")]
    pub total_pages: u32,
    #[serde(default)]
    pub products: Vec<ProductRow>,
}

/// One product row. The ERP exports many more columns; only the ones the
/// sync consumes are declared here, unknown fields are skipped on decode.
#[derive(Debug, Deserialize)]
pub(crate) struct ProductRow {
    #[serde(default, rename = "ItemKey")]
    pub item_key: String,
    #[serde(default, rename = "ItemName")]
    pub item_name: String,
    // The ERP misspells this column; the rename is deliberate.
    #[serde(default, rename = "ForignName")]
    pub foreign_name: String,
    #[serde(default, rename = "BarCode")]
    pub barcode: String,
    #[serde(default)]
    pub status: bool,
}

impl ProductRow {
    pub(crate) fn into_domain(self) -> Product {
        Product {
            sku: self.item_key,
            hebrew_title: self.item_name,
            english_title: self.foreign_name,
            description: String::new(),
            is_published: self.status,
            barcode: self.barcode,
        }
    }
}

/// Response envelope for the latest-prices endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct PricesEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub prices: Vec<PriceRowWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceRowWire {
    #[serde(default, rename = "ItemKey")]
    pub item_key: String,
    #[serde(default, rename = "Price")]
    pub price: f64,
    #[serde(default, rename = "CurrencyCode")]
    pub currency_code: String,
}

impl PriceRowWire {
    pub(crate) fn into_domain(self) -> PriceRow {
        PriceRow {
            sku: self.item_key,
            currency: normalize_currency_code(&self.currency_code),
            amount: self.price,
        }
    }
}

/// Response envelope for the per-product category assignments.
#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<ProductCategoriesRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductCategoriesRow {
    #[serde(default, rename = "kef")]
    pub sku: String,
    #[serde(default)]
    pub categories: Vec<CategoryRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryRow {
    #[serde(default, rename = "NoteHebrew")]
    pub note_hebrew: String,
    #[serde(default, rename = "NoteEnglish")]
    pub note_english: String,
}

impl ProductCategoriesRow {
    /// Blank category pairs are kept; the flow counts them as skips.
    pub(crate) fn into_domain(self) -> ProductCategories {
        let categories = self
            .categories
            .into_iter()
            .map(|row| Category {
                title_hebrew: row.note_hebrew.trim().to_string(),
                title_english: row.note_english.trim().to_string(),
            })
            .collect();

        ProductCategories {
            sku: self.sku.trim().to_string(),
            categories,
        }
    }
}

/// Response envelope for the warehouse stock endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct StockEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub items: Vec<StockRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StockRow {
    #[serde(default, rename = "ITEMKEY")]
    pub item_key: String,
    #[serde(default, rename = "ITEMWARHBAL")]
    pub balance: f64,
}

impl StockRow {
    pub(crate) fn into_domain(self) -> StockLevel {
        StockLevel {
            sku: self.item_key,
            quantity: round_quantity(self.balance),
        }
    }
}

/// Response envelope for the attributes endpoint. One call carries both the
/// attribute catalog and the per-product assignments.
#[derive(Debug, Deserialize)]
pub(crate) struct AttributesEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "attributesMain")]
    pub attributes_main: Vec<AttributeMainRow>,
    #[serde(default, rename = "attributesProducts")]
    pub attributes_products: Vec<AttributeProductRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttributeMainRow {
    #[serde(default, rename = "NoteName")]
    pub note_name: String,
    #[serde(default, rename = "NoteNameEnglish")]
    pub note_name_english: String,
    #[serde(default, rename = "NoteID")]
    pub note_id: i64,
}

impl AttributeMainRow {
    pub(crate) fn into_domain(self) -> Attribute {
        Attribute {
            id: self.note_id,
            hebrew_name: self.note_name,
            english_name: self.note_name_english,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttributeProductRow {
    #[serde(default, rename = "KeF")]
    pub sku: String,
    #[serde(default, rename = "Note")]
    pub note: String,
    #[serde(default, rename = "NoteEnglish")]
    pub note_english: String,
    #[serde(default, rename = "NoteID")]
    pub note_id: i64,
}

impl AttributeProductRow {
    pub(crate) fn into_domain(self) -> AttributeAssignment {
        AttributeAssignment {
            sku: self.sku,
            attribute_id: self.note_id,
            value_hebrew: self.note,
            value_english: self.note_english,
        }
    }
}

/// Response envelope for the per-category product ordering endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ProductsOrderEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub products: Vec<ProductOrderRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductOrderRow {
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub categories: Vec<OrderCategoryRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderCategoryRow {
    #[serde(default, rename = "categoryNoteId")]
    pub category_note_id: i64,
    #[serde(default, rename = "categoryValue")]
    pub category_value: String,
    #[serde(default, rename = "categoryEnglish")]
    pub category_english: String,
    #[serde(default, rename = "orderNoteId")]
    pub order_note_id: i64,
    #[serde(default, rename = "orderValue")]
    pub order_value: String,
    #[serde(default, rename = "orderNumber")]
    pub order_number: i64,
}

impl ProductOrderRow {
    pub(crate) fn into_domain(self) -> ProductOrder {
        let categories = self
            .categories
            .into_iter()
            .map(|row| OrderCategory {
                category_note_id: row.category_note_id.to_string(),
                category_value: row.category_value.trim().to_string(),
                category_english: row.category_english.trim().to_string(),
                order_note_id: row.order_note_id.to_string(),
                order_value: row.order_value.trim().to_string(),
                order_number: row.order_number,
            })
            .collect();

        ProductOrder {
            sku: self.sku.trim().to_string(),
            categories,
        }
    }
}

/// Response envelope for the similar-products endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct RelatedEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub products: Vec<RelatedRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelatedRow {
    #[serde(default)]
    pub sku: String,
    #[serde(default, rename = "similarSkus")]
    pub similar_skus: Vec<String>,
}

impl RelatedRow {
    pub(crate) fn into_domain(self) -> RelatedProducts {
        let related_skus = self
            .similar_skus
            .into_iter()
            .filter_map(|sku| {
                let trimmed = sku.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect();

        RelatedProducts {
            sku: self.sku.trim().to_string(),
            related_skus,
        }
    }
}

/// Map the ERP's currency markers to ISO codes. The ERP mixes symbols and
/// codes in the same column.
pub(crate) fn normalize_currency_code(code: &str) -> String {
    let value = code.trim();
    match value {
        "$" => "USD".to_string(),
        "ש\"ח" | "₪" => "ILS".to_string(),
        _ => value.to_uppercase(),
    }
}

/// Round a warehouse balance to a whole unit count. Non-finite balances
/// come out of the ERP for discontinued rows and count as zero.
pub(crate) fn round_quantity(balance: f64) -> i32 {
    if balance.is_finite() {
        balance.round() as i32
    } else {
        0
    }
}
