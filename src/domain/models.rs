//! Catalog domain models
//!
//! These are the normalized records the sync flows operate on, produced by
//! the ERP adapter from its wire representations. All string fields are
//! stored as received; trimming and fallback rules live in the helper
//! methods so every flow resolves titles and keys the same way.

/// A sellable item as described by the ERP.
///
/// The ERP is bilingual: `hebrew_title` is the primary merchandising name
/// and `english_title` is the storefront-facing one. A product cannot be
/// created on the storefront without an English title, but it can be
/// updated without one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Product {
    /// Natural key shared between the ERP and the storefront variant.
    pub sku: String,

    /// Hebrew display name, written as a title translation after upserts.
    pub hebrew_title: String,

    /// English display name, used as the storefront title.
    pub english_title: String,

    /// Optional long-form description (HTML allowed).
    pub description: String,

    /// Whether the ERP considers the item visible for sale.
    pub is_published: bool,

    /// Optional EAN/UPC barcode carried onto the primary variant.
    pub barcode: String,
}

impl Product {
    /// Title used in log lines: English when present, Hebrew otherwise.
    pub fn display_title(&self) -> &str {
        let english = self.english_title.trim();
        if !english.is_empty() {
            return english;
        }
        self.hebrew_title.trim()
    }
}

/// A single category (storefront collection) in both languages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Category {
    pub title_hebrew: String,
    pub title_english: String,
}

impl Category {
    /// Collection title: trimmed English, falling back to trimmed Hebrew.
    pub fn resolved_title(&self) -> &str {
        let english = self.title_english.trim();
        if !english.is_empty() {
            return english;
        }
        self.title_hebrew.trim()
    }

    /// True when neither language carries a usable title.
    pub fn is_blank(&self) -> bool {
        self.resolved_title().is_empty()
    }

    /// Case-insensitive deduplication key over the resolved title.
    pub fn dedupe_key(&self) -> String {
        self.resolved_title().to_lowercase()
    }
}

/// Categories assigned to one SKU.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductCategories {
    pub sku: String,
    pub categories: Vec<Category>,
}

/// One price observation for a SKU in a single currency.
///
/// Currency codes are normalized by the ERP adapter (`$` becomes `USD`,
/// the shekel sign and its Hebrew abbreviation become `ILS`, anything else
/// is uppercased). A SKU only becomes writable once both a USD and an ILS
/// row exist for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub sku: String,
    pub currency: String,
    pub amount: f64,
}

/// On-hand quantity for a SKU at the fulfillment location.
#[derive(Debug, Clone, PartialEq)]
pub struct StockLevel {
    pub sku: String,
    pub quantity: i32,
}

/// An attribute definition (a named product property, bilingual).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attribute {
    /// ERP-assigned identifier; `0` marks a malformed row.
    pub id: i64,
    pub hebrew_name: String,
    pub english_name: String,
}

impl Attribute {
    /// Definition display name: English, falling back to Hebrew.
    pub fn resolved_name(&self) -> &str {
        let english = self.english_name.trim();
        if !english.is_empty() {
            return english;
        }
        self.hebrew_name.trim()
    }
}

/// One attribute value carried by one SKU.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeAssignment {
    pub sku: String,
    pub attribute_id: i64,
    pub value_hebrew: String,
    pub value_english: String,
}

impl AttributeAssignment {
    /// Stored value: English, falling back to Hebrew.
    pub fn resolved_value(&self) -> &str {
        let english = self.value_english.trim();
        if !english.is_empty() {
            return english;
        }
        self.value_hebrew.trim()
    }
}

/// Ordering directive for one SKU inside one category.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderCategory {
    pub category_note_id: String,
    pub category_value: String,
    pub category_english: String,
    pub order_note_id: String,
    pub order_value: String,
    pub order_number: i64,
}

impl OrderCategory {
    /// Category title for ordering: trimmed English, falling back to the
    /// raw category value.
    pub fn resolved_title(&self) -> &str {
        let english = self.category_english.trim();
        if !english.is_empty() {
            return english;
        }
        self.category_value.trim()
    }
}

/// Manual ordering assignments for one SKU.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductOrder {
    pub sku: String,
    pub categories: Vec<OrderCategory>,
}

/// Cross-sell links for one SKU.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelatedProducts {
    pub sku: String,
    pub related_skus: Vec<String>,
}
