//! Domain models and types for Shopsync.
//!
//! This module contains the core domain models, error types, and shared
//! rules the sync flows are built on.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Normalized source records** ([`Product`], [`Category`], [`PriceRow`],
//!   [`StockLevel`], [`Attribute`], [`ProductOrder`], [`RelatedProducts`])
//! - **Error types** ([`SyncError`], [`ErpError`], [`StorefrontError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SyncError>`]:
//!
//! ```rust
//! use shopsync::domain::{Result, SyncError};
//!
//! fn require_sku(sku: &str) -> Result<()> {
//!     if sku.trim().is_empty() {
//!         return Err(SyncError::Validation("sku is required".to_string()));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Bilingual Resolution
//!
//! The ERP carries Hebrew and English text side by side. Every place that
//! must choose one uses the same rule, exposed as helper methods on the
//! models: trimmed English first, trimmed Hebrew as the fallback.
//!
//! ```rust
//! use shopsync::domain::Category;
//!
//! let category = Category {
//!     title_english: String::new(),
//!     title_hebrew: "מטבח".to_string(),
//! };
//! assert_eq!(category.resolved_title(), "מטבח");
//! ```

pub mod errors;
pub mod models;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{format_user_errors, ErpError, StorefrontError, SyncError, UserError};
pub use models::{
    Attribute, AttributeAssignment, Category, OrderCategory, PriceRow, Product,
    ProductCategories, ProductOrder, RelatedProducts, StockLevel,
};
pub use result::Result;
