//! Catalog and store types.

use serde::{Deserialize, Serialize};

use super::unit::PackSize;

// ============================================================================
// Candidate Product
// ============================================================================

/// A single catalog entry returned by a product search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProduct {
    /// Catalog identifier (UPC for Kroger).
    pub product_id: String,
    /// Product description, e.g. "Kroger Vitamin D Whole Milk".
    pub description: String,
    /// Brand name.
    #[serde(default)]
    pub brand: String,
    /// Parsed pack size, when the size label was recognised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_size: Option<PackSize>,
    /// Raw size label from the catalog, e.g. "1 gal".
    #[serde(default)]
    pub size_label: String,
    /// Price in USD, when the store reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Whether the store has the item in stock.
    pub in_stock: bool,
    /// Remote ranking score in `[0, 1]`, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl CandidateProduct {
    /// Creates an in-stock candidate with no size, price, or remote score.
    pub fn new(product_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            description: description.into(),
            brand: String::new(),
            pack_size: None,
            size_label: String::new(),
            price: None,
            in_stock: true,
            relevance_score: None,
        }
    }

    /// Sets the brand.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    /// Sets the size label and parses it into a pack size.
    pub fn with_size(mut self, label: impl Into<String>) -> Self {
        self.size_label = label.into();
        self.pack_size = PackSize::parse(&self.size_label);
        self
    }

    /// Sets the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Sets stock availability.
    pub fn with_in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = in_stock;
        self
    }

    /// Sets the remote relevance score.
    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = Some(score);
        self
    }

    /// Display line, e.g. "Kroger Whole Milk (1 gal) $3.49".
    pub fn summary(&self) -> String {
        let mut line = self.description.clone();
        if !self.size_label.is_empty() {
            line.push_str(&format!(" ({})", self.size_label));
        }
        if let Some(price) = self.price {
            line.push_str(&format!(" ${price:.2}"));
        }
        if !self.in_stock {
            line.push_str(" [out of stock]");
        }
        line
    }
}

// ============================================================================
// Stores
// ============================================================================

/// The store all searches in a session run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreContext {
    /// Provider location id.
    pub store_id: String,
    /// ZIP code used to resolve the store.
    #[serde(default)]
    pub zip_code: String,
}

impl StoreContext {
    /// Creates a store context.
    pub fn new(store_id: impl Into<String>, zip_code: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            zip_code: zip_code.into(),
        }
    }
}

/// A store returned by a location lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLocation {
    /// Provider location id.
    pub store_id: String,
    /// Store name.
    pub name: String,
    /// Single-line street address.
    pub address: String,
    /// Store ZIP code.
    #[serde(default)]
    pub zip_code: String,
}

impl StoreLocation {
    /// Converts this location into the context used for searches.
    pub fn to_context(&self) -> StoreContext {
        StoreContext::new(&self.store_id, &self.zip_code)
    }
}
