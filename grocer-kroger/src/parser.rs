//! Kroger response parser.
//!
//! Decodes `/products` and `/locations` payloads into core models. Every
//! field is optional on the wire; missing values fall back to empty strings,
//! no price, and in stock.

use grocer_core::{CandidateProduct, StoreLocation};
use serde::Deserialize;
use tracing::debug;

use crate::error::KrogerError;

/// Stock level Kroger reports for unavailable items.
const OUT_OF_STOCK: &str = "TEMPORARILY_OUT_OF_STOCK";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductData {
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    items: Vec<ItemData>,
}

#[derive(Debug, Default, Deserialize)]
struct ItemData {
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    price: Option<PriceData>,
    #[serde(default)]
    inventory: Option<InventoryData>,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    #[serde(default)]
    regular: Option<f64>,
    #[serde(default)]
    promo: Option<f64>,
}

impl PriceData {
    /// Promo price when it is a real discount, otherwise the regular price.
    fn effective(&self) -> Option<f64> {
        let regular = self.regular.filter(|p| *p > 0.0);
        match self.promo.filter(|p| *p > 0.0) {
            Some(promo) if regular.is_none_or(|r| promo < r) => Some(promo),
            _ => regular,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryData {
    #[serde(default)]
    stock_level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationData {
    #[serde(default)]
    location_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: Option<AddressData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressData {
    #[serde(default)]
    address_line1: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    zip_code: String,
}

// ============================================================================
// Products
// ============================================================================

/// Parses a `/products` response body.
///
/// Entries without a product id are dropped since they cannot be added to a
/// cart.
pub fn parse_products(json: &str) -> Result<Vec<CandidateProduct>, KrogerError> {
    let envelope: DataEnvelope<ProductData> = serde_json::from_str(json)?;
    let total = envelope.data.len();

    let products: Vec<CandidateProduct> = envelope
        .data
        .into_iter()
        .filter(|p| !p.product_id.is_empty())
        .map(to_candidate)
        .collect();

    debug!(total, kept = products.len(), "Parsed products");
    Ok(products)
}

fn to_candidate(data: ProductData) -> CandidateProduct {
    let item = data.items.into_iter().next().unwrap_or_default();

    let mut product = CandidateProduct::new(data.product_id, data.description)
        .with_brand(data.brand.unwrap_or_default())
        .with_size(item.size.unwrap_or_default());

    if let Some(price) = item.price.as_ref().and_then(PriceData::effective) {
        product = product.with_price(price);
    }

    let stock_level = item.inventory.and_then(|i| i.stock_level);
    product.with_in_stock(stock_level.as_deref() != Some(OUT_OF_STOCK))
}

// ============================================================================
// Locations
// ============================================================================

/// Parses a `/locations` response body.
pub fn parse_locations(json: &str) -> Result<Vec<StoreLocation>, KrogerError> {
    let envelope: DataEnvelope<LocationData> = serde_json::from_str(json)?;

    let stores: Vec<StoreLocation> = envelope
        .data
        .into_iter()
        .filter(|l| !l.location_id.is_empty())
        .map(|l| {
            let address = l.address.unwrap_or_default();
            let line = [&address.address_line1, &address.city, &address.state]
                .into_iter()
                .filter(|part| !part.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            StoreLocation {
                store_id: l.location_id,
                name: l.name,
                address: line,
                zip_code: address.zip_code,
            }
        })
        .collect();

    debug!(count = stores.len(), "Parsed locations");
    Ok(stores)
}
