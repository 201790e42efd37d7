//! Grocery request type.

use serde::{Deserialize, Serialize};

use super::unit::{PackSize, Unit};

/// One item the user asked for, as parsed from their words.
///
/// `desired_quantity` and `desired_unit` describe the pack size the user
/// wants ("1 gal", "12 ct"); `cart_quantity` is how many of the chosen item
/// to put in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryRequest {
    /// Original utterance.
    pub raw_text: String,
    /// Search term with quantities and units removed.
    pub parsed_term: String,
    /// Desired pack amount in `desired_unit` (1 when no unit was given).
    pub desired_quantity: f64,
    /// Desired pack unit, if the user named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_unit: Option<Unit>,
    /// Number of items to add to the cart.
    #[serde(default = "default_cart_quantity")]
    pub cart_quantity: u32,
}

fn default_cart_quantity() -> u32 {
    1
}

impl GroceryRequest {
    /// Creates a request for a bare term with no size preference.
    pub fn new(term: impl Into<String>) -> Self {
        let term = term.into();
        Self {
            raw_text: term.clone(),
            parsed_term: term,
            desired_quantity: 1.0,
            desired_unit: None,
            cart_quantity: 1,
        }
    }

    /// Sets the desired pack size.
    pub fn with_size(mut self, amount: f64, unit: Unit) -> Self {
        self.desired_quantity = amount;
        self.desired_unit = Some(unit);
        self
    }

    /// Sets the cart quantity.
    pub fn with_cart_quantity(mut self, quantity: u32) -> Self {
        self.cart_quantity = quantity.max(1);
        self
    }

    /// The desired pack size, if a unit was given.
    pub fn desired_size(&self) -> Option<PackSize> {
        self.desired_unit
            .map(|unit| PackSize::new(self.desired_quantity, unit))
    }
}
