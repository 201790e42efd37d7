//! Units of measure and pack sizes.
//!
//! Catalog sizes ("1 gal", "64 fl oz", "12 ct") and query sizes ("gallon",
//! "dozen", "2 lb") are normalised to a base amount per [`Dimension`] so they
//! can be compared: milliliters for volume, grams for mass, items for count.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Relative tolerance when comparing two pack sizes for an exact match.
const EXACT_TOLERANCE: f64 = 0.02;

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(\d+)\s*x\s*)?(\d+\s*/\s*\d+|\d*\.\d+|\d+)\s*(fl\.?\s*oz|[a-z]+)\.?",
    )
    .expect("Invalid regex")
});

// ============================================================================
// Dimension
// ============================================================================

/// The physical dimension a unit measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Liquid volume.
    Volume,
    /// Weight.
    Mass,
    /// Discrete items.
    Count,
}

// ============================================================================
// Unit
// ============================================================================

/// A unit of measure seen in queries or catalog sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// US gallon.
    Gallon,
    /// US quart.
    Quart,
    /// US pint.
    Pint,
    /// Liter.
    Liter,
    /// Milliliter.
    Milliliter,
    /// US fluid ounce.
    FluidOunce,
    /// Ounce (weight).
    Ounce,
    /// Pound.
    Pound,
    /// Gram.
    Gram,
    /// Kilogram.
    Kilogram,
    /// Individual items (ct, count, each, pack).
    Count,
}

impl Unit {
    /// Parses a single unit word, singular or plural.
    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.trim().trim_end_matches('.').to_ascii_lowercase();
        let unit = match word.as_str() {
            "gal" | "gals" | "gallon" | "gallons" => Self::Gallon,
            "qt" | "qts" | "quart" | "quarts" => Self::Quart,
            "pt" | "pts" | "pint" | "pints" => Self::Pint,
            "l" | "lt" | "liter" | "liters" | "litre" | "litres" => Self::Liter,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                Self::Milliliter
            }
            "floz" | "fl oz" | "fl.oz" | "fl. oz" => Self::FluidOunce,
            "oz" | "ounce" | "ounces" => Self::Ounce,
            "lb" | "lbs" | "pound" | "pounds" => Self::Pound,
            "g" | "gr" | "gram" | "grams" => Self::Gram,
            "kg" | "kilo" | "kilos" | "kilogram" | "kilograms" => Self::Kilogram,
            "ct" | "count" | "each" | "ea" | "pk" | "pack" | "packs" | "pc" | "pcs" => {
                Self::Count
            }
            _ => return None,
        };
        Some(unit)
    }

    /// Returns the dimension of this unit.
    pub fn dimension(self) -> Dimension {
        match self {
            Self::Gallon
            | Self::Quart
            | Self::Pint
            | Self::Liter
            | Self::Milliliter
            | Self::FluidOunce => Dimension::Volume,
            Self::Ounce | Self::Pound | Self::Gram | Self::Kilogram => Dimension::Mass,
            Self::Count => Dimension::Count,
        }
    }

    /// Factor converting one of this unit to the dimension's base unit.
    pub fn base_factor(self) -> f64 {
        match self {
            Self::Gallon => 3785.41,
            Self::Quart => 946.353,
            Self::Pint => 473.176,
            Self::Liter => 1000.0,
            Self::Milliliter | Self::Gram | Self::Count => 1.0,
            Self::FluidOunce => 29.5735,
            Self::Ounce => 28.3495,
            Self::Pound => 453.592,
            Self::Kilogram => 1000.0,
        }
    }

    /// Short display symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gallon => "gal",
            Self::Quart => "qt",
            Self::Pint => "pt",
            Self::Liter => "l",
            Self::Milliliter => "ml",
            Self::FluidOunce => "fl oz",
            Self::Ounce => "oz",
            Self::Pound => "lb",
            Self::Gram => "g",
            Self::Kilogram => "kg",
            Self::Count => "ct",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// Pack Size
// ============================================================================

/// An amount in a unit, e.g. `1 gal` or `12 ct`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackSize {
    /// Amount in `unit`.
    pub amount: f64,
    /// Unit of the amount.
    pub unit: Unit,
}

/// How two pack sizes relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeFit {
    /// Same dimension and the same amount within tolerance.
    Exact,
    /// Same dimension, different amount.
    SameDimension,
    /// Different dimensions (e.g. a weight against a volume).
    Incompatible,
}

impl PackSize {
    /// Creates a new pack size.
    pub fn new(amount: f64, unit: Unit) -> Self {
        Self { amount, unit }
    }

    /// Amount in the dimension's base unit.
    pub fn base_amount(&self) -> f64 {
        self.amount * self.unit.base_factor()
    }

    /// Compares this (desired) size with a candidate's size.
    ///
    /// A weight-ounce and a fluid-ounce size are treated as the same
    /// dimension: catalogs frequently label liquids with plain "oz".
    pub fn fit(&self, other: &PackSize) -> SizeFit {
        let (a, b) = (self.unit.dimension(), other.unit.dimension());
        let same_dimension = a == b || is_ounce_pair(self.unit, other.unit);
        if !same_dimension {
            return SizeFit::Incompatible;
        }

        let (mine, theirs) = if a == b {
            (self.base_amount(), other.base_amount())
        } else {
            // Treat both as fluid ounces.
            (self.amount, other.amount)
        };

        if mine <= 0.0 || theirs <= 0.0 {
            return SizeFit::SameDimension;
        }

        if ((mine - theirs).abs() / mine) <= EXACT_TOLERANCE {
            SizeFit::Exact
        } else {
            SizeFit::SameDimension
        }
    }

    /// Parses a catalog size label such as `"1 gal"`, `"1/2 gal"`,
    /// `"64 fl oz"`, `"12 ct"` or `"2 x 16 oz"`.
    ///
    /// Returns `None` when no amount/unit pair is recognised.
    pub fn parse(label: &str) -> Option<Self> {
        let caps = SIZE_RE.captures(label)?;
        let multiplier = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(1.0);
        let amount = parse_amount(caps.get(2)?.as_str())?;
        let unit_text = caps.get(3)?.as_str();
        let unit = if unit_text.to_ascii_lowercase().starts_with("fl") {
            Unit::FluidOunce
        } else if unit_text.eq_ignore_ascii_case("dozen") || unit_text.eq_ignore_ascii_case("dz") {
            return Some(Self::new(multiplier * amount * 12.0, Unit::Count));
        } else {
            Unit::from_word(unit_text)?
        };

        Some(Self::new(multiplier * amount, unit))
    }
}

impl fmt::Display for PackSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amount.fract() == 0.0 {
            write!(f, "{} {}", self.amount, self.unit)
        } else {
            write!(f, "{:.2} {}", self.amount, self.unit)
        }
    }
}

fn is_ounce_pair(a: Unit, b: Unit) -> bool {
    matches!(
        (a, b),
        (Unit::Ounce, Unit::FluidOunce) | (Unit::FluidOunce, Unit::Ounce)
    )
}

/// Parses `"2"`, `"0.5"`, `".5"` or `"1/2"`.
pub(crate) fn parse_amount(text: &str) -> Option<f64> {
    if let Some((num, den)) = text.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    text.trim().parse().ok()
}

// ============================================================================
// Tests
// ============================================================================
