//! Free-text grocery query parsing.
//!
//! Turns utterances like `"2x half gallon whole milk"` or `"eggs dozen"`
//! into a [`GroceryRequest`], and provides the tokenizer the match engine
//! uses for textual relevance.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::CoreError;
use crate::models::unit::parse_amount;
use crate::models::{Dimension, GroceryRequest, Unit};

/// Largest bare number treated as a cart quantity.
const MAX_CART_QUANTITY: f64 = 99.0;

/// Words dropped from search terms and match tokens.
const FILLER_WORDS: &[&str] = &["a", "an", "the", "of", "some", "please", "with", "for"];

/// Conjunctions kept in search terms ("half and half", "mac & cheese") but
/// ignored when scoring, where product titles spell them either way.
const CONJUNCTIONS: &[&str] = &["and", "&"];

static ATTACHED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+/\d+|\d*\.\d+|\d+)([a-z]+)$").expect("Invalid regex")
});

// ============================================================================
// Request Parsing
// ============================================================================

impl GroceryRequest {
    /// Parses an utterance into a request.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidData`] when nothing searchable remains
    /// after quantities and units are removed.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        parse_request(raw)
    }
}

/// Parses an utterance into a [`GroceryRequest`].
pub fn parse_request(raw: &str) -> Result<GroceryRequest, CoreError> {
    let tokens = split_tokens(raw);

    let mut term: Vec<String> = Vec::new();
    let mut cart_quantity: Option<u32> = None;
    let mut size: Option<(f64, Unit)> = None;

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let next = tokens.get(i + 1).map(String::as_str);

        if let Some(amount) = parse_amount(token) {
            if next == Some("x") {
                cart_quantity = as_cart_quantity(amount).or(cart_quantity);
                i += 2;
                continue;
            }
            if let Some((unit_amount, unit, consumed)) = unit_at(&tokens, i + 1) {
                size = Some((amount * unit_amount, unit));
                i += 1 + consumed;
                continue;
            }
            if cart_quantity.is_none() {
                if let Some(quantity) = as_cart_quantity(amount) {
                    cart_quantity = Some(quantity);
                    i += 1;
                    continue;
                }
            }
            term.push(token.to_string());
            i += 1;
            continue;
        }

        if token == "half" {
            if let Some((unit_amount, unit, consumed)) = unit_at(&tokens, i + 1) {
                size = Some((0.5 * unit_amount, unit));
                i += 1 + consumed;
                continue;
            }
        }

        if let Some((unit_amount, unit, consumed)) = unit_at(&tokens, i) {
            // A lone "pack" or "each" is not a size preference.
            if unit.dimension() != Dimension::Count || unit_amount > 1.0 {
                size.get_or_insert((unit_amount, unit));
            }
            i += consumed;
            continue;
        }

        if !FILLER_WORDS.contains(&token) {
            term.push(token.to_string());
        }
        i += 1;
    }

    let parsed_term = term.join(" ");
    if parsed_term.is_empty() {
        return Err(CoreError::InvalidData(format!(
            "no searchable term in '{}'",
            raw.trim()
        )));
    }

    let (desired_quantity, desired_unit) = match size {
        Some((amount, unit)) => (amount, Some(unit)),
        None => (1.0, None),
    };

    Ok(GroceryRequest {
        raw_text: raw.trim().to_string(),
        parsed_term,
        desired_quantity,
        desired_unit,
        cart_quantity: cart_quantity.unwrap_or(1),
    })
}

/// Lowercases, strips list punctuation, and splits `"2lb"` into `["2", "lb"]`.
fn split_tokens(raw: &str) -> Vec<String> {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, ',' | ';' | '(' | ')') { ' ' } else { c })
        .collect();

    let mut tokens = Vec::new();
    for word in cleaned.split_whitespace() {
        if let Some(caps) = ATTACHED_RE.captures(word) {
            tokens.push(caps[1].to_string());
            tokens.push(caps[2].to_string());
        } else {
            tokens.push(word.to_string());
        }
    }
    tokens
}

/// Recognises a unit at `tokens[idx]`, returning (multiplier, unit, tokens consumed).
fn unit_at(tokens: &[String], idx: usize) -> Option<(f64, Unit, usize)> {
    let word = tokens.get(idx)?.as_str();
    if matches!(word, "fl" | "fl.") && tokens.get(idx + 1).is_some_and(|w| w == "oz") {
        return Some((1.0, Unit::FluidOunce, 2));
    }
    if matches!(word, "dozen" | "dz") {
        return Some((12.0, Unit::Count, 1));
    }
    Unit::from_word(word).map(|unit| (1.0, unit, 1))
}

// Bounded to 1..=99, so the cast cannot truncate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_cart_quantity(amount: f64) -> Option<u32> {
    if (1.0..=MAX_CART_QUANTITY).contains(&amount) && amount.fract() == 0.0 {
        Some(amount as u32)
    } else {
        None
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

/// Splits text into normalised match tokens.
///
/// Lowercases, splits on anything that is not alphanumeric or `%`, drops
/// filler words and conjunctions, and folds simple plurals (`"eggs"` → `"egg"`).
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '%'))
        .filter(|t| !t.is_empty() && !FILLER_WORDS.contains(t) && !CONJUNCTIONS.contains(t))
        .map(fold_plural)
        .collect()
}

fn fold_plural(token: &str) -> String {
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
