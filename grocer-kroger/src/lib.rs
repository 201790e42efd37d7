// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Grocer Kroger
//!
//! Kroger public API adapter. Kroger also serves Fred Meyer, Ralphs, King
//! Soopers and the other banner stores; the chain filter on location lookups
//! picks which.
//!
//! - [`KrogerGateway`]: product search, cart add, and store lookup
//! - [`KrogerOAuth`]: OAuth2 token endpoint (authorization code, refresh,
//!   and client credentials grants)
//!
//! ## Endpoints
//!
//! - `GET /products` - Search the catalog at one location
//! - `PUT /cart/add` - Add items to the signed-in user's cart
//! - `GET /locations` - Find stores near a ZIP code
//! - `POST /connect/oauth2/token` - Token grants
//!
//! ## Usage
//!
//! ```ignore
//! use grocer_fetch::HttpClient;
//! use grocer_kroger::{KrogerGateway, KrogerOAuth};
//!
//! let http = HttpClient::new()?;
//! let gateway = KrogerGateway::new(http.clone());
//! let oauth = KrogerOAuth::new(http, client_credentials);
//! ```

mod api;
mod error;
mod oauth;
pub(crate) mod parser;

pub use api::{DEFAULT_API_BASE, DEFAULT_CHAIN, KrogerGateway};
pub use error::KrogerError;
pub use oauth::{APP_SCOPE, DEFAULT_SCOPES, KrogerOAuth, default_scopes};
pub use parser::{parse_locations, parse_products};
