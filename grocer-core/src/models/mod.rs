//! Domain models for Grocer.
//!
//! ## Submodules
//!
//! - [`unit`] - Units of measure and pack sizes
//! - [`product`] - Catalog candidates and store locations
//! - [`request`] - Parsed grocery requests
//! - [`credential`] - OAuth credentials and authorization sessions
//! - [`outcome`] - Match results and cart mutation outcomes

pub mod credential;
pub mod outcome;
pub mod product;
pub mod request;
pub mod unit;

pub use credential::{
    AuthorizationSession, ClientCredentials, Credential, TokenGrant, DEFAULT_EXPIRES_IN_SECS,
};
pub use outcome::{BatchReport, CartMutationOutcome, MatchResult, OutcomeStatus};
pub use product::{CandidateProduct, StoreContext, StoreLocation};
pub use request::GroceryRequest;
pub use unit::{Dimension, PackSize, SizeFit, Unit};
