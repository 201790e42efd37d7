// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Grocer Core
//!
//! Core types, the query parser, the product match engine, and the traits
//! shared by every other Grocer crate.
//!
//! ## Key Types
//!
//! ### Requests & Catalog
//! - [`GroceryRequest`] - A parsed grocery utterance
//! - [`CandidateProduct`] - A catalog search result
//! - [`PackSize`] / [`Unit`] - Normalised sizes
//! - [`StoreContext`] / [`StoreLocation`] - Store selection
//!
//! ### Matching
//! - [`MatchPolicy`] - Weights and thresholds
//! - [`MatchResult`] - Best match or disambiguation set
//!
//! ### Outcomes
//! - [`CartMutationOutcome`] / [`OutcomeStatus`] - Per-item batch results
//! - [`BatchReport`] - A whole batch
//!
//! ### Auth
//! - [`Credential`] / [`TokenGrant`] / [`AuthorizationSession`]
//!
//! ### Traits
//! - [`CatalogGateway`], [`TokenEndpoint`], [`CredentialStore`]

pub mod error;
pub mod matching;
pub mod models;
pub mod query;
pub mod traits;

pub use error::CoreError;

pub use matching::{MatchPolicy, ScoredCandidate, select_best_match};

pub use models::{
    // Auth
    AuthorizationSession,
    ClientCredentials,
    Credential,
    DEFAULT_EXPIRES_IN_SECS,
    TokenGrant,
    // Catalog
    CandidateProduct,
    Dimension,
    GroceryRequest,
    PackSize,
    SizeFit,
    StoreContext,
    StoreLocation,
    Unit,
    // Outcomes
    BatchReport,
    CartMutationOutcome,
    MatchResult,
    OutcomeStatus,
};

pub use traits::{CatalogGateway, CredentialStore, TokenEndpoint};
