// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Grocer Fetch
//!
//! Authenticated access to remote grocery services.
//!
//! ## HTTP
//!
//! - [`client::HttpClient`] - reqwest wrapper with retries and backoff
//! - [`retry::RetryStrategy`] - Retry policy
//!
//! ## Authorization
//!
//! - [`token::TokenManager`] - Credential lifecycle, single-flight refresh,
//!   and the Authorization-Code flow
//! - [`host::callback`] - Loopback redirect listener and manual entry
//!
//! ## Cart
//!
//! - [`orchestrator::CartOrchestrator`] - Batch search, match and add
//!
//! ## Example
//!
//! ```ignore
//! use grocer_fetch::{CartOrchestrator, OrchestratorConfig, TokenConfig, TokenManager};
//!
//! let tokens = TokenManager::new(endpoint, store, TokenConfig::default())?;
//! let orchestrator = CartOrchestrator::new(gateway, tokens, OrchestratorConfig::default());
//! let outcomes = orchestrator.fulfill_batch(requests, &store_context).await;
//! ```

pub mod client;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod retry;
pub mod token;

// Errors
pub use error::{AuthFlowError, CallbackError, HttpError};

// HTTP
pub use client::HttpClient;
pub use retry::RetryStrategy;

// Authorization
pub use host::{
    CallbackListener, CallbackParams, CodeReceiver, DEFAULT_CALLBACK_PATH, DEFAULT_CALLBACK_PORT,
    DEFAULT_CALLBACK_TIMEOUT, LoopbackReceiver, ManualEntryReceiver, RedirectPrompt,
};
pub use token::{AuthorizationRequest, TokenConfig, TokenManager};

// Cart
pub use orchestrator::{CANCELLED_DETAIL, CartOrchestrator, OrchestratorConfig, error_detail};
