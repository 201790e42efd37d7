//! Host APIs used during authorization.
//!
//! - [`callback`] - Loopback redirect listener and manual code entry

pub mod callback;

pub use callback::{
    CallbackListener, CallbackParams, CodeReceiver, DEFAULT_CALLBACK_PATH, DEFAULT_CALLBACK_PORT,
    DEFAULT_CALLBACK_TIMEOUT, LoopbackReceiver, ManualEntryReceiver, RedirectPrompt,
};
