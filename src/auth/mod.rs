//! Authentication module for session lifecycle and credential storage.
//!
//! This module provides:
//! - `CredentialStore`: durable key-value storage for tokens and the
//!   code-language preference
//! - `SessionController`: login/register/logout and the in-memory record
//!   of the current authenticated user
//!
//! Tokens persist across restarts via a JSON file in the config
//! directory; the store falls back to memory-only when that file is
//! unavailable.

pub mod session;
pub mod store;

pub use session::SessionController;
pub use store::{CredentialKey, CredentialStore};
