//! REST API client module for the Createathon platform.
//!
//! This module provides the `ApiClient`, the single choke-point for
//! every network call: it attaches the `Token` authorization header,
//! logs request metadata, and transparently refreshes an expired access
//! token once before retrying the failed request.
//!
//! The server authenticates with DRF token auth: an access token on
//! every request, exchanged via a longer-lived refresh token when the
//! server starts answering 401.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, ValidationErrors};
