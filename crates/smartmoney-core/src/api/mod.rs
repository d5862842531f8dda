//! REST API client module for the Smart Money backend.
//!
//! This module provides the `AuthBackend` trait the session manager talks
//! to, the `ApiClient` reqwest implementation, and `attach_credential`,
//! the single place a bearer token is added to a request.

pub mod backend;
pub mod client;
pub mod request;

pub use backend::AuthBackend;
pub use client::ApiClient;
pub use request::attach_credential;
