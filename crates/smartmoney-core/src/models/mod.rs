//! Data models for the Smart Money backend.
//!
//! - `UserProfile`, `UpdateUser`: the user record and its partial update
//! - `LoginRequest`, `Registration`, `RegisterRequest`: auth request bodies
//! - Envelope types for the backend's `{success, token|data, message}` replies

pub mod envelope;
pub mod user;

pub use envelope::{DataEnvelope, ErrorBody, TokenEnvelope};
pub use user::{LoginRequest, RegisterRequest, Registration, UpdateUser, UserProfile};
