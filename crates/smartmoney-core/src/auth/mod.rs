//! Authentication module for managing the user's session.
//!
//! This module provides:
//! - `Credential`: bearer token with acquisition time and optional expiry
//! - `SessionManager`: the single owner of the credential
//! - `CredentialStore`: persistence in memory, a session file, or the OS keychain
//! - `policy`: registration checks that run before any network call
//!
//! Tokens that carry no expiry of their own expire after the configured TTL.

pub mod credential;
pub mod policy;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use credential::{Credential, SessionState};
pub use session::{SessionManager, SessionOptions};
pub use store::{CredentialStore, FileStore, KeyringStore, MemoryStore};
