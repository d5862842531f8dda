//! Smart Money session client.
//!
//! Authenticates against the Smart Money REST backend, keeps the bearer
//! credential, decorates outbound requests with it, refreshes it before it
//! expires, and gates navigation through a route guard.
//!
//! ```no_run
//! use std::sync::Arc;
//! use smartmoney_core::{ApiClient, Config, LoginRequest, RouteGuard, SessionManager, SessionOptions};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut config = Config::load()?;
//! config.apply_env_overrides(|key| std::env::var(key).ok());
//! let manager = SessionManager::new(
//!     Arc::new(ApiClient::from_config(&config)?),
//!     config.build_store()?,
//!     SessionOptions::from_config(&config),
//! );
//! manager.restore()?;
//! manager.authenticate(&LoginRequest::new("ana@example.com", "hunter22")).await?;
//! let decision = manager.guard(&RouteGuard::default(), "/login");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;

pub use api::{attach_credential, ApiClient, AuthBackend};
pub use auth::{Credential, CredentialStore, SessionManager, SessionOptions, SessionState};
pub use config::{Config, StoreKind, ValidationStrategy};
pub use error::{SessionError, SessionResult};
pub use guard::{GuardDecision, RouteClass, RouteGuard};
pub use models::{LoginRequest, Registration, UpdateUser, UserProfile};
