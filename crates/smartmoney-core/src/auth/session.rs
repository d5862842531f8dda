use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::api::AuthBackend;
use crate::config::{Config, ValidationStrategy};
use crate::error::{SessionError, SessionResult};
use crate::guard::{GuardDecision, RouteGuard};
use crate::models::{LoginRequest, RegisterRequest, Registration, UpdateUser, UserProfile};

use super::policy;
use super::{Credential, CredentialStore, SessionState};

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub validation: ValidationStrategy,
    pub token_ttl: Duration,
    pub refresh_buffer: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            validation: config.validation,
            token_ttl: config.token_ttl(),
            refresh_buffer: config.refresh_buffer(),
        }
    }
}

/// The shared credential cell. `generation` is bumped by every committed change.
#[derive(Default)]
struct CredentialCell {
    credential: Option<Credential>,
    generation: u64,
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn CredentialStore>,
    options: SessionOptions,
    cell: Mutex<CredentialCell>,
}

/// Single owner of the credential.
///
/// Clone is cheap and every clone shares the same cell, so concurrent
/// futures see one session. State-mutating calls remember the generation
/// they started under and drop their result if it has moved on.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn CredentialStore>,
        options: SessionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                options,
                cell: Mutex::new(CredentialCell::default()),
            }),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    fn cell(&self) -> MutexGuard<'_, CredentialCell> {
        // A poisoned cell still holds a consistent Option; keep using it.
        self.inner.cell.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self) -> (Option<Credential>, u64) {
        let cell = self.cell();
        (cell.credential.clone(), cell.generation)
    }

    fn generation(&self) -> u64 {
        self.cell().generation
    }

    /// Store `credential` if nothing else changed the session since `expected`.
    fn commit(&self, expected: u64, credential: Option<Credential>) -> SessionResult<()> {
        let mut cell = self.cell();
        if cell.generation != expected {
            debug!(expected, current = cell.generation, "Discarding stale session update");
            return Err(SessionError::Superseded);
        }
        cell.generation += 1;
        self.persist(credential.as_ref());
        cell.credential = credential;
        Ok(())
    }

    fn persist(&self, credential: Option<&Credential>) {
        let result = match credential {
            Some(c) => self.inner.store.save(c),
            None => self.inner.store.clear(),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }

    /// Drop the credential unless a newer change already replaced it.
    fn invalidate_if(&self, expected: u64) {
        if self.commit(expected, None).is_ok() {
            info!("Session invalidated");
        }
    }

    /// Read-only snapshot of the current credential.
    pub fn credential(&self) -> Option<Credential> {
        self.cell().credential.clone()
    }

    /// Local view of the session: a credential is present and not expired.
    pub fn session_state(&self) -> SessionState {
        SessionState::from_credential(self.cell().credential.as_ref(), Utc::now())
    }

    /// Gate a navigation against the current snapshot. Never touches the network.
    pub fn guard(&self, guard: &RouteGuard, path: &str) -> GuardDecision {
        let state = self.session_state();
        let decision = guard.evaluate(path, state);
        debug!(path, %state, ?decision, "Route guard evaluated");
        decision
    }

    /// Load a credential persisted by an earlier run.
    pub fn restore(&self) -> SessionResult<SessionState> {
        let stored = self
            .inner
            .store
            .load()
            .map_err(|e| SessionError::Storage(format!("{:#}", e)))?;
        let generation = self.generation();
        match stored {
            Some(credential) if credential.is_expired() => {
                info!("Stored session has expired");
                self.invalidate_if(generation);
            }
            Some(credential) => {
                self.commit(generation, Some(credential))?;
                debug!("Restored stored session");
            }
            None => debug!("No stored session"),
        }
        Ok(self.session_state())
    }

    pub async fn authenticate(&self, request: &LoginRequest) -> SessionResult<Credential> {
        let generation = self.generation();
        info!(email = %request.email, "Authenticating");
        let token = self.inner.backend.login(request).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;
        self.adopt_token(generation, token)
    }

    /// Register a new account. The policy check runs first and never
    /// touches the network.
    pub async fn register(&self, registration: &Registration) -> SessionResult<Credential> {
        let age = policy::check_registration(registration, Utc::now().date_naive())?;
        let generation = self.generation();
        info!(email = %registration.email, "Registering");
        let request = RegisterRequest::from_registration(registration, age);
        let token = self.inner.backend.register(&request).await.map_err(|e| {
            warn!(error = %e, "Registration failed");
            e
        })?;
        self.adopt_token(generation, token)
    }

    fn adopt_token(&self, generation: u64, token: String) -> SessionResult<Credential> {
        let credential = Credential::issue(token, Utc::now(), self.inner.options.token_ttl);
        self.commit(generation, Some(credential.clone()))?;
        info!(expires_at = ?credential.expires_at, "Session established");
        Ok(credential)
    }

    /// Forget the session locally, then tell the backend. The backend call
    /// is best-effort: its failure is logged and the session stays cleared.
    pub async fn logout(&self) {
        let previous = {
            let mut cell = self.cell();
            cell.generation += 1;
            self.persist(None);
            cell.credential.take()
        };
        info!("Logged out locally");

        let Some(credential) = previous else {
            debug!("No credential to revoke");
            return;
        };
        if let Err(e) = self.inner.backend.logout(&credential).await {
            warn!(error = %e, "Backend logout failed");
        }
    }

    /// Exchange the current credential for a new one.
    pub async fn refresh(&self) -> SessionResult<Credential> {
        let (current, generation) = self.snapshot();
        let current = current.ok_or(SessionError::Unauthorized)?;
        debug!("Refreshing session");
        let renewed = self.inner.backend.refresh(&current).await?;
        self.adopt_token(generation, renewed.unwrap_or(current.token))
    }

    /// Refresh ahead of expiry, drop an expired credential.
    ///
    /// Only a rejected refresh (401/403) drops a still-valid credential;
    /// network or server failures leave it in place.
    pub async fn ensure_fresh(&self) -> SessionResult<SessionState> {
        let (current, generation) = self.snapshot();
        let Some(current) = current else {
            return Ok(SessionState::Unauthenticated);
        };
        let now = Utc::now();
        if current.is_expired_at(now) {
            self.invalidate_if(generation);
            return Ok(SessionState::Unauthenticated);
        }
        if !current.needs_refresh_at(now, self.inner.options.refresh_buffer) {
            return Ok(SessionState::Authenticated);
        }
        match self.refresh().await {
            Ok(_) | Err(SessionError::Superseded) => Ok(self.session_state()),
            Err(e @ (SessionError::Unauthorized | SessionError::Forbidden(_))) => {
                warn!(error = %e, "Session refresh rejected");
                self.invalidate_if(generation);
                Ok(SessionState::Unauthenticated)
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed, keeping current credential");
                Ok(self.session_state())
            }
        }
    }

    /// Whether the session is usable, per the configured validation strategy.
    pub async fn is_authenticated(&self) -> bool {
        if !self.session_state().is_authenticated() {
            return false;
        }
        match self.inner.options.validation {
            ValidationStrategy::Local => true,
            ValidationStrategy::Probe => match self.whoami().await {
                Ok(_) => true,
                Err(e) => {
                    debug!(error = %e, "Session probe failed");
                    false
                }
            },
        }
    }

    /// Run `op` with the current credential. On `Unauthorized` the session
    /// is refreshed once and `op` retried once; if that also fails the
    /// credential is dropped.
    async fn authorized<T, F, Fut>(&self, op: F) -> SessionResult<T>
    where
        F: Fn(Credential) -> Fut,
        Fut: Future<Output = SessionResult<T>>,
    {
        let (current, generation) = self.snapshot();
        let current = match current {
            Some(c) if !c.is_expired() => c,
            Some(_) => {
                self.invalidate_if(generation);
                return Err(SessionError::Unauthorized);
            }
            None => return Err(SessionError::Unauthorized),
        };

        match op(current).await {
            Err(SessionError::Unauthorized) => {}
            other => return other,
        }

        debug!("Request unauthorized, attempting one refresh");
        let refreshed = match self.refresh().await {
            Ok(c) => c,
            Err(e) if e.is_transport() => return Err(e),
            Err(SessionError::Superseded) => return Err(SessionError::Unauthorized),
            Err(e) => {
                warn!(error = %e, "Refresh after 401 failed");
                self.invalidate_if(generation);
                return Err(SessionError::Unauthorized);
            }
        };

        let generation = self.generation();
        match op(refreshed).await {
            Err(SessionError::Unauthorized) => {
                warn!("Still unauthorized after refresh");
                self.invalidate_if(generation);
                Err(SessionError::Unauthorized)
            }
            other => other,
        }
    }

    /// `GET /users/me`. The profile is returned, never cached here.
    pub async fn whoami(&self) -> SessionResult<UserProfile> {
        let backend = &self.inner.backend;
        self.authorized(move |c| async move { backend.current_user(&c).await })
            .await
    }

    /// Apply a partial profile update. Field checks run locally first; a
    /// date of birth also sets the age sent to the backend.
    pub async fn update_profile(&self, id: i64, update: &UpdateUser) -> SessionResult<UserProfile> {
        if update.is_empty() {
            return Err(SessionError::PolicyViolation("Nothing to update".to_string()));
        }
        let mut update = update.clone();
        if let Some(dob) = update.date_of_birth {
            update.age = Some(policy::check_birth_date(dob, Utc::now().date_naive())?);
        }
        if let Some(ref email) = update.email {
            policy::check_email(email)?;
        }
        if let Some(ref password) = update.password {
            policy::check_password(password)?;
        }

        let backend = &self.inner.backend;
        let update = &update;
        self.authorized(move |c| async move { backend.update_user(&c, id, update).await })
            .await
    }

    /// Upload a profile picture, returning its URL.
    pub async fn upload_profile_picture(
        &self,
        id: i64,
        file_name: &str,
        bytes: &[u8],
    ) -> SessionResult<String> {
        let backend = &self.inner.backend;
        self.authorized(move |c| async move {
            backend.upload_profile_picture(&c, id, file_name, bytes).await
        })
        .await
    }
}
