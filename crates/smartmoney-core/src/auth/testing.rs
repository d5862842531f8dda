//! In-memory backend for session manager tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::AuthBackend;
use crate::error::{SessionError, SessionResult};
use crate::models::{LoginRequest, RegisterRequest, UpdateUser, UserProfile};

use super::session::{SessionManager, SessionOptions};
use super::{Credential, MemoryStore};

/// Answers are queued per endpoint and popped in order. An empty queue
/// answers `MalformedResponse` so a missing script shows up as a failure.
#[derive(Default)]
pub struct ScriptedBackend {
    logins: Mutex<VecDeque<SessionResult<String>>>,
    registers: Mutex<VecDeque<SessionResult<String>>>,
    refreshes: Mutex<VecDeque<SessionResult<Option<String>>>>,
    me: Mutex<VecDeque<SessionResult<UserProfile>>>,
    logout_error: Mutex<Option<SessionError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    me_tokens: Mutex<Vec<String>>,
    last_register: Mutex<Option<RegisterRequest>>,
    login_gate: Mutex<Option<Arc<Notify>>>,
}

fn pop<T>(queue: &Mutex<VecDeque<SessionResult<T>>>, what: &str) -> SessionResult<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(SessionError::MalformedResponse(format!("no scripted {} answer", what))))
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile() -> UserProfile {
        UserProfile {
            id: Some(1),
            name: "Ana".to_string(),
            last_name: "Souza".to_string(),
            email: "ana@example.com".to_string(),
            age: Some(36),
            date_of_birth: None,
            profile_url: None,
        }
    }

    pub fn push_login(&self, answer: SessionResult<String>) {
        self.logins.lock().unwrap().push_back(answer);
    }

    pub fn push_register(&self, answer: SessionResult<String>) {
        self.registers.lock().unwrap().push_back(answer);
    }

    pub fn push_refresh(&self, answer: SessionResult<Option<String>>) {
        self.refreshes.lock().unwrap().push_back(answer);
    }

    pub fn push_me(&self, answer: SessionResult<UserProfile>) {
        self.me.lock().unwrap().push_back(answer);
    }

    pub fn fail_logout(&self, error: SessionError) {
        *self.logout_error.lock().unwrap() = Some(error);
    }

    /// Make logins wait until the returned gate is notified.
    pub fn hold_logins(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.login_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn me_tokens(&self) -> Vec<String> {
        self.me_tokens.lock().unwrap().clone()
    }

    pub fn last_register(&self) -> Option<RegisterRequest> {
        self.last_register.lock().unwrap().clone()
    }

    fn record(&self, endpoint: &'static str) {
        *self.calls.lock().unwrap().entry(endpoint).or_insert(0) += 1;
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, _request: &LoginRequest) -> SessionResult<String> {
        self.record("login");
        let gate = self.login_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        pop(&self.logins, "login")
    }

    async fn register(&self, request: &RegisterRequest) -> SessionResult<String> {
        self.record("register");
        *self.last_register.lock().unwrap() = Some(request.clone());
        pop(&self.registers, "register")
    }

    async fn logout(&self, _credential: &Credential) -> SessionResult<()> {
        self.record("logout");
        match self.logout_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn refresh(&self, _credential: &Credential) -> SessionResult<Option<String>> {
        self.record("refresh");
        pop(&self.refreshes, "refresh")
    }

    async fn current_user(&self, credential: &Credential) -> SessionResult<UserProfile> {
        self.record("me");
        self.me_tokens.lock().unwrap().push(credential.token.clone());
        pop(&self.me, "me")
    }

    async fn update_user(
        &self,
        _credential: &Credential,
        id: i64,
        update: &UpdateUser,
    ) -> SessionResult<UserProfile> {
        self.record("update");
        let mut profile = Self::profile();
        profile.id = Some(id);
        if let Some(ref name) = update.name {
            profile.name = name.clone();
        }
        if let Some(ref email) = update.email {
            profile.email = email.clone();
        }
        Ok(profile)
    }

    async fn upload_profile_picture(
        &self,
        _credential: &Credential,
        id: i64,
        file_name: &str,
        _bytes: &[u8],
    ) -> SessionResult<String> {
        self.record("upload");
        Ok(format!("/uploads/{}/{}", id, file_name))
    }
}

/// A manager over a fresh scripted backend and an in-memory store.
pub fn manager_with(options: SessionOptions) -> (SessionManager, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new());
    let manager = SessionManager::new(backend.clone(), Arc::new(MemoryStore::new()), options);
    (manager, backend)
}
