//! Navigation gate.
//!
//! Every navigation is classified and checked against the current session
//! state before anything is rendered. No history is kept between calls.

use serde::{Deserialize, Serialize};

use crate::auth::SessionState;

const LOGIN_PATH: &str = "/login";
const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteClass {
    /// Requires an authenticated session.
    Protected,
    /// Login and registration pages; pointless once authenticated.
    Auth,
    /// Static assets and anything unclassified.
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "decision", content = "location", rename_all = "lowercase")]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Route classification table.
///
/// Exact entries match one path. Prefix entries also match every sub-path,
/// so `/profile` covers `/profile/update-profile` but not `/profiles`.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    protected_exact: Vec<String>,
    protected_prefixes: Vec<String>,
    auth_routes: Vec<String>,
    login_path: String,
    home_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new()
            .protect_exact(HOME_PATH)
            .protect_prefix("/dashboard")
            .protect_prefix("/profile")
            .protect_prefix("/settings")
            .protect_prefix("/update-profile")
            .auth_route(LOGIN_PATH)
            .auth_route("/register")
    }
}

impl RouteGuard {
    /// An empty table: every path is public.
    pub fn new() -> Self {
        Self {
            protected_exact: Vec::new(),
            protected_prefixes: Vec::new(),
            auth_routes: Vec::new(),
            login_path: LOGIN_PATH.to_string(),
            home_path: HOME_PATH.to_string(),
        }
    }

    pub fn protect_exact(mut self, path: &str) -> Self {
        self.protected_exact.push(normalize_path(path));
        self
    }

    pub fn protect_prefix(mut self, path: &str) -> Self {
        self.protected_prefixes.push(normalize_path(path));
        self
    }

    pub fn auth_route(mut self, path: &str) -> Self {
        self.auth_routes.push(normalize_path(path));
        self
    }

    pub fn with_login_path(mut self, path: &str) -> Self {
        self.login_path = normalize_path(path);
        self
    }

    pub fn with_home_path(mut self, path: &str) -> Self {
        self.home_path = normalize_path(path);
        self
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        let path = normalize_path(path);
        if self.auth_routes.iter().any(|r| *r == path) {
            return RouteClass::Auth;
        }
        let protected = self.protected_exact.iter().any(|r| *r == path)
            || self.protected_prefixes.iter().any(|p| matches_prefix(p, &path));
        if protected {
            RouteClass::Protected
        } else {
            RouteClass::Public
        }
    }

    pub fn evaluate(&self, path: &str, state: SessionState) -> GuardDecision {
        match (self.classify(path), state) {
            (RouteClass::Protected, SessionState::Unauthenticated) => {
                GuardDecision::Redirect(self.login_path.clone())
            }
            (RouteClass::Auth, SessionState::Authenticated) => {
                GuardDecision::Redirect(self.home_path.clone())
            }
            _ => GuardDecision::Allow,
        }
    }
}

fn matches_prefix(prefix: &str, path: &str) -> bool {
    if prefix == HOME_PATH {
        return path == HOME_PATH;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

/// Strip query and fragment, drop trailing slashes, and make sure the path is rooted.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim().trim_end_matches('/');
    if trimmed.is_empty() {
        HOME_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
