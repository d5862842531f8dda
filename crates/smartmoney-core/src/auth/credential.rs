use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Bearer token plus the times needed to decide whether it is still usable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

impl Credential {
    /// Build a credential for a freshly issued token.
    ///
    /// JWTs carry their own `exp` claim; anything else gets `default_ttl`.
    /// A zero TTL leaves the credential without an expiry.
    pub fn issue(token: String, now: DateTime<Utc>, default_ttl: Duration) -> Self {
        let expires_at = jwt_expiry(&token).or_else(|| {
            if default_ttl > Duration::zero() {
                Some(now + default_ttl)
            } else {
                None
            }
        });
        Self {
            token,
            acquired_at: now,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check if the credential will expire within `buffer` and should be refreshed
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        self.expires_at.map(|exp| now + buffer >= exp).unwrap_or(false)
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|exp| exp - Utc::now())
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.time_until_expiry().map(|d| d.num_minutes().max(0))
    }

    pub fn bearer_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("acquired_at", &self.acquired_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Read the `exp` claim of a JWT without verifying its signature.
/// Returns None for anything that is not a three-part JWT with a numeric `exp`.
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: JwtClaims = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claims.exp?, 0).single()
}

/// Derived authentication status. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SessionState {
    Authenticated,
    Unauthenticated,
}

impl SessionState {
    pub fn from_credential(credential: Option<&Credential>, now: DateTime<Utc>) -> Self {
        match credential {
            Some(c) if !c.is_expired_at(now) => SessionState::Authenticated,
            _ => SessionState::Unauthenticated,
        }
    }

    pub fn is_authenticated(self) -> bool {
        self == SessionState::Authenticated
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Authenticated => write!(f, "Authenticated"),
            SessionState::Unauthenticated => write!(f, "Unauthenticated"),
        }
    }
}

#[cfg(test)]
pub(crate) fn make_jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"iss":"smart-money","sub":"a@b.com","exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_reads_jwt_expiry() {
        let now = Utc::now();
        let exp = now.timestamp() + 3600;
        let cred = Credential::issue(make_jwt(exp), now, Duration::minutes(120));
        assert_eq!(cred.expires_at.map(|e| e.timestamp()), Some(exp));
    }

    #[test]
    fn test_issue_opaque_token_uses_default_ttl() {
        let now = Utc::now();
        let cred = Credential::issue("opaque-session-id".to_string(), now, Duration::minutes(120));
        assert_eq!(cred.expires_at, Some(now + Duration::minutes(120)));

        let forever = Credential::issue("opaque".to_string(), now, Duration::zero());
        assert_eq!(forever.expires_at, None);
        assert!(!forever.is_expired_at(now + Duration::days(365)));
    }

    #[test]
    fn test_malformed_jwt_falls_back() {
        let now = Utc::now();
        let cred = Credential::issue("a.!!!notbase64.c".to_string(), now, Duration::minutes(5));
        assert_eq!(cred.expires_at, Some(now + Duration::minutes(5)));
        assert_eq!(jwt_expiry("a.b.c.d"), None);
    }

    #[test]
    fn test_expiry_and_refresh_window() {
        let now = Utc::now();
        let cred = Credential::issue("t".to_string(), now, Duration::minutes(30));
        assert!(!cred.is_expired_at(now));
        assert!(!cred.needs_refresh_at(now, Duration::minutes(5)));
        assert!(cred.needs_refresh_at(now + Duration::minutes(26), Duration::minutes(5)));
        assert!(cred.is_expired_at(now + Duration::minutes(30)));
    }

    #[test]
    fn test_session_state_derivation() {
        let now = Utc::now();
        let cred = Credential::issue("t".to_string(), now, Duration::minutes(30));
        assert_eq!(SessionState::from_credential(Some(&cred), now), SessionState::Authenticated);
        assert_eq!(
            SessionState::from_credential(Some(&cred), now + Duration::hours(1)),
            SessionState::Unauthenticated
        );
        assert_eq!(SessionState::from_credential(None, now), SessionState::Unauthenticated);
    }

    #[test]
    fn test_debug_redacts_token() {
        let cred = Credential::issue("super-secret".to_string(), Utc::now(), Duration::minutes(1));
        let printed = format!("{:?}", cred);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
