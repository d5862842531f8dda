use serde::Deserialize;

/// `{success, token, message}` returned by the `/auth` endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TokenEnvelope {
    /// The token, if the backend reported success and sent a non-empty one.
    pub fn token(self) -> Option<String> {
        if self.success == Some(false) {
            return None;
        }
        self.token.filter(|t| !t.trim().is_empty())
    }

    /// Token, or the backend's message explaining why there is none.
    pub fn into_token(self) -> Result<String, String> {
        let message = self.message.clone().filter(|m| !m.is_empty());
        self.token().ok_or_else(|| match message {
            Some(m) => format!("Response did not include a token: {}", m),
            None => "Response did not include a token".to_string(),
        })
    }
}

/// `{success, data, message}` returned by profile mutations.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of an error response, when the backend sends one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
    }
}
