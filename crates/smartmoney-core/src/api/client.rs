//! HTTP client for the Smart Money REST backend.
//!
//! Every request goes through `attach_credential`, so the bearer header is
//! added in exactly one place.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{multipart, Client, Request, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::auth::Credential;
use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::models::{
    DataEnvelope, ErrorBody, LoginRequest, RegisterRequest, TokenEnvelope, UpdateUser, UserProfile,
};

use super::{attach_credential, AuthBackend};

/// Multipart field name the backend reads the picture from
const PROFILE_IMAGE_FIELD: &str = "profileImage";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedPicture {
    profile_url: Option<String>,
}

/// API client for the Smart Money backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decorate and send a request. Only transport failures are errors here.
    async fn execute(&self, request: Request, credential: Option<&Credential>) -> SessionResult<Response> {
        let request = attach_credential(request, credential);
        let method = request.method().clone();
        let url = request.url().to_string();
        debug!(%method, url = %url, "Sending request");
        self.client.execute(request).await.map_err(|e| {
            warn!(%method, url = %url, error = %e, "Request failed");
            SessionError::NetworkError(e.to_string())
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> SessionResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(SessionError::from_status(status, &body))
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> SessionResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| SessionError::MalformedResponse(e.to_string()))
    }

    /// Shared path for login and register: both answer with a token envelope
    /// and both turn 4xx into a credential rejection.
    async fn token_call(&self, request: Request) -> SessionResult<String> {
        let response = self.execute(request, None).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::from_auth_status(
                status,
                ErrorBody::message_from(&body),
                &body,
            ));
        }
        let envelope: TokenEnvelope = Self::read_json(response).await?;
        envelope.into_token().map_err(SessionError::MalformedResponse)
    }

    fn build(&self, builder: reqwest::RequestBuilder) -> SessionResult<Request> {
        builder
            .build()
            .map_err(|e| SessionError::NetworkError(format!("Failed to build request: {}", e)))
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, request: &LoginRequest) -> SessionResult<String> {
        let req = self.build(self.client.post(self.url("/auth/login")).json(request))?;
        self.token_call(req).await
    }

    async fn register(&self, request: &RegisterRequest) -> SessionResult<String> {
        let req = self.build(self.client.post(self.url("/auth/register")).json(request))?;
        self.token_call(req).await
    }

    async fn logout(&self, credential: &Credential) -> SessionResult<()> {
        let req = self.build(self.client.post(self.url("/auth/logout")))?;
        let response = self.execute(req, Some(credential)).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn refresh(&self, credential: &Credential) -> SessionResult<Option<String>> {
        let req = self.build(self.client.post(self.url("/auth/refresh")))?;
        let response = self.execute(req, Some(credential)).await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let envelope: TokenEnvelope = serde_json::from_str(&text)?;
        Ok(envelope.token())
    }

    async fn current_user(&self, credential: &Credential) -> SessionResult<UserProfile> {
        let req = self.build(self.client.get(self.url("/users/me")))?;
        let response = self.execute(req, Some(credential)).await?;
        let response = Self::check_response(response).await?;
        Self::read_json(response).await
    }

    async fn update_user(
        &self,
        credential: &Credential,
        id: i64,
        update: &UpdateUser,
    ) -> SessionResult<UserProfile> {
        let req = self.build(self.client.put(self.url(&format!("/users/{}", id))).json(update))?;
        let response = self.execute(req, Some(credential)).await?;
        let response = Self::check_response(response).await?;
        let envelope: DataEnvelope<UserProfile> = Self::read_json(response).await?;
        if envelope.success == Some(false) {
            return Err(SessionError::ServerError(
                envelope.message.unwrap_or_else(|| "Failed to update user".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| SessionError::MalformedResponse("Update response did not include the user".to_string()))
    }

    async fn upload_profile_picture(
        &self,
        credential: &Credential,
        id: i64,
        file_name: &str,
        bytes: &[u8],
    ) -> SessionResult<String> {
        let part = multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = multipart::Form::new().part(PROFILE_IMAGE_FIELD, part);
        let req = self.build(
            self.client
                .put(self.url(&format!("/users/{}/upload-profile", id)))
                .multipart(form),
        )?;
        let response = self.execute(req, Some(credential)).await?;
        let response = Self::check_response(response).await?;
        let envelope: DataEnvelope<UploadedPicture> = Self::read_json(response).await?;
        envelope
            .data
            .and_then(|d| d.profile_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                SessionError::MalformedResponse(
                    envelope
                        .message
                        .unwrap_or_else(|| "Upload response did not include a picture URL".to_string()),
                )
            })
    }
}
