use async_trait::async_trait;

use crate::auth::Credential;
use crate::error::SessionResult;
use crate::models::{LoginRequest, RegisterRequest, UpdateUser, UserProfile};

/// The REST backend as seen by the session manager.
///
/// Implementations map transport failures to `SessionError::NetworkError`
/// and explicit rejections to the other variants. They never retry.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST /auth/login`, returning the issued token.
    async fn login(&self, request: &LoginRequest) -> SessionResult<String>;

    /// `POST /auth/register`, returning the issued token.
    async fn register(&self, request: &RegisterRequest) -> SessionResult<String>;

    /// `POST /auth/logout`.
    async fn logout(&self, credential: &Credential) -> SessionResult<()>;

    /// `POST /auth/refresh`. `None` means the backend extended the session
    /// without issuing a new token.
    async fn refresh(&self, credential: &Credential) -> SessionResult<Option<String>>;

    /// `GET /users/me`.
    async fn current_user(&self, credential: &Credential) -> SessionResult<UserProfile>;

    /// `PUT /users/{id}`.
    async fn update_user(
        &self,
        credential: &Credential,
        id: i64,
        update: &UpdateUser,
    ) -> SessionResult<UserProfile>;

    /// `PUT /users/{id}/upload-profile`, returning the new picture URL.
    async fn upload_profile_picture(
        &self,
        credential: &Credential,
        id: i64,
        file_name: &str,
        bytes: &[u8],
    ) -> SessionResult<String>;
}
