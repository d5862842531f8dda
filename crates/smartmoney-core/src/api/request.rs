use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;

use crate::auth::Credential;

/// Add `Authorization: Bearer <token>` to an outbound request.
///
/// A request that already carries an `Authorization` header is returned
/// untouched, so applying this twice is the same as applying it once.
/// Tokens that cannot be encoded as a header value are not attached.
pub fn attach_credential(mut request: Request, credential: Option<&Credential>) -> Request {
    if request.headers().contains_key(AUTHORIZATION) {
        return request;
    }
    let Some(credential) = credential else {
        return request;
    };
    if let Ok(mut value) = HeaderValue::from_str(&credential.bearer_value()) {
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    request
}
