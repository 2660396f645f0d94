//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};

use prism_shared::types::UserId;

use crate::error::ApiError;

/// Header carrying the owner identity, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Owner of the request, taken from the `X-User-Id` header.
///
/// ```ignore
/// async fn handler(owner: Owner) -> impl IntoResponse {
///     let user_id = owner.user_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Owner(pub UserId);

impl Owner {
    /// Returns the owner's user ID.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.0
    }
}

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::validation("X-User-Id header is required"))?;

        value
            .parse::<UserId>()
            .map(Owner)
            .map_err(|_| ApiError::validation("X-User-Id must be a valid UUID"))
    }
}
