use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::auth::jwt::TokenKind;
use crate::auth::repo::User;
use crate::error::ApiError;
use crate::state::AppState;

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
fn parse_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .filter(|token| !token.is_empty())
}

/// Route guard for protected handlers. Verifies the bearer token as an
/// access token and resolves its subject against the store, so handlers get
/// a live `User`, not just a claim.
#[derive(Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(NOT_AUTHORIZED.into()))?;

        let token =
            parse_bearer(header).ok_or_else(|| ApiError::Unauthorized(NOT_AUTHORIZED.into()))?;

        let claims = state
            .auth
            .keys()
            .verify(token, TokenKind::Access)
            .map_err(|_| {
                warn!("rejected invalid or expired access token");
                ApiError::Unauthorized(NOT_AUTHORIZED.into())
            })?;

        let user = state
            .auth
            .store()
            .find_by_id(claims.sub)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        Ok(CurrentUser(user))
    }
}
