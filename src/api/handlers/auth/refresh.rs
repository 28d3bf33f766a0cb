use super::{
    error::AuthError,
    state::AuthState,
    types::{ErrorResponse, TokenResponse},
    utils::bearer_token,
};
use crate::token::TokenError;
use anyhow::anyhow;
use axum::{extract::Extension, http::HeaderMap, Json};
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses (
        (status = 200, description = "Token re-signed with a renewed expiry", body = TokenResponse, content_type = "application/json"),
        (status = 401, description = "Missing, expired or forged token", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, headers))]
pub async fn refresh(
    auth: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;
    refresh_token(&auth, &token).map(Json)
}

/// Sliding-window refresh: no check that the account still exists.
pub(super) fn refresh_token(auth: &AuthState, token: &str) -> Result<TokenResponse, AuthError> {
    let token = auth.tokens().refresh(token).map_err(|err| match err {
        TokenError::Invalid(_) => {
            debug!(error = %err, "refresh rejected");
            AuthError::InvalidToken
        }
        TokenError::Sign(_) | TokenError::ExpiryOutOfRange { .. } => {
            AuthError::Internal(anyhow!(err))
        }
    })?;

    Ok(TokenResponse { token })
}
