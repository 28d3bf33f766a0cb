use super::{
    error::AuthError,
    issue_for,
    state::AuthState,
    types::{AuthResponse, ErrorResponse, GoogleLoginRequest},
    utils::{clean_name, normalize_email},
};
use crate::store::{Provider, StoreError, User};
use anyhow::anyhow;
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = GoogleLoginRequest,
    responses (
        (status = 200, description = "Login successful", body = AuthResponse, content_type = "application/json"),
        (status = 400, description = "Google sign-in not configured or ID token invalid", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn google(
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<GoogleLoginRequest>>,
) -> Result<Json<AuthResponse>, AuthError> {
    google_login(&auth, payload.map(|Json(request)| request).unwrap_or_default())
        .await
        .map(Json)
}

pub(super) async fn google_login(
    auth: &AuthState,
    request: GoogleLoginRequest,
) -> Result<AuthResponse, AuthError> {
    let verifier = auth
        .identity_verifier()
        .ok_or(AuthError::ProviderNotConfigured)?;

    let id_token = request
        .id_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::Validation("idToken is required"))?;

    let identity = verifier.verify(id_token).await.map_err(|err| {
        debug!(error = %err, "Google ID token rejected");
        AuthError::InvalidProviderToken
    })?;

    let email = normalize_email(&identity.email);
    let user = find_or_create(auth, email, clean_name(identity.name)).await?;

    issue_for(auth, &user)
}

/// Reuse the account for `email` or create a Google account for it.
///
/// Two first-time logins may race; the loser's insert hits the unique
/// constraint and it re-reads the winner's record.
async fn find_or_create(
    auth: &AuthState,
    email: String,
    name: Option<String>,
) -> Result<User, AuthError> {
    if let Some(user) = auth.store().find_by_email(&email).await? {
        return Ok(user);
    }

    let user = User::new(email, None, name, Provider::Google);
    match auth.store().insert(&user).await {
        Ok(()) => {
            info!(user_id = %user.id, "created Google account");
            Ok(user)
        }
        Err(StoreError::Duplicate) => {
            warn!("concurrent first Google login, reusing existing account");
            auth.store()
                .find_by_email(&user.email)
                .await?
                .ok_or_else(|| AuthError::Internal(anyhow!("account vanished after conflict")))
        }
        Err(err) => Err(err.into()),
    }
}
