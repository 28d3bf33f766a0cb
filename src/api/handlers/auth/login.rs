use super::{
    error::AuthError,
    issue_for,
    state::AuthState,
    types::{AuthResponse, ErrorResponse, LoginRequest},
    utils::normalize_email,
};
use crate::password::verify_password;
use anyhow::anyhow;
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful", body = AuthResponse, content_type = "application/json"),
        (status = 400, description = "Missing fields or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn login(
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<AuthResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload"));
    };

    login_account(&auth, request).await.map(Json)
}

pub(super) async fn login_account(
    auth: &AuthState,
    request: LoginRequest,
) -> Result<AuthResponse, AuthError> {
    let email = normalize_email(request.email.as_deref().unwrap_or_default());
    let password = request.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::Validation("Email and password are required"));
    }

    let Some(user) = auth.store().find_by_email(&email).await? else {
        debug!("login for unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    // Google-only accounts have no password to compare against.
    let Some(stored) = user.password_hash.as_deref() else {
        debug!(user_id = %user.id, "password login against federated account");
        return Err(AuthError::InvalidCredentials);
    };

    match verify_password(&password, stored) {
        Ok(true) => issue_for(auth, &user),
        Ok(false) => {
            debug!(user_id = %user.id, "password mismatch");
            Err(AuthError::InvalidCredentials)
        }
        Err(err) => Err(AuthError::Internal(
            anyhow!(err).context("stored password hash unusable"),
        )),
    }
}
