use super::{
    error::AuthError,
    issue_for,
    state::AuthState,
    types::{AuthResponse, ErrorResponse, RegisterRequest},
    utils::{clean_name, normalize_email, valid_email},
};
use crate::{
    password::hash_password,
    store::{Provider, User},
};
use anyhow::anyhow;
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses (
        (status = 200, description = "Account created", body = AuthResponse, content_type = "application/json"),
        (status = 400, description = "Missing fields or account already exists", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn register(
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<Json<AuthResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload"));
    };

    register_account(&auth, request).await.map(Json)
}

pub(super) async fn register_account(
    auth: &AuthState,
    request: RegisterRequest,
) -> Result<AuthResponse, AuthError> {
    debug!("register: {:?}", request);

    let email = normalize_email(request.email.as_deref().unwrap_or_default());
    let password = request.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::Validation("Email and password are required"));
    }
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email"));
    }

    let password_hash = hash_password(&password).map_err(|e| AuthError::Internal(anyhow!(e)))?;
    let user = User::new(
        email,
        Some(password_hash),
        clean_name(request.name),
        Provider::Local,
    );

    // No existence pre-check: the store's unique constraint decides, so a lost
    // race surfaces as DuplicateAccount instead of overwriting.
    auth.store().insert(&user).await?;

    info!(user_id = %user.id, "registered local account");

    issue_for(auth, &user)
}
