//! Auth error taxonomy and its HTTP mapping.
//!
//! Every failure leaves the handler as `{"error": "<message>"}`; internal causes
//! are logged and replaced with a generic message.

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use super::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("User already exists")]
    DuplicateAccount,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Google sign-in is not configured")]
    ProviderNotConfigured,
    #[error("Invalid Google token")]
    InvalidProviderToken,
    #[error("Missing token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::DuplicateAccount
            | Self::InvalidCredentials
            | Self::ProviderNotConfigured
            | Self::InvalidProviderToken => StatusCode::BAD_REQUEST,
            Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::DuplicateAccount,
            StoreError::Backend(err) => Self::Internal(err),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(cause) = &self {
            error!("auth request failed: {cause:?}");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
