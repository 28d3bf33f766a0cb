//! Shared auth state injected into every handler.

use crate::{federated::IdentityVerifier, store::UserStore, token::TokenIssuer};
use std::sync::Arc;

/// Handler dependencies, shared through `axum::Extension`.
pub struct AuthState {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    identity_verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AuthState {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Self {
            store,
            tokens,
            identity_verifier: None,
        }
    }

    /// Enable federated login. Without a verifier, `/api/auth/google` answers
    /// "not configured".
    #[must_use]
    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.identity_verifier = Some(verifier);
        self
    }

    pub(crate) fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    pub(crate) fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub(crate) fn identity_verifier(&self) -> Option<&dyn IdentityVerifier> {
        self.identity_verifier.as_deref()
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("tokens", &self.tokens)
            .field("federated", &self.identity_verifier.is_some())
            .finish_non_exhaustive()
    }
}
