//! Federated identity verification.
//!
//! A federated login hands the server an ID token minted by a third-party
//! identity provider. The verifier checks it and yields the identity the
//! account is keyed on.

mod google;

pub use google::{GoogleVerifier, Jwk, Jwks, GOOGLE_ISSUERS, GOOGLE_JWKS_URL};

#[cfg(test)]
pub(crate) use google::test_keys;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FederatedError {
    #[error("malformed identity token: {0}")]
    Malformed(String),
    #[error("unknown signing key id: {0}")]
    UnknownKid(String),
    #[error("identity token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
    #[error("identity token has no email")]
    MissingEmail,
    #[error("identity provider has not verified the email")]
    UnverifiedEmail,
    #[error("failed to fetch signing keys: {0}")]
    Keyset(String),
}

/// The verified identity extracted from a provider token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `id_token` and return the identity it asserts.
    async fn verify(&self, id_token: &str) -> Result<FederatedIdentity, FederatedError>;
}
