//! Session token issuer.
//!
//! Session tokens are HS256 JWTs signed with the server secret. They are never
//! stored; validity is signature + expiry only.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Seven days, the lifetime of every issued token unless configured otherwise.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Upper bound accepted for a configured token lifetime (one year).
pub const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("token expiry out of range (issued at {issued_at}, ttl {ttl_seconds}s)")]
    ExpiryOutOfRange { issued_at: i64, ttl_seconds: i64 },
}

/// Identity carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    #[must_use]
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            user_id: self.sub,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Signs and verifies session tokens with a shared HMAC secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token for `identity` expiring `ttl` from now.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(&self, identity: &SessionIdentity) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `issued_at` (unix seconds).
    ///
    /// # Errors
    /// Returns an error if the expiry overflows or signing fails.
    pub fn issue_at(&self, identity: &SessionIdentity, issued_at: i64) -> Result<String, TokenError> {
        let exp = issued_at
            .checked_add(self.ttl_seconds)
            .ok_or(TokenError::ExpiryOutOfRange {
                issued_at,
                ttl_seconds: self.ttl_seconds,
            })?;
        let claims = SessionClaims {
            sub: identity.user_id,
            email: identity.email.clone(),
            name: identity.name.clone(),
            iat: issued_at,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Sign)
    }

    /// Verify signature and expiry and return the claims.
    ///
    /// # Errors
    /// Returns [`TokenError::Invalid`] for a bad signature, malformed token, or
    /// an expired token (no leeway).
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }

    /// Verify `token` and re-sign its identity with a renewed expiry.
    ///
    /// # Errors
    /// Returns [`TokenError::Invalid`] if `token` does not verify.
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.verify(token)?;
        self.issue(&claims.identity())
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&SecretString::from(
            "0123456789abcdef0123456789abcdef".to_string(),
        ))
    }

    fn identity() -> SessionIdentity {
        SessionIdentity {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: Some("Alice".to_string()),
        }
    }

    #[test]
    fn issued_token_expires_after_seven_days() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let token = issuer.issue_at(&identity(), now).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.iat, now);
        assert_eq!(claims.exp, now + 7 * 24 * 60 * 60);
    }

    #[test]
    fn verify_returns_identity_claims() {
        let issuer = issuer();
        let id = identity();
        let token = issuer.issue(&id).unwrap();

        assert_eq!(issuer.verify(&token).unwrap().identity(), id);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let issuer = issuer();
        let long_ago = Utc::now().timestamp() - DEFAULT_TOKEN_TTL_SECONDS - 10;
        let token = issuer.issue_at(&identity(), long_ago).unwrap();

        assert!(matches!(issuer.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn verify_rejects_foreign_signature() {
        let other = TokenIssuer::new(&SecretString::from(
            "ffffffffffffffffffffffffffffffff".to_string(),
        ));
        let token = other.issue(&identity()).unwrap();

        assert!(issuer().verify(&token).is_err());
        assert!(issuer().verify("not.a.jwt").is_err());
    }

    #[test]
    fn refresh_keeps_identity_and_slides_expiry() {
        let issuer = issuer();
        let id = identity();
        let issued_at = Utc::now().timestamp() - 3600;
        let original = issuer.issue_at(&id, issued_at).unwrap();

        let before = Utc::now().timestamp();
        let refreshed = issuer.refresh(&original).unwrap();
        let after = Utc::now().timestamp();

        let claims = issuer.verify(&refreshed).unwrap();
        assert_eq!(claims.identity(), id);
        assert!(claims.exp >= before + DEFAULT_TOKEN_TTL_SECONDS);
        assert!(claims.exp <= after + DEFAULT_TOKEN_TTL_SECONDS);
    }

    #[test]
    fn custom_ttl_is_applied() {
        let issuer = issuer().with_ttl_seconds(60);
        let token = issuer.issue_at(&identity(), Utc::now().timestamp()).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn overflowing_expiry_is_an_error() {
        let unbounded = issuer().with_ttl_seconds(i64::MAX);
        assert!(matches!(
            unbounded.issue(&identity()),
            Err(TokenError::ExpiryOutOfRange { .. })
        ));

        assert!(matches!(
            issuer().issue_at(&identity(), i64::MAX),
            Err(TokenError::ExpiryOutOfRange { .. })
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", issuer());
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
