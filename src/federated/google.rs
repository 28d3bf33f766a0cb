//! Google ID token verification.
//!
//! Signing keys come from Google's JWKS endpoint and are cached in memory. The
//! cache is refreshed when it is older than [`KEYSET_CACHE_TTL_SECONDS`] or when
//! a token names a `kid` we have not seen, throttled by
//! [`KEYSET_REFRESH_COOLDOWN_SECONDS`]. A failed refresh keeps the last keyset.

use super::{FederatedError, FederatedIdentity, IdentityVerifier};
use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime},
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

const KEYSET_CACHE_TTL_SECONDS: u64 = 3600;
const KEYSET_REFRESH_COOLDOWN_SECONDS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Parse a JWKS document.
    ///
    /// # Errors
    /// Returns an error if `json` is not a JWKS document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid JWKS document")
    }

    fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: Option<String>,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

impl Jwk {
    fn decoding_key(&self) -> Result<DecodingKey, FederatedError> {
        if self.kty != "RSA" {
            return Err(FederatedError::Keyset(format!(
                "unsupported key type: {}",
                self.kty
            )));
        }
        let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
            return Err(FederatedError::Keyset("RSA key without n/e".to_string()));
        };
        DecodingKey::from_rsa_components(n, e).map_err(|e| FederatedError::Keyset(e.to_string()))
    }
}

#[derive(Debug)]
enum KeysetSource {
    /// Keys supplied up front and never refreshed.
    Static,
    /// Keys fetched from a JWKS URL and refreshed as needed.
    Remote { url: String, client: Client },
}

#[derive(Debug)]
struct KeysetCache {
    jwks: Jwks,
    /// `None` until the first successful fetch.
    fetched_at: Option<Instant>,
}

impl KeysetCache {
    fn is_fresh(&self) -> bool {
        self.fetched_at
            .is_some_and(|at| at.elapsed() < Duration::from_secs(KEYSET_CACHE_TTL_SECONDS))
    }
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    // Google has historically sent this as both a bool and a string.
    email_verified: Option<serde_json::Value>,
    name: Option<String>,
}

impl GoogleClaims {
    fn email_unverified(&self) -> bool {
        match &self.email_verified {
            Some(serde_json::Value::Bool(verified)) => !verified,
            Some(serde_json::Value::String(verified)) => verified != "true",
            _ => false,
        }
    }
}

/// Verifies Google ID tokens for one OAuth client id.
#[derive(Debug)]
pub struct GoogleVerifier {
    client_id: String,
    source: KeysetSource,
    cache: RwLock<KeysetCache>,
    last_refresh_unix: AtomicU64,
}

impl GoogleVerifier {
    /// Build a verifier that fetches keys from `jwks_url` on first use.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(client_id: String, jwks_url: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build JWKS HTTP client")?;

        Ok(Self {
            client_id,
            source: KeysetSource::Remote {
                url: jwks_url,
                client,
            },
            cache: RwLock::new(KeysetCache {
                jwks: Jwks { keys: Vec::new() },
                fetched_at: None,
            }),
            last_refresh_unix: AtomicU64::new(0),
        })
    }

    /// Build a verifier over a fixed keyset.
    #[must_use]
    pub fn with_static_keys(client_id: String, jwks: Jwks) -> Self {
        Self {
            client_id,
            source: KeysetSource::Static,
            cache: RwLock::new(KeysetCache {
                jwks,
                fetched_at: Some(Instant::now()),
            }),
            last_refresh_unix: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, FederatedError> {
        {
            let cache = self.cache.read().await;
            let fresh = matches!(self.source, KeysetSource::Static) || cache.is_fresh();
            if fresh {
                if let Some(jwk) = cache.jwks.find(kid) {
                    return jwk.decoding_key();
                }
            }
        }

        if let KeysetSource::Remote { url, client } = &self.source {
            let now = now_unix_seconds();
            let last = self.last_refresh_unix.load(Ordering::Relaxed);
            // The first fetch is never throttled; every later one is, stale or not.
            if last == 0 || now.saturating_sub(last) >= KEYSET_REFRESH_COOLDOWN_SECONDS {
                self.last_refresh_unix.store(now, Ordering::Relaxed);
                match fetch_jwks(client, url).await {
                    Ok(jwks) => {
                        info!(keys = jwks.keys.len(), "refreshed Google signing keys");
                        let mut cache = self.cache.write().await;
                        cache.jwks = jwks;
                        cache.fetched_at = Some(Instant::now());
                    }
                    Err(err) => warn!(url = %url, error = %err, "Google JWKS refresh failed"),
                }
            } else {
                debug!(kid, "JWKS refresh throttled");
            }
        }

        let cache = self.cache.read().await;
        cache
            .jwks
            .find(kid)
            .ok_or_else(|| FederatedError::UnknownKid(kid.to_string()))?
            .decoding_key()
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    #[instrument(skip(self, id_token))]
    async fn verify(&self, id_token: &str) -> Result<FederatedIdentity, FederatedError> {
        let header =
            decode_header(id_token).map_err(|e| FederatedError::Malformed(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(FederatedError::Malformed(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| FederatedError::Malformed("missing kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let claims = decode::<GoogleClaims>(id_token, &key, &validation)
            .map_err(FederatedError::Rejected)?
            .claims;

        if claims.email_unverified() {
            return Err(FederatedError::UnverifiedEmail);
        }
        let email = claims
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or(FederatedError::MissingEmail)?;

        Ok(FederatedIdentity {
            subject: claims.sub,
            email,
            name: claims.name.filter(|name| !name.trim().is_empty()),
        })
    }
}

async fn fetch_jwks(client: &Client, url: &str) -> Result<Jwks, FederatedError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FederatedError::Keyset(e.to_string()))?
        .error_for_status()
        .map_err(|e| FederatedError::Keyset(e.to_string()))?;

    response
        .json::<Jwks>()
        .await
        .map_err(|e| FederatedError::Keyset(e.to_string()))
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
