//! Credential store.
//!
//! Accounts are keyed by normalized email. Implementations must enforce email
//! uniqueness themselves and report a conflicting insert as
//! [`StoreError::Duplicate`]; callers never rely on a prior existence check.

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an account with this email already exists")]
    Duplicate,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Local,
    Google,
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Self::Local),
            "google" => Ok(Self::Google),
            other => Err(anyhow::anyhow!("unknown provider: {other}")),
        }
    }
}

/// A persisted account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub provider: Provider,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a record for insertion with a fresh id and timestamp.
    #[must_use]
    pub fn new(
        email: String,
        password_hash: Option<String>,
        name: Option<String>,
        provider: Provider,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            provider,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn public_view(&self) -> PublicUser {
        PublicUser {
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// The account fields returned to clients.
#[derive(ToSchema, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up an account by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new account. A taken email yields [`StoreError::Duplicate`].
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_str() {
        for provider in [Provider::Local, Provider::Google] {
            assert_eq!(provider.as_str().parse::<Provider>().ok(), Some(provider));
        }
        assert!("github".parse::<Provider>().is_err());
    }

    #[test]
    fn public_view_omits_credentials() {
        let user = User::new(
            "a@x.com".to_string(),
            Some("$argon2id$...".to_string()),
            None,
            Provider::Local,
        );
        let json = serde_json::to_value(user.public_view()).ok();
        assert_eq!(json, Some(serde_json::json!({ "email": "a@x.com" })));
    }
}
