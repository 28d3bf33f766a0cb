use super::{
    http::AuthClient,
    storage::{SessionStorage, StorageError},
};
use crate::store::PublicUser;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "cw_token";
pub const USER_KEY: &str = "cw_user";

/// The signed-in `{user, token}` pair, mirrored into durable storage.
#[derive(Debug)]
pub struct SessionHolder<S: SessionStorage> {
    storage: S,
    user: Option<PublicUser>,
    token: Option<String>,
}

impl<S: SessionStorage> SessionHolder<S> {
    /// Restore the session from `storage`. A stored user that does not parse
    /// is ignored.
    pub fn load(storage: S) -> Self {
        let token = storage.get(TOKEN_KEY).filter(|token| !token.is_empty());
        let user = storage
            .get(USER_KEY)
            .and_then(|raw| match serde_json::from_str::<PublicUser>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    debug!("ignoring malformed stored user: {}", err);
                    None
                }
            });

        Self {
            storage,
            user,
            token,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&PublicUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Store the pair. Nothing changes, in memory or in storage, unless both
    /// keys are written.
    ///
    /// # Errors
    /// Returns an error if the pair cannot be persisted.
    pub fn login(&mut self, user: PublicUser, token: String) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(&user)?;
        let previous_token = self.storage.get(TOKEN_KEY);

        self.storage.set(TOKEN_KEY, &token)?;
        if let Err(err) = self.storage.set(USER_KEY, &serialized) {
            self.restore_token(previous_token.as_deref());
            return Err(err);
        }

        self.user = Some(user);
        self.token = Some(token);
        Ok(())
    }

    fn restore_token(&mut self, previous: Option<&str>) {
        let restored = match previous {
            Some(token) => self.storage.set(TOKEN_KEY, token),
            None => self.storage.remove(TOKEN_KEY),
        };
        if let Err(err) = restored {
            warn!("failed to roll back stored token: {}", err);
        }
    }

    /// # Errors
    /// Returns an error if the keys cannot be removed from storage.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        self.user = None;
        self.token = None;
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)
    }

    /// Trade the current token for a fresh one. Any failure leaves the
    /// current token in place; the caller sees only whether it was renewed.
    pub async fn refresh(&mut self, client: &AuthClient) -> bool {
        let Some(current) = self.token.clone() else {
            return false;
        };

        let renewed = match client.refresh(&current).await {
            Ok(response) => response.token,
            Err(err) => {
                debug!("token refresh failed: {}", err);
                return false;
            }
        };

        if let Err(err) = self.storage.set(TOKEN_KEY, &renewed) {
            warn!("failed to persist refreshed token: {}", err);
            return false;
        }
        self.token = Some(renewed);
        true
    }
}
