//! Auth handlers: registration, password login, Google login and token refresh.
//!
//! Each handler validates its input, consults the credential store through
//! [`AuthState`], and answers with a fresh session token. Failures are
//! [`AuthError`]s rendered as `{"error": "<message>"}`.

mod error;
pub mod google;
pub mod login;
pub mod refresh;
pub mod register;
mod state;
pub mod types;
mod utils;

pub use error::AuthError;
pub use state::AuthState;

use crate::{store::User, token::SessionIdentity};
use anyhow::anyhow;
use types::AuthResponse;

/// Sign a session token for `user` and pair it with the public user view.
fn issue_for(auth: &AuthState, user: &User) -> Result<AuthResponse, AuthError> {
    let identity = SessionIdentity {
        user_id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    };
    let token = auth
        .tokens()
        .issue(&identity)
        .map_err(|e| AuthError::Internal(anyhow!(e)))?;

    Ok(AuthResponse {
        token,
        user: user.public_view(),
    })
}
