//! Request and response bodies for the auth endpoints.

use crate::store::PublicUser;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Fields are optional on the wire so that a missing field is reported as a
/// validation error rather than a deserialization rejection.
#[derive(ToSchema, Serialize, Deserialize, Default)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct GoogleLoginRequest {
    #[serde(default, rename = "idToken")]
    pub id_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_request_uses_camel_case_id_token() -> anyhow::Result<()> {
        let request: GoogleLoginRequest = serde_json::from_str(r#"{"idToken":"abc"}"#)?;
        assert_eq!(request.id_token.as_deref(), Some("abc"));
        Ok(())
    }

    #[test]
    fn missing_fields_deserialize_as_none() -> anyhow::Result<()> {
        let request: RegisterRequest = serde_json::from_str("{}")?;
        assert!(request.email.is_none());
        assert!(request.password.is_none());
        assert!(request.name.is_none());
        Ok(())
    }

    #[test]
    fn debug_redacts_passwords() {
        let request = LoginRequest {
            email: Some("a@x.com".to_string()),
            password: Some("pw123456".to_string()),
        };
        let rendered = format!("{request:?}");
        assert!(rendered.contains("a@x.com"));
        assert!(!rendered.contains("pw123456"));
    }
}
