use crate::{
    api::handlers::auth::types::{
        AuthResponse, ErrorResponse, GoogleLoginRequest, LoginRequest, RegisterRequest,
        TokenResponse,
    },
    APP_USER_AGENT,
};
use reqwest::{header::AUTHORIZATION, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body; `message` is its `error` field.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid base URL: {0}")]
    Url(#[from] url::ParseError),
}

/// HTTP client for the `/api/auth/*` endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: Url,
    http: reqwest::Client,
}

impl AuthClient {
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: Url::parse(base_url)?,
            http,
        })
    }

    /// # Errors
    /// Returns the server's message on rejection, or a transport error.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthResponse, ClientError> {
        let body = RegisterRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            name: name.map(str::to_string),
        };
        self.send(self.http.post(self.url("api/auth/register")?).json(&body))
            .await
    }

    /// # Errors
    /// Returns the server's message on rejection, or a transport error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        self.send(self.http.post(self.url("api/auth/login")?).json(&body))
            .await
    }

    /// Exchange a Google ID token for a session.
    ///
    /// # Errors
    /// Returns the server's message on rejection, or a transport error.
    pub async fn google(&self, id_token: &str) -> Result<AuthResponse, ClientError> {
        let body = GoogleLoginRequest {
            id_token: Some(id_token.to_string()),
        };
        self.send(self.http.post(self.url("api/auth/google")?).json(&body))
            .await
    }

    /// # Errors
    /// Returns the server's message on rejection, or a transport error.
    pub async fn refresh(&self, token: &str) -> Result<TokenResponse, ClientError> {
        self.send(
            self.http
                .post(self.url("api/auth/refresh")?)
                .header(AUTHORIZATION, format!("Bearer {token}")),
        )
        .await
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(err) => {
                debug!("error response without JSON body: {}", err);
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            }
        };
        Err(ClientError::Api { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn server_error_message_is_surfaced() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let client = AuthClient::new(&server.uri())?;
        let result = client.login("a@x.com", "wrong").await;
        match result {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn refresh_sends_bearer_token() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .and(header("authorization", "Bearer old-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "new" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = AuthClient::new(&server.uri())?;
        let response = client.refresh("old-token").await?;
        assert_eq!(response.token, "new");
        Ok(())
    }

    #[tokio::test]
    async fn non_json_error_falls_back_to_reason() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/google"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = AuthClient::new(&server.uri())?;
        let err = client.google("id-token").await.err();
        assert!(matches!(
            err,
            Some(ClientError::Api { status, ref message })
                if status == StatusCode::BAD_GATEWAY && message == "Bad Gateway"
        ));
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            AuthClient::new("not a url"),
            Err(ClientError::Url(_))
        ));
    }
}
