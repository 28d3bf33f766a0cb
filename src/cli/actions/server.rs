use crate::{
    api,
    cli::telemetry,
    federated::{GoogleVerifier, IdentityVerifier},
    token::TokenIssuer,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub jwt_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub google_client_id: Option<String>,
    pub google_jwks_url: String,
    pub frontend_base_url: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let tokens = TokenIssuer::new(&args.jwt_secret).with_ttl_seconds(args.token_ttl_seconds);

    let identity_verifier: Option<Arc<dyn IdentityVerifier>> = match args.google_client_id {
        Some(client_id) => {
            info!(jwks_url = %args.google_jwks_url, "Google sign-in enabled");
            let verifier = GoogleVerifier::new(client_id, args.google_jwks_url)
                .context("Failed to build Google token verifier")?;
            Some(Arc::new(verifier))
        }
        None => None,
    };

    let result = api::new(
        args.port,
        &args.dsn,
        tokens,
        identity_verifier,
        args.frontend_base_url.as_deref(),
    )
    .await;

    telemetry::shutdown_tracer();

    result
}
