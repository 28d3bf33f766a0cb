use crate::{
    federated::GOOGLE_JWKS_URL,
    token::{DEFAULT_TOKEN_TTL_SECONDS, MAX_TOKEN_TTL_SECONDS},
};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_JWKS_URL: &str = "google-jwks-url";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

/// HS256 signing secrets shorter than this are refused at startup.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub google_client_id: Option<String>,
    pub google_jwks_url: String,
    pub frontend_base_url: Option<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if the signing secret is missing or too short, or the TTL is out of range.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .cloned()
            .context("missing required argument: --jwt-secret")?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            anyhow::bail!("--jwt-secret must be at least {MIN_JWT_SECRET_BYTES} bytes");
        }

        let token_ttl_seconds = matches
            .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);
        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&token_ttl_seconds) {
            anyhow::bail!("--token-ttl-seconds must be between 1 and {MAX_TOKEN_TTL_SECONDS}");
        }

        let google_client_id = matches
            .get_one::<String>(ARG_GOOGLE_CLIENT_ID)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let google_jwks_url = matches
            .get_one::<String>(ARG_GOOGLE_JWKS_URL)
            .cloned()
            .unwrap_or_else(|| GOOGLE_JWKS_URL.to_string());

        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            token_ttl_seconds,
            google_client_id,
            google_jwks_url,
            frontend_base_url,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens (at least 32 bytes)")
                .env("COASTALWATCH_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token lifetime in seconds")
                .env("COASTALWATCH_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id; Google sign-in is disabled when unset")
                .env("COASTALWATCH_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_JWKS_URL)
                .long(ARG_GOOGLE_JWKS_URL)
                .help("URL of Google's ID token signing keys")
                .env("COASTALWATCH_GOOGLE_JWKS_URL")
                .default_value(GOOGLE_JWKS_URL),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin allowed by CORS; any origin is allowed when unset")
                .env("COASTALWATCH_FRONTEND_BASE_URL"),
        )
}
