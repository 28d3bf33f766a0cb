//! # CoastalWatch (authentication backend)
//!
//! `coastalwatch` issues and refreshes session tokens for the CoastalWatch
//! coastal monitoring front-end.
//!
//! ## Accounts
//!
//! Accounts are keyed by normalized email (trimmed, lowercase). Uniqueness is
//! enforced by the credential store itself, so a registration that loses a race
//! against another registration for the same email is reported as a duplicate
//! instead of overwriting the winner.
//!
//! - **Local accounts** carry an Argon2id password hash.
//! - **Google accounts** are created on first Google sign-in and never carry a
//!   password hash, so password login against them always fails.
//!
//! ## Session tokens
//!
//! Tokens are stateless HS256 JWTs (`sub`, `email`, `name`, `iat`, `exp`).
//! Nothing is stored server side; a token is valid until it expires. Refresh
//! re-signs the same identity claims with a renewed expiry (sliding window).
//!
//! ## Client session
//!
//! The [`client`] module holds the browser-side half of the flow: a session
//! holder that persists `{user, token}` in durable key-value storage and an HTTP
//! client for the auth endpoints.

pub mod api;
pub mod cli;
pub mod client;
pub mod federated;
pub mod password;
pub mod store;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
