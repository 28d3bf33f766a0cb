//! API handlers for CoastalWatch.

pub mod auth;
pub mod health;
