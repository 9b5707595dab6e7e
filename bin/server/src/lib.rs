//! gatekeeper web server.
//!
//! Delegates login to a hosted identity provider and serves the
//! `/protected` area only to browser sessions that completed that login.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;

#[cfg(test)]
mod testing;
