//! Error types for the identity crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthenticationError`: failures talking to the identity provider or
//!   interpreting what it returned
//! - `ConfigError`: failures resolving the identity provider configuration

use std::fmt;

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The provider answered and refused the grant.
    ProviderRejected { reason: String },
    /// The provider could not be reached or answered with garbage.
    ProviderUnavailable { reason: String },
    /// The token response carried no identity token.
    MissingIdentityToken,
    /// The identity token could not be decoded.
    MalformedIdentityToken { reason: String },
    /// The broker could not be built from its configuration.
    Configuration { reason: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderRejected { reason } => {
                write!(f, "identity provider rejected the request: {reason}")
            }
            Self::ProviderUnavailable { reason } => {
                write!(f, "identity provider unavailable: {reason}")
            }
            Self::MissingIdentityToken => {
                write!(f, "token response has no identity token")
            }
            Self::MalformedIdentityToken { reason } => {
                write!(f, "malformed identity token: {reason}")
            }
            Self::Configuration { reason } => {
                write!(f, "identity broker configuration error: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from resolving identity provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A source exists but could not be read.
    Unreadable { source: String, reason: String },
    /// A source was read but is not valid configuration.
    Malformed { source: String, reason: String },
    /// A source is valid but lacks a required field.
    MissingField { source: String, field: String },
    /// No resolver produced a configuration.
    NoneApplicable { attempted: Vec<String> },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { source, reason } => {
                write!(f, "cannot read {source}: {reason}")
            }
            Self::Malformed { source, reason } => {
                write!(f, "malformed configuration in {source}: {reason}")
            }
            Self::MissingField { source, field } => {
                write!(f, "{source} is missing required field '{field}'")
            }
            Self::NoneApplicable { attempted } => {
                write!(
                    f,
                    "no identity provider configuration found (tried: {})",
                    attempted.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
