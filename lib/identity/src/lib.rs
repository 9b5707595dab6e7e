//! Identity provider access for gatekeeper.
//!
//! This crate provides:
//! - Identity provider configuration (`IdentityConfig`)
//! - Ordered discovery of that configuration across deployment
//!   environments (`ResolverChain`)
//! - The `IdentityBroker` boundary and its OAuth2 implementation
//! - Authentication and configuration error types
//!
//! # Example
//!
//! ```
//! use gatekeeper_identity::{ConfigResolver, ServiceBindingResolver};
//!
//! let binding = r#"{
//!     "tenantId": "tenant",
//!     "clientId": "client",
//!     "secret": "secret",
//!     "oauthServerUrl": "https://auth.example.com/oauth/v4/tenant"
//! }"#;
//!
//! let resolver = ServiceBindingResolver::new(
//!     Some(binding.to_string()),
//!     Some("https://app.example.com/index.html".to_string()),
//! );
//! let config = resolver.resolve().unwrap().unwrap();
//!
//! assert_eq!(config.token_endpoint(), "https://auth.example.com/oauth/v4/tenant/token");
//! ```

pub mod broker;
pub mod config;
pub mod error;
pub mod oauth;
pub mod resolve;
pub mod token;

// Re-export main types at crate root
pub use broker::{IdentityBroker, LoginState, TokenSet};
pub use config::{CALLBACK_PATH, IdentityConfig};
pub use error::{AuthenticationError, ConfigError};
pub use oauth::OAuthBroker;
pub use resolve::{
    CloudFoundryResolver, ConfigResolver, DEFAULT_LOCAL_CONFIG, LocalFileResolver, Resolved,
    ResolverChain, ServiceBindingResolver,
};
pub use token::decode_identity_payload;
