//! Discovery of the identity provider configuration.
//!
//! Deployment environments hand over credentials in different ways: a local
//! JSON file during development, a service-binding environment variable on
//! Kubernetes, or the Cloud Foundry `VCAP_*` variables. Each mechanism is a
//! [`ConfigResolver`]; a [`ResolverChain`] tries them in a fixed order and
//! the first one that applies wins.
//!
//! A resolver returns `Ok(None)` when its mechanism is not present at all,
//! and an error when it is present but unusable. Errors stop the chain: a
//! half-configured deployment must not silently fall through to another
//! source.

use gatekeeper_core::Result;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::{CALLBACK_PATH, IdentityConfig};
use crate::error::ConfigError;

/// Environment variable holding the service-binding credential JSON.
pub const SERVICE_BINDING_VAR: &str = "APPID_SERVICE_BINDING";

/// Environment variable holding the redirect URI for service bindings.
pub const REDIRECT_URI_VAR: &str = "redirectUri";

/// Cloud Foundry application metadata variable.
pub const VCAP_APPLICATION_VAR: &str = "VCAP_APPLICATION";

/// Cloud Foundry bound-services variable.
pub const VCAP_SERVICES_VAR: &str = "VCAP_SERVICES";

/// Default path of the local development configuration file.
pub const DEFAULT_LOCAL_CONFIG: &str = "localdev-config.json";

/// A single configuration source.
pub trait ConfigResolver: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Returns the configuration, `None` if this source is not present.
    fn resolve(&self) -> Result<Option<IdentityConfig>, ConfigError>;
}

/// A configuration together with the resolver that produced it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub source: &'static str,
    pub config: IdentityConfig,
}

/// Ordered list of resolvers.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ConfigResolver>>,
}

impl ResolverChain {
    /// Creates a chain that tries `resolvers` in order.
    #[must_use]
    pub fn new(resolvers: Vec<Box<dyn ConfigResolver>>) -> Self {
        Self { resolvers }
    }

    /// The standard chain: local file, service binding, Cloud Foundry.
    ///
    /// Environment variables are read once, here.
    #[must_use]
    pub fn standard(local_config: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Box::new(LocalFileResolver::new(local_config)),
            Box::new(ServiceBindingResolver::from_env()),
            Box::new(CloudFoundryResolver::from_env()),
        ])
    }

    /// Runs the chain.
    ///
    /// # Errors
    ///
    /// Returns the first resolver error, or `NoneApplicable` if every
    /// resolver reported that its source is absent.
    pub fn resolve(&self) -> Result<Resolved, ConfigError> {
        let mut attempted = Vec::with_capacity(self.resolvers.len());

        for resolver in &self.resolvers {
            attempted.push(resolver.name().to_string());
            match resolver.resolve()? {
                Some(config) => {
                    tracing::debug!(resolver = resolver.name(), "identity configuration resolved");
                    return Ok(Resolved {
                        source: resolver.name(),
                        config,
                    });
                }
                None => {
                    tracing::debug!(resolver = resolver.name(), "configuration source not present");
                }
            }
        }

        Err(ConfigError::NoneApplicable { attempted }.into())
    }
}

/// Credential fields as issued by the provider. All optional so that the
/// caller can report exactly which one is missing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    tenant_id: Option<String>,
    client_id: Option<String>,
    secret: Option<String>,
    oauth_server_url: Option<String>,
    redirect_uri: Option<String>,
}

impl Credentials {
    fn parse(source: &str, json: &str) -> Result<Self, ConfigError> {
        Ok(
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed {
                source: source.to_string(),
                reason: e.to_string(),
            })?,
        )
    }

    fn into_config(self, source: &str) -> Result<IdentityConfig, ConfigError> {
        Ok(IdentityConfig::new(
            required(self.tenant_id, source, "tenantId")?,
            required(self.client_id, source, "clientId")?,
            required(self.secret, source, "secret")?,
            required(self.oauth_server_url, source, "oauthServerUrl")?,
            required(self.redirect_uri, source, "redirectUri")?,
        ))
    }
}

fn required(value: Option<String>, source: &str, field: &str) -> Result<String, ConfigError> {
    Ok(value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            source: source.to_string(),
            field: field.to_string(),
        })?)
}

/// Reads a JSON credential file from disk.
pub struct LocalFileResolver {
    path: PathBuf,
}

impl LocalFileResolver {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigResolver for LocalFileResolver {
    fn name(&self) -> &'static str {
        "local file"
    }

    fn resolve(&self) -> Result<Option<IdentityConfig>, ConfigError> {
        if !self.path.is_file() {
            return Ok(None);
        }

        let source = self.path.display().to_string();
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Unreadable {
                source: source.clone(),
                reason: e.to_string(),
            })?;

        Credentials::parse(&source, &contents)?
            .into_config(&source)
            .map(Some)
    }
}

/// Reads credentials from a service-binding JSON blob.
///
/// The blob usually lacks the redirect URI, which is supplied separately.
/// When both are present the separate value wins.
pub struct ServiceBindingResolver {
    binding: Option<String>,
    redirect_uri: Option<String>,
}

impl ServiceBindingResolver {
    #[must_use]
    pub fn new(binding: Option<String>, redirect_uri: Option<String>) -> Self {
        Self {
            binding,
            redirect_uri,
        }
    }

    /// Snapshots `APPID_SERVICE_BINDING` and `redirectUri`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(SERVICE_BINDING_VAR).ok(),
            std::env::var(REDIRECT_URI_VAR).ok(),
        )
    }
}

impl ConfigResolver for ServiceBindingResolver {
    fn name(&self) -> &'static str {
        "service binding"
    }

    fn resolve(&self) -> Result<Option<IdentityConfig>, ConfigError> {
        let Some(binding) = &self.binding else {
            return Ok(None);
        };

        let mut credentials = Credentials::parse(SERVICE_BINDING_VAR, binding)?;
        if let Some(uri) = &self.redirect_uri {
            credentials.redirect_uri = Some(uri.clone());
        }

        credentials.into_config(SERVICE_BINDING_VAR).map(Some)
    }
}

/// Reads Cloud Foundry application metadata and bound services.
///
/// The redirect URI is derived from the first application route; the
/// credentials come from the identity service bound to the application.
pub struct CloudFoundryResolver {
    application: Option<String>,
    services: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VcapApplication {
    #[serde(default)]
    application_uris: Vec<String>,
}

impl CloudFoundryResolver {
    #[must_use]
    pub fn new(application: Option<String>, services: Option<String>) -> Self {
        Self {
            application,
            services,
        }
    }

    /// Snapshots `VCAP_APPLICATION` and `VCAP_SERVICES`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(VCAP_APPLICATION_VAR).ok(),
            std::env::var(VCAP_SERVICES_VAR).ok(),
        )
    }

    fn bound_credentials(&self) -> Result<Credentials, ConfigError> {
        let services = self
            .services
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                source: VCAP_SERVICES_VAR.to_string(),
                field: "AppID".to_string(),
            })?;

        let services: Value =
            serde_json::from_str(services).map_err(|e| ConfigError::Malformed {
                source: VCAP_SERVICES_VAR.to_string(),
                reason: e.to_string(),
            })?;

        let credentials = services
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(label, _)| label.eq_ignore_ascii_case("appid"))
            .filter_map(|(_, instances)| instances.as_array()?.first())
            .find_map(|instance| instance.get("credentials"))
            .ok_or_else(|| ConfigError::MissingField {
                source: VCAP_SERVICES_VAR.to_string(),
                field: "AppID".to_string(),
            })?;

        Ok(
            serde_json::from_value(credentials.clone()).map_err(|e| ConfigError::Malformed {
                source: VCAP_SERVICES_VAR.to_string(),
                reason: e.to_string(),
            })?,
        )
    }
}

impl ConfigResolver for CloudFoundryResolver {
    fn name(&self) -> &'static str {
        "cloud foundry"
    }

    fn resolve(&self) -> Result<Option<IdentityConfig>, ConfigError> {
        let Some(application) = &self.application else {
            return Ok(None);
        };

        let application: VcapApplication =
            serde_json::from_str(application).map_err(|e| ConfigError::Malformed {
                source: VCAP_APPLICATION_VAR.to_string(),
                reason: e.to_string(),
            })?;

        let route = application
            .application_uris
            .first()
            .ok_or_else(|| ConfigError::MissingField {
                source: VCAP_APPLICATION_VAR.to_string(),
                field: "application_uris".to_string(),
            })?;

        let mut credentials = self.bound_credentials()?;
        credentials.redirect_uri = Some(format!("https://{route}{CALLBACK_PATH}"));

        credentials.into_config(VCAP_SERVICES_VAR).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CREDENTIALS: &str = r#"{
        "tenantId": "tenant",
        "clientId": "client-id",
        "secret": "client-secret",
        "oauthServerUrl": "https://auth.example.com/oauth/v4/tenant"
    }"#;

    const LOCAL_FILE: &str = r#"{
        "tenantId": "local-tenant",
        "clientId": "local-client",
        "secret": "local-secret",
        "oauthServerUrl": "https://auth.example.com/oauth/v4/local-tenant",
        "redirectUri": "http://localhost:3000/index.html"
    }"#;

    struct Absent;

    impl ConfigResolver for Absent {
        fn name(&self) -> &'static str {
            "absent"
        }

        fn resolve(&self) -> Result<Option<IdentityConfig>, ConfigError> {
            Ok(None)
        }
    }

    fn local_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn local_file_absent_is_not_applicable() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let resolver = LocalFileResolver::new(dir.path().join("localdev-config.json"));
        assert!(resolver.resolve().expect("resolve").is_none());
    }

    #[test]
    fn local_file_is_read() {
        let file = local_file(LOCAL_FILE);
        let config = LocalFileResolver::new(file.path())
            .resolve()
            .expect("resolve")
            .expect("present");
        assert_eq!(config.client_id(), "local-client");
        assert_eq!(config.redirect_uri(), "http://localhost:3000/index.html");
    }

    #[test]
    fn malformed_local_file_is_fatal() {
        let file = local_file("{ not json");
        assert!(LocalFileResolver::new(file.path()).resolve().is_err());
    }

    #[test]
    fn service_binding_takes_redirect_from_separate_variable() {
        let resolver = ServiceBindingResolver::new(
            Some(CREDENTIALS.to_string()),
            Some("https://app.example.com/index.html".to_string()),
        );
        let config = resolver.resolve().expect("resolve").expect("present");
        assert_eq!(config.tenant_id(), "tenant");
        assert_eq!(config.redirect_uri(), "https://app.example.com/index.html");
    }

    #[test]
    fn service_binding_without_redirect_is_fatal() {
        let resolver = ServiceBindingResolver::new(Some(CREDENTIALS.to_string()), None);
        assert!(resolver.resolve().is_err());
    }

    #[test]
    fn service_binding_absent_is_not_applicable() {
        let resolver = ServiceBindingResolver::new(None, Some("https://x/index.html".to_string()));
        assert!(resolver.resolve().expect("resolve").is_none());
    }

    #[test]
    fn cloud_foundry_derives_redirect_from_route() {
        let services = format!(r#"{{ "AppID": [ {{ "credentials": {CREDENTIALS} }} ] }}"#);
        let resolver = CloudFoundryResolver::new(
            Some(r#"{ "application_uris": ["myapp.example.com"] }"#.to_string()),
            Some(services),
        );
        let config = resolver.resolve().expect("resolve").expect("present");
        assert_eq!(config.redirect_uri(), "https://myapp.example.com/index.html");
        assert_eq!(config.client_id(), "client-id");
    }

    #[test]
    fn cloud_foundry_without_bound_service_is_fatal() {
        let resolver = CloudFoundryResolver::new(
            Some(r#"{ "application_uris": ["myapp.example.com"] }"#.to_string()),
            Some(r#"{ "postgres": [] }"#.to_string()),
        );
        assert!(resolver.resolve().is_err());
    }

    #[test]
    fn cloud_foundry_without_routes_is_fatal() {
        let services = format!(r#"{{ "AppID": [ {{ "credentials": {CREDENTIALS} }} ] }}"#);
        let resolver = CloudFoundryResolver::new(
            Some(r#"{ "application_uris": [] }"#.to_string()),
            Some(services),
        );
        let err = resolver.resolve().expect_err("should fail");
        assert!(err.to_string().contains("application_uris"));
    }

    #[test]
    fn cloud_foundry_without_services_variable_is_fatal() {
        let resolver = CloudFoundryResolver::new(
            Some(r#"{ "application_uris": ["myapp.example.com"] }"#.to_string()),
            None,
        );
        let err = resolver.resolve().expect_err("should fail");
        assert!(err.to_string().contains(VCAP_SERVICES_VAR));
    }

    #[test]
    fn chain_prefers_earlier_resolvers() {
        let file = local_file(LOCAL_FILE);
        let chain = ResolverChain::new(vec![
            Box::new(LocalFileResolver::new(file.path())),
            Box::new(ServiceBindingResolver::new(
                Some(CREDENTIALS.to_string()),
                Some("https://app.example.com/index.html".to_string()),
            )),
        ]);

        let resolved = chain.resolve().expect("resolve");
        assert_eq!(resolved.source, "local file");
        assert_eq!(resolved.config.client_id(), "local-client");
    }

    #[test]
    fn chain_falls_through_absent_sources() {
        let chain = ResolverChain::new(vec![
            Box::new(Absent),
            Box::new(ServiceBindingResolver::new(
                Some(CREDENTIALS.to_string()),
                Some("https://app.example.com/index.html".to_string()),
            )),
        ]);

        let resolved = chain.resolve().expect("resolve");
        assert_eq!(resolved.source, "service binding");
    }

    #[test]
    fn chain_fails_when_nothing_applies() {
        let chain = ResolverChain::new(vec![Box::new(Absent), Box::new(Absent)]);
        let err = chain.resolve().expect_err("should fail");
        assert!(err.to_string().contains("no identity provider configuration"));
    }

    #[test]
    fn chain_stops_at_broken_source() {
        let chain = ResolverChain::new(vec![
            Box::new(ServiceBindingResolver::new(Some("not json".to_string()), None)),
            Box::new(ServiceBindingResolver::new(
                Some(CREDENTIALS.to_string()),
                Some("https://app.example.com/index.html".to_string()),
            )),
        ]);
        assert!(chain.resolve().is_err());
    }
}
