//! Configuration management for ferrolink.
//!
//! Configuration is read from a TOML file and then overridden by `FL_*`
//! environment variables (a `.env` file is honoured when present). Every
//! section has a usable default so partial files are accepted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure for ferrolink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener configuration.
    pub server: ServerConfig,
    /// Service-provider side of the SAML exchange.
    pub sp: ServiceProviderConfig,
    /// Security token service configuration.
    pub sts: StsConfig,
    /// Token and revocation registry backends.
    pub registry: RegistryConfig,
    /// HTTP digest authentication.
    pub digest: DigestConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Wire binding used to carry protocol messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    /// Base64 document in an auto-submitting HTML form.
    #[default]
    Post,
    /// Deflated, base64 and URL-encoded document in the query string.
    Redirect,
}

impl std::str::FromStr for Binding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "redirect" => Ok(Self::Redirect),
            other => Err(Error::Configuration(format!("unknown binding: {other}"))),
        }
    }
}

/// Service-provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceProviderConfig {
    /// This service's URL, used as issuer and assertion consumer URL.
    pub service_url: String,
    /// The identity provider's SSO URL.
    pub identity_url: String,
    /// Dedicated IdP logout URL; the identity URL is used when absent.
    pub logout_url: Option<String>,
    /// Binding used for both directions.
    pub binding: Binding,
    /// Whether documents are signed and inbound signatures verified.
    pub supports_signatures: bool,
    /// Key-store alias of the IdP verification key. Defaults to the IdP host.
    pub validating_alias: Option<String>,
    /// Clock skew tolerance applied to assertion windows, in milliseconds.
    pub clock_skew_millis: u64,
    /// Whether the handler chain runs under its lock.
    pub use_locking: bool,
    /// PKCS#8 DER file holding this party's signing key.
    pub signing_key_path: Option<PathBuf>,
    /// PKCS#8 DER file holding this party's decryption key. Defaults to
    /// `signing_key_path`.
    pub decrypting_key_path: Option<PathBuf>,
    /// Alias to DER public key file.
    pub validating_keys: BTreeMap<String, PathBuf>,
    /// Handler chain, by handler name, in execution order.
    pub handlers: Vec<String>,
    /// How long a response ID without an assertion validity window is
    /// remembered for replay detection, in seconds.
    pub replay_retention_secs: u64,
    /// Browser sessions idle for longer than this are dropped, in seconds.
    pub session_idle_secs: u64,
    /// Interval of the idle-session sweep, in seconds.
    pub session_prune_interval_secs: u64,
}

impl Default for ServiceProviderConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8080/saml/sp".to_string(),
            identity_url: String::new(),
            logout_url: None,
            binding: Binding::Post,
            supports_signatures: false,
            validating_alias: None,
            clock_skew_millis: 0,
            use_locking: true,
            signing_key_path: None,
            decrypting_key_path: None,
            validating_keys: BTreeMap::new(),
            handlers: vec![
                "replay_guard".to_string(),
                "authentication".to_string(),
                "logout".to_string(),
                "signature_generation".to_string(),
            ],
            replay_retention_secs: 3600,
            session_idle_secs: 1800,
            session_prune_interval_secs: 60,
        }
    }
}

impl ServiceProviderConfig {
    /// Returns the URL logout messages are sent to.
    #[must_use]
    pub fn logout_destination(&self) -> &str {
        self.logout_url.as_deref().unwrap_or(&self.identity_url)
    }
}

/// Security token service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StsConfig {
    /// Name used as issuer of the tokens this STS creates.
    pub sts_name: String,
    /// Default token lifetime in seconds.
    pub token_timeout_secs: u64,
    /// Clock skew added around issued lifetimes, in milliseconds.
    pub clock_skew_millis: u64,
    /// Principals allowed to call the STS. `None` admits everyone.
    pub allowed_principals: Option<Vec<String>>,
    /// Token provider registrations.
    pub providers: Vec<ProviderConfig>,
}

impl Default for StsConfig {
    fn default() -> Self {
        Self {
            sts_name: "ferrolink-sts".to_string(),
            token_timeout_secs: 7200,
            clock_skew_millis: 0,
            allowed_principals: None,
            providers: Vec::new(),
        }
    }
}

/// A single token provider registration.
///
/// A provider is reachable through any combination of its keys; at least
/// one key must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider kind, looked up in the provider catalog (e.g. `saml2`).
    pub kind: String,
    /// Relying-service name served by this provider.
    pub service: Option<String>,
    /// Token type identifier served by this provider.
    pub token_type: Option<String>,
    /// Token family of the provider's element.
    pub family: String,
    /// Namespace of the token element.
    pub element_ns: Option<String>,
    /// Local name of the token element.
    pub element_local: Option<String>,
    /// Provider-specific properties.
    pub properties: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// Returns the token family, falling back to the provider kind.
    #[must_use]
    pub fn family(&self) -> &str {
        if self.family.is_empty() {
            &self.kind
        } else {
            &self.family
        }
    }
}

/// Registry backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// Process memory.
    #[default]
    Memory,
    /// Append-only log file, replayed at start.
    File,
    /// PostgreSQL tables.
    Sql,
}

impl std::str::FromStr for RegistryBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "sql" | "jdbc" | "jpa" => Ok(Self::Sql),
            other => Err(Error::Configuration(format!("unknown registry backend: {other}"))),
        }
    }
}

/// Token and revocation registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Backend of the issued-token registry.
    pub token_backend: RegistryBackend,
    /// Log file of the issued-token registry.
    pub token_file: Option<PathBuf>,
    /// Backend of the revocation registry.
    pub revocation_backend: RegistryBackend,
    /// Log file of the revocation registry.
    pub revocation_file: Option<PathBuf>,
    /// Database URL for the `sql` backend.
    pub database_url: Option<String>,
    /// Maximum database connections.
    pub max_connections: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            token_backend: RegistryBackend::Memory,
            token_file: None,
            revocation_backend: RegistryBackend::Memory,
            revocation_file: None,
            database_url: None,
            max_connections: 10,
        }
    }
}

impl RegistryConfig {
    /// Returns true if either registry needs a database.
    #[must_use]
    pub fn uses_sql(&self) -> bool {
        self.token_backend == RegistryBackend::Sql
            || self.revocation_backend == RegistryBackend::Sql
    }
}

/// Hash function of HTTP digest responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// `MD5` (RFC 2617).
    #[default]
    #[serde(rename = "MD5", alias = "md5")]
    Md5,
    /// `SHA-256` (RFC 7616).
    #[serde(rename = "SHA-256", alias = "sha-256")]
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the token used in challenges and credentials.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA-256" => Ok(Self::Sha256),
            other => Err(Error::Configuration(format!("unsupported digest algorithm: {other}"))),
        }
    }
}

/// HTTP digest authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Whether the STS endpoints require digest credentials.
    pub enabled: bool,
    /// Protection realm advertised in challenges.
    pub realm: String,
    /// Protection domain advertised in challenges.
    pub domain: String,
    /// Maximum nonce age in milliseconds.
    pub nonce_max_age_millis: i64,
    /// Algorithm advertised in challenges and required of responses.
    pub algorithm: DigestAlgorithm,
    /// Username to password table for the built-in credential validator.
    pub users: BTreeMap<String, String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            realm: "ferrolink".to_string(),
            domain: "/".to_string(),
            nonce_max_age_millis: 180_000,
            algorithm: DigestAlgorithm::Md5,
            users: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the document is not valid TOML or
    /// does not match the configuration schema.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from an optional TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Configuration(format!("failed to read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `FL_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed.
    pub fn apply_env(&mut self) -> Result<()> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        if let Ok(host) = std::env::var("FL_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("FL_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Configuration(format!("invalid FL_PORT: {port}")))?;
        }
        if let Ok(url) = std::env::var("FL_SP_IDENTITY_URL") {
            self.sp.identity_url = url;
        }
        if let Ok(url) = std::env::var("FL_SP_SERVICE_URL") {
            self.sp.service_url = url;
        }
        if let Ok(binding) = std::env::var("FL_SP_BINDING") {
            self.sp.binding = binding.parse()?;
        }
        if let Ok(backend) = std::env::var("FL_REGISTRY_BACKEND") {
            let backend: RegistryBackend = backend.parse()?;
            self.registry.token_backend = backend;
            self.registry.revocation_backend = backend;
        }
        if let Ok(url) = std::env::var("FL_DATABASE_URL") {
            self.registry.database_url = Some(url);
        }
        if let Ok(algorithm) = std::env::var("FL_DIGEST_ALGORITHM") {
            self.digest.algorithm = algorithm.parse()?;
        }

        Ok(())
    }

    /// Checks the configuration for missing mandatory settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.sp.identity_url.is_empty() {
            return Err(Error::Configuration(
                "sp.identity_url is required".to_string(),
            ));
        }
        if self.registry.token_backend == RegistryBackend::File
            && self.registry.token_file.is_none()
        {
            return Err(Error::Configuration(
                "registry.token_file is required for the file backend".to_string(),
            ));
        }
        if self.registry.revocation_backend == RegistryBackend::File
            && self.registry.revocation_file.is_none()
        {
            return Err(Error::Configuration(
                "registry.revocation_file is required for the file backend".to_string(),
            ));
        }
        if self.registry.uses_sql() && self.registry.database_url.is_none() {
            return Err(Error::Configuration(
                "registry.database_url is required for the sql backend".to_string(),
            ));
        }
        if self.sp.session_prune_interval_secs == 0 {
            return Err(Error::Configuration(
                "sp.session_prune_interval_secs must be positive".to_string(),
            ));
        }
        // Without digest authentication the caller is whoever the body claims
        if self.sts.allowed_principals.is_some() && !self.digest.enabled {
            return Err(Error::Configuration(
                "sts.allowed_principals requires digest.enabled".to_string(),
            ));
        }
        for provider in &self.sts.providers {
            if provider.service.is_none()
                && provider.token_type.is_none()
                && provider.element_local.is_none()
            {
                return Err(Error::Configuration(format!(
                    "provider '{}' has no service, token type or element key",
                    provider.kind
                )));
            }
        }
        Ok(())
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.sp.identity_url = "https://idp.example.com/sso".to_string();
        config.sp.logout_url = Some("https://idp.example.com/slo".to_string());
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [sp]
            identity_url = "https://idp.example.com/sso"
            binding = "redirect"
            "#,
        )
        .unwrap();

        assert_eq!(config.sp.binding, Binding::Redirect);
        assert!(config.sp.use_locking);
        assert_eq!(config.digest.nonce_max_age_millis, 180_000);
        assert_eq!(config.registry.token_backend, RegistryBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn provider_registrations_parse() {
        let config = Config::from_toml_str(
            r#"
            [sp]
            identity_url = "https://idp.example.com/sso"

            [[sts.providers]]
            kind = "saml2"
            token_type = "urn:oasis:names:tc:SAML:2.0:assertion"
            family = "saml2"
            element_ns = "urn:oasis:names:tc:SAML:2.0:assertion"
            element_local = "Assertion"

            [sts.providers.properties]
            ClockSkew = "500"
            "#,
        )
        .unwrap();

        assert_eq!(config.sts.providers.len(), 1);
        let provider = &config.sts.providers[0];
        assert_eq!(provider.kind, "saml2");
        assert_eq!(provider.properties.get("ClockSkew").map(String::as_str), Some("500"));
    }

    #[test]
    fn missing_identity_url_is_rejected() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn file_backend_requires_path() {
        let mut config = Config::for_testing();
        config.registry.revocation_backend = RegistryBackend::File;
        assert!(config.validate().is_err());

        config.registry.revocation_file = Some(PathBuf::from("/tmp/revoked.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn provider_without_key_is_rejected() {
        let mut config = Config::for_testing();
        config.sts.providers.push(ProviderConfig {
            kind: "saml2".to_string(),
            ..ProviderConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn logout_destination_falls_back_to_identity_url() {
        let mut sp = ServiceProviderConfig {
            identity_url: "https://idp.example.com/sso".to_string(),
            ..ServiceProviderConfig::default()
        };
        assert_eq!(sp.logout_destination(), "https://idp.example.com/sso");

        sp.logout_url = Some("https://idp.example.com/slo".to_string());
        assert_eq!(sp.logout_destination(), "https://idp.example.com/slo");
    }

    #[test]
    fn allow_list_requires_digest() {
        let mut config = Config::for_testing();
        config.sts.allowed_principals = Some(vec!["svc".to_string()]);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.digest.enabled = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn digest_algorithms_parse() {
        assert_eq!(DigestConfig::default().algorithm, DigestAlgorithm::Md5);
        assert_eq!("sha-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!(DigestAlgorithm::Sha256.to_string(), "SHA-256");
        assert!("SHA-512-256".parse::<DigestAlgorithm>().is_err());

        let config = Config::from_toml_str("[digest]\nalgorithm = \"SHA-256\"\n").unwrap();
        assert_eq!(config.digest.algorithm, DigestAlgorithm::Sha256);
        assert!(Config::from_toml_str("[digest]\nalgorithm = \"MD5-sess\"\n").is_err());
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("FILE".parse::<RegistryBackend>().unwrap(), RegistryBackend::File);
        assert_eq!("jdbc".parse::<RegistryBackend>().unwrap(), RegistryBackend::Sql);
        assert!("ldap".parse::<RegistryBackend>().is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferrolink.toml");
        std::fs::write(
            &path,
            "[sp]\nidentity_url = \"https://idp.example.com/sso\"\n[server]\nport = 9090\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sp.identity_url, "https://idp.example.com/sso");
    }
}
