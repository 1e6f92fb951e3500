use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "rules-gateway";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the TOML configuration file.
pub const CONFIG_FILE_ENV: &str = "RULES_GATEWAY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,rules_gateway=debug,hyper=warn,reqwest=warn"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid TOML in {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub services: ServicesConfig,
    pub membership: MembershipConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub api_prefix: String,
    pub enable_cors: bool,
    /// Fall back to the aggregator's cluster listing when the membership
    /// service cannot answer.
    pub use_org_clusters_fallback: bool,
    pub enable_internal_rules_organizations: bool,
    pub internal_rules_organizations: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8081".into(),
            api_prefix: "/api/v1/".into(),
            enable_cors: false,
            use_org_clusters_fallback: true,
            enable_internal_rules_organizations: false,
            internal_rules_organizations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub aggregator_base_endpoint: String,
    pub content_base_endpoint: String,
    pub request_timeout_secs: u64,
    pub groups_poll_interval_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            aggregator_base_endpoint: "http://localhost:8080/api/v1/".into(),
            content_base_endpoint: "http://localhost:8082/api/v1/".into(),
            request_timeout_secs: 10,
            groups_poll_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    pub url: Option<String>,
}

impl ServerConfig {
    pub fn route_prefix(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }

    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, ConfigError> {
        self.address.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            field: "server.address",
            message: e.to_string(),
        })
    }
}

/// Internal-rule entitlement: the feature switch plus the allow-list.
#[derive(Debug, Clone, Default)]
pub struct InternalRulesAccess {
    enabled: bool,
    organizations: HashSet<String>,
}

impl InternalRulesAccess {
    pub fn new(enabled: bool, organizations: impl IntoIterator<Item = String>) -> Self {
        Self {
            enabled,
            organizations: organizations.into_iter().collect(),
        }
    }

    /// Internal content is shown only when the feature is on and the
    /// organization is on the list.
    pub fn allows(&self, org_id: &str) -> bool {
        self.enabled && self.organizations.contains(org_id)
    }
}

impl Config {
    /// Load from the file named by `RULES_GATEWAY_CONFIG`, or `config.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;

        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.aggregator_url()?;
        self.content_url()?;
        self.membership_url()?;
        if self.services.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "services.request_timeout_secs",
                message: "must be greater than 0".into(),
            });
        }
        if self.services.groups_poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "services.groups_poll_interval_secs",
                message: "must be greater than 0".into(),
            });
        }
        if !self.server.api_prefix.starts_with('/') || self.route_prefix().is_empty() {
            return Err(ConfigError::Invalid {
                field: "server.api_prefix",
                message: "must start with '/' and name at least one segment".into(),
            });
        }
        self.server.socket_addr()?;
        Ok(())
    }

    pub fn aggregator_url(&self) -> Result<Url, ConfigError> {
        parse_base_url("services.aggregator_base_endpoint", &self.services.aggregator_base_endpoint)
    }

    pub fn content_url(&self) -> Result<Url, ConfigError> {
        parse_base_url("services.content_base_endpoint", &self.services.content_base_endpoint)
    }

    pub fn membership_url(&self) -> Result<Option<Url>, ConfigError> {
        self.membership
            .url
            .as_deref()
            .map(|raw| parse_base_url("membership.url", raw))
            .transpose()
    }

    /// API prefix without the trailing slash, as used for nesting routes.
    pub fn route_prefix(&self) -> &str {
        self.server.route_prefix()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.services.request_timeout_secs)
    }

    pub fn groups_poll_interval(&self) -> Duration {
        Duration::from_secs(self.services.groups_poll_interval_secs)
    }

    pub fn internal_rules_access(&self) -> InternalRulesAccess {
        InternalRulesAccess::new(
            self.server.enable_internal_rules_organizations,
            self.server.internal_rules_organizations.iter().cloned(),
        )
    }
}

/// Parse a base endpoint. A trailing slash is added so that relative
/// endpoint paths join under it instead of replacing its last segment.
fn parse_base_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized).map_err(|e| ConfigError::Invalid {
        field,
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            field,
            message: format!("{raw} is not an http(s) base URL"),
        });
    }
    Ok(url)
}
