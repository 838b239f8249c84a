//! Provider configuration
//!
//! Explicit provider arguments win over the `TENCENTCLOUD_*` environment.

use std::collections::HashMap;
use std::time::Duration;

use tccloud_core::resource::{AttributesExt, Value};
use tccloud_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const ENV_SECRET_ID: &str = "TENCENTCLOUD_SECRET_ID";
pub const ENV_SECRET_KEY: &str = "TENCENTCLOUD_SECRET_KEY";
pub const ENV_SECURITY_TOKEN: &str = "TENCENTCLOUD_SECURITY_TOKEN";
pub const ENV_REGION: &str = "TENCENTCLOUD_REGION";
pub const ENV_PROTOCOL: &str = "TENCENTCLOUD_PROTOCOL";
pub const ENV_DOMAIN: &str = "TENCENTCLOUD_DOMAIN";
pub const ENV_REQUEST_TIMEOUT: &str = "TENCENTCLOUD_REQUEST_TIMEOUT";

const DEFAULT_DOMAIN: &str = "tencentcloudapi.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Configuration error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("provider argument '{argument}' is required (or set {env})")]
    Missing {
        argument: &'static str,
        env: &'static str,
    },

    #[error("invalid provider argument '{argument}': {message}")]
    Invalid {
        argument: &'static str,
        message: String,
    },
}

/// Scheme used to reach the API endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Https,
    Http,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::Http => "http",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HTTPS" => Ok(Protocol::Https),
            "HTTP" => Ok(Protocol::Http),
            other => Err(format!("unknown protocol '{}', expected HTTPS or HTTP", other)),
        }
    }
}

/// Credentials and endpoint settings for every API call
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub secret_id: String,
    pub secret_key: String,
    pub security_token: Option<String>,
    pub region: String,
    pub protocol: Protocol,
    pub domain: String,
    pub request_timeout: Duration,
    /// Single base URL for every service (mock servers)
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"***")
            .field("security_token", &self.security_token.as_ref().map(|_| "***"))
            .field("region", &self.region)
            .field("protocol", &self.protocol)
            .field("domain", &self.domain)
            .field("request_timeout", &self.request_timeout)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            security_token: None,
            region: region.into(),
            protocol: Protocol::Https,
            domain: DEFAULT_DOMAIN.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }

    /// Build from provider arguments, falling back to the process environment
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        Self::from_attributes_with_env(attributes, |key| std::env::var(key).ok())
    }

    /// Build from provider arguments with an injectable environment lookup
    pub fn from_attributes_with_env(
        attributes: &HashMap<String, Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |argument: &str, env_key: &str| -> Option<String> {
            attributes
                .string(argument)
                .map(String::from)
                .or_else(|| env(env_key))
                .filter(|v| !v.is_empty())
        };

        let secret_id = lookup("secret_id", ENV_SECRET_ID).ok_or(ConfigError::Missing {
            argument: "secret_id",
            env: ENV_SECRET_ID,
        })?;
        let secret_key = lookup("secret_key", ENV_SECRET_KEY).ok_or(ConfigError::Missing {
            argument: "secret_key",
            env: ENV_SECRET_KEY,
        })?;
        let region = lookup("region", ENV_REGION).ok_or(ConfigError::Missing {
            argument: "region",
            env: ENV_REGION,
        })?;

        let mut config = Self::new(secret_id, secret_key, region);
        config.security_token = lookup("security_token", ENV_SECURITY_TOKEN);

        if let Some(protocol) = lookup("protocol", ENV_PROTOCOL) {
            config.protocol = protocol
                .parse()
                .map_err(|message| ConfigError::Invalid {
                    argument: "protocol",
                    message,
                })?;
        }
        if let Some(domain) = lookup("domain", ENV_DOMAIN) {
            config.domain = domain;
        }

        let timeout = match attributes.int("request_timeout") {
            Some(secs) => Some(secs),
            None => match env(ENV_REQUEST_TIMEOUT) {
                Some(raw) => Some(raw.parse::<i64>().map_err(|e| ConfigError::Invalid {
                    argument: "request_timeout",
                    message: e.to_string(),
                })?),
                None => None,
            },
        };
        if let Some(secs) = timeout {
            let secs = u64::try_from(secs)
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    argument: "request_timeout",
                    message: format!("{} is not a positive number of seconds", secs),
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(endpoint) = attributes.string("endpoint") {
            config = config.with_endpoint(endpoint);
        }

        Ok(config)
    }

    /// Host serving the v3 API of `service`
    pub fn api_host(&self, service: &str) -> String {
        format!("{}.{}", service, self.domain)
    }

    /// Host serving the legacy v2 API of `service`
    pub fn legacy_host(&self, service: &str) -> String {
        format!("{}.api.qcloud.com", service)
    }
}

/// Schema of the provider arguments
pub fn provider_schema() -> ResourceSchema {
    ResourceSchema::new("provider")
        .with_description("Tencent Cloud credentials and endpoint settings")
        .attribute(
            AttributeSchema::new("secret_id", AttributeType::String)
                .sensitive()
                .with_description(format!("API secret id. Falls back to {}", ENV_SECRET_ID)),
        )
        .attribute(
            AttributeSchema::new("secret_key", AttributeType::String)
                .sensitive()
                .with_description(format!("API secret key. Falls back to {}", ENV_SECRET_KEY)),
        )
        .attribute(
            AttributeSchema::new("security_token", AttributeType::String)
                .sensitive()
                .with_description("Token of temporary credentials"),
        )
        .attribute(
            AttributeSchema::new("region", AttributeType::String)
                .with_description(format!("Region, e.g. ap-guangzhou. Falls back to {}", ENV_REGION)),
        )
        .attribute(AttributeSchema::new(
            "protocol",
            types::allowed_strings(&["HTTPS", "HTTP"]),
        ))
        .attribute(AttributeSchema::new("domain", AttributeType::String))
        .attribute(AttributeSchema::new("request_timeout", types::positive_int()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_fallback() {
        let env = env_of(&[
            (ENV_SECRET_ID, "AKIDenv"),
            (ENV_SECRET_KEY, "keyenv"),
            (ENV_REGION, "ap-guangzhou"),
        ]);
        let config = ProviderConfig::from_attributes_with_env(&HashMap::new(), env).unwrap();

        assert_eq!(config.secret_id, "AKIDenv");
        assert_eq!(config.secret_key, "keyenv");
        assert_eq!(config.region, "ap-guangzhou");
        assert_eq!(config.protocol, Protocol::Https);
        assert_eq!(config.domain, "tencentcloudapi.com");
        assert_eq!(config.request_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_arguments_take_precedence() {
        let env = env_of(&[
            (ENV_SECRET_ID, "AKIDenv"),
            (ENV_SECRET_KEY, "keyenv"),
            (ENV_REGION, "ap-guangzhou"),
            (ENV_PROTOCOL, "HTTP"),
        ]);
        let mut attrs = HashMap::new();
        attrs.insert("region".to_string(), Value::from("ap-shanghai"));
        attrs.insert("request_timeout".to_string(), Value::Int(60));

        let config = ProviderConfig::from_attributes_with_env(&attrs, env).unwrap();
        assert_eq!(config.region, "ap-shanghai");
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_credentials() {
        let env = env_of(&[(ENV_SECRET_ID, "AKIDenv"), (ENV_REGION, "ap-guangzhou")]);
        let err = ProviderConfig::from_attributes_with_env(&HashMap::new(), env).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                argument: "secret_key",
                env: ENV_SECRET_KEY
            }
        );
        assert!(err.to_string().contains(ENV_SECRET_KEY));
    }

    #[test]
    fn test_invalid_protocol_and_timeout() {
        let base = [
            (ENV_SECRET_ID, "id"),
            (ENV_SECRET_KEY, "key"),
            (ENV_REGION, "ap-guangzhou"),
        ];

        let mut with_protocol = base.to_vec();
        with_protocol.push((ENV_PROTOCOL, "FTP"));
        let err =
            ProviderConfig::from_attributes_with_env(&HashMap::new(), env_of(&with_protocol))
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { argument: "protocol", .. }));

        let mut attrs = HashMap::new();
        attrs.insert("request_timeout".to_string(), Value::Int(0));
        let err = ProviderConfig::from_attributes_with_env(&attrs, env_of(&base)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { argument: "request_timeout", .. }));
    }

    #[test]
    fn test_debug_hides_secret_key() {
        let config = ProviderConfig::new("AKIDid", "very-secret", "ap-guangzhou");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("AKIDid"));
    }

    #[test]
    fn test_hosts() {
        let config = ProviderConfig::new("id", "key", "ap-guangzhou");
        assert_eq!(config.api_host("cvm"), "cvm.tencentcloudapi.com");
        assert_eq!(config.legacy_host("vpc"), "vpc.api.qcloud.com");
    }
}
