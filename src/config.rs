// Client configuration: the credential pair plus host and user agent settings
use std::env;

use crate::error::{ChargifyError, Result};

pub const DEFAULT_BASE_HOST: &str = ".chargify.com";
pub const DEFAULT_USER_AGENT: &str = concat!("chargify-rs/", env!("CARGO_PKG_VERSION"));

pub const ENV_API_KEY: &str = "CHARGIFY_API_KEY";
pub const ENV_SUBDOMAIN: &str = "CHARGIFY_SUBDOMAIN";
pub const ENV_BASE_HOST: &str = "CHARGIFY_BASE_HOST";

/// The API key and site subdomain shared by every resource created from one facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub subdomain: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, subdomain: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            subdomain: subdomain.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub base_host: String,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, subdomain: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(api_key, subdomain),
            base_host: DEFAULT_BASE_HOST.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    // Reads the credential pair (and optionally the base host) from the environment
    pub fn from_env() -> Result<Self> {
        let api_key = required_var(ENV_API_KEY)?;
        let subdomain = required_var(ENV_SUBDOMAIN)?;
        let mut config = Self::new(api_key, subdomain);
        if let Ok(host) = env::var(ENV_BASE_HOST) {
            if !host.trim().is_empty() {
                config.base_host = host;
            }
        }
        Ok(config)
    }

    pub fn with_base_host(mut self, base_host: impl Into<String>) -> Self {
        self.base_host = base_host.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// `{subdomain}{base_host}`, e.g. `acme.chargify.com`.
    pub fn request_host(&self) -> String {
        format!("{}{}", self.credentials.subdomain, self.base_host)
    }

    pub fn base_url(&self) -> String {
        format!("https://{}", self.request_host())
    }
}

fn required_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ChargifyError::Configuration(format!(
            "environment variable {} is not set",
            name
        ))),
    }
}
