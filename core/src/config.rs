//! Client configuration.
//!
//! Everything the client needs is passed in explicitly at construction,
//! including the user agent; nothing is read from process-wide state.

use secrecy::SecretString;
use thiserror::Error;

use crate::endpoint::{Endpoint, Scheme};

pub const DEFAULT_HOST: &str = "cloud.logintc.com";

/// The client identifier sent as `User-Agent` unless overridden.
pub fn default_user_agent() -> String {
    format!("LoginTC-Rust/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid host {0:?}: expected host or host:port")]
    InvalidHost(String),
}

/// Username and password presented to an outbound proxy.
#[derive(Debug, Clone)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Outbound HTTP proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<ProxyCredentials>,
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(ProxyCredentials {
            username: username.into(),
            password: SecretString::from(password.into()),
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: SecretString,
    pub host: String,
    pub port: Option<u16>,
    pub secure: bool,
    pub user_agent: String,
    pub proxy: Option<ProxyConfig>,
}

impl ClientConfig {
    /// Configuration for the hosted service over HTTPS.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            host: DEFAULT_HOST.to_string(),
            port: None,
            secure: true,
            user_agent: default_user_agent(),
            proxy: None,
        }
    }

    /// Set the host, optionally with a port suffix (e.g. `10.0.10.20:3333`).
    pub fn with_host(mut self, host: &str) -> Result<Self, ConfigError> {
        match host.split_once(':') {
            Some((name, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidHost(host.to_string()))?;
                if name.is_empty() {
                    return Err(ConfigError::InvalidHost(host.to_string()));
                }
                self.host = name.to_string();
                self.port = Some(port);
            }
            None if host.is_empty() => return Err(ConfigError::InvalidHost(host.to_string())),
            None => {
                self.host = host.to_string();
                self.port = None;
            }
        }
        Ok(self)
    }

    /// `false` switches to plain HTTP.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn scheme(&self) -> Scheme {
        if self.secure {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        let scheme = self.scheme();
        Endpoint::new(scheme, self.host.clone(), self.port.unwrap_or(scheme.default_port()))
    }
}
