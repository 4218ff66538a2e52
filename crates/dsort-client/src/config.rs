//! Client configuration.

use std::time::Duration;

use reqwest::Url;

use crate::error::{Error, Result};

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration of a [`Client`].
///
/// [`Client`]: crate::Client
#[derive(Clone)]
pub struct ClientConfig {
    /// Gateway address, e.g. `http://127.0.0.1:3000`.
    pub base_url: String,
    /// Timeout of every request.
    pub timeout: Duration,
    /// User-Agent header sent with requests.
    pub user_agent: String,
    /// Bearer token sent with requests.
    pub api_token: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("api_token", &self.api_token.as_ref().map(|_| ".."))
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration for the gateway at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: Self::default_user_agent(),
            api_token: None,
        }
    }

    fn default_user_agent() -> String {
        format!("dsort-client/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the bearer token.
    pub fn with_api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Returns the effective user agent, using default if empty.
    pub fn effective_user_agent(&self) -> String {
        if self.user_agent.is_empty() {
            Self::default_user_agent()
        } else {
            self.user_agent.clone()
        }
    }

    /// Parses and checks the base URL.
    pub(crate) fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|err| Error::Invalid(format!("base URL '{}': {err}", self.base_url)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(Error::Invalid(format!(
                "base URL scheme '{scheme}', expected http or https"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ClientConfig::new("http://localhost:3000");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.user_agent.starts_with("dsort-client/"));
        assert!(config.api_token.is_none());
    }

    #[test]
    fn effective_values_fall_back_to_defaults() {
        let config = ClientConfig::new("http://localhost:3000")
            .with_timeout(Duration::ZERO)
            .with_user_agent("");
        assert_eq!(config.effective_timeout(), DEFAULT_TIMEOUT);
        assert!(config.effective_user_agent().starts_with("dsort-client/"));
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(ClientConfig::new("http://localhost:3000").parsed_base_url().is_ok());
        assert!(ClientConfig::new("ftp://localhost").parsed_base_url().is_err());
        assert!(ClientConfig::new("not a url").parsed_base_url().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = ClientConfig::new("http://localhost:3000").with_api_token("s3cret");
        assert!(!format!("{config:?}").contains("s3cret"));
    }
}
