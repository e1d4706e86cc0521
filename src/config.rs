//! Client configuration: service location, credentials, request options.

use std::collections::HashMap;
use std::time::Duration;

/// Default service location.
pub const DEFAULT_BACKEND_URL: &str = "https://api.pulumi.com";

pub const BACKEND_URL_ENV_VAR: &str = "PULUMI_BACKEND_URL";
pub const ACCESS_TOKEN_ENV_VAR: &str = "PULUMI_ACCESS_TOKEN";
pub const USER_AGENT_ENV_VAR: &str = "ESC_USER_AGENT";

/// Settings used to build an [`EscApi`](crate::api::EscApi).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub backend_url: String,
    pub access_token: Option<String>,
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

impl Configuration {
    /// Defaults only; no access token.
    pub fn new() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            access_token: None,
            user_agent: default_user_agent(),
            timeout: None,
        }
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&env)
    }

    /// Read settings from a provided env map.
    ///
    /// Empty variables count as unset.
    pub fn from_env_map(env: &HashMap<String, String>) -> Self {
        let lookup = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

        Self {
            backend_url: lookup(BACKEND_URL_ENV_VAR)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            access_token: lookup(ACCESS_TOKEN_ENV_VAR),
            user_agent: lookup(USER_AGENT_ENV_VAR).unwrap_or_else(default_user_agent),
            timeout: None,
        }
    }

    /// Set the service URL (without the `/api` suffix).
    pub fn with_backend_url(mut self, url: &str) -> Self {
        self.backend_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set the access token sent as `Authorization: token <token>`.
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Set a per-request timeout. Without one, requests wait indefinitely.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

fn default_user_agent() -> String {
    format!("esc-sdk/{}", env!("CARGO_PKG_VERSION"))
}
