// Process configuration.
// Read once at start-up from environment variables.

use crate::error::{HubError, Result};

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_ORG: &str = "hapijs";
const DEFAULT_CORE_REPO: &str = "hapi";
const DEFAULT_ASSETS_REPO: &str = "assets";
const DEFAULT_USER_AGENT: &str = "hapijs.com";

/// Settings shared by the fetcher, endpoints, and the host's store client.
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub API token, sent as `authorization: token <t>`.
    pub github_token: String,
    /// Location of the persistent snapshot store.
    pub store_url: String,
    /// Base URL of the GitHub REST API, without trailing slash.
    pub api_url: String,
    /// Organization that owns every repository we read.
    pub org: String,
    /// The framework's own repository; excluded from module listings.
    pub core_repo: String,
    /// Repository holding shared documents such as the style guide.
    pub assets_repo: String,
    pub user_agent: String,
}

impl Config {
    /// Build a config with default locations for the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            github_token: token.into(),
            store_url: DEFAULT_STORE_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            org: DEFAULT_ORG.to_string(),
            core_repo: DEFAULT_CORE_REPO.to_string(),
            assets_repo: DEFAULT_ASSETS_REPO.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Read configuration from the environment. `GITHUB_TOKEN` is required.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN").map_err(|_| HubError::MissingToken)?;
        Ok(Self::from_lookup(token, |name| std::env::var(name).ok()))
    }

    fn from_lookup(token: String, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new(token);
        if let Some(value) = lookup("HUBCACHE_STORE_URL") {
            config.store_url = value;
        }
        if let Some(value) = lookup("HUBCACHE_API_URL") {
            config.api_url = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = lookup("HUBCACHE_ORG") {
            config.org = value;
        }
        if let Some(value) = lookup("HUBCACHE_CORE_REPO") {
            config.core_repo = value;
        }
        if let Some(value) = lookup("HUBCACHE_ASSETS_REPO") {
            config.assets_repo = value;
        }
        if let Some(value) = lookup("HUBCACHE_USER_AGENT") {
            config.user_agent = value;
        }
        config
    }

    /// Point the API base somewhere else (test servers, GitHub Enterprise).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::new("abc");
        assert_eq!(config.github_token, "abc");
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.org, "hapijs");
        assert_eq!(config.core_repo, "hapi");
        assert_eq!(config.assets_repo, "assets");
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("HUBCACHE_API_URL", "http://localhost:9000/"),
            ("HUBCACHE_ORG", "acme"),
            ("HUBCACHE_STORE_URL", "redis://cache:6379"),
        ]
        .into_iter()
        .collect();

        let config =
            Config::from_lookup("t".to_string(), |name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.org, "acme");
        assert_eq!(config.store_url, "redis://cache:6379");
        assert_eq!(config.core_repo, "hapi");
    }

    #[test]
    fn test_with_api_url_trims_slash() {
        let config = Config::new("t").with_api_url("http://127.0.0.1:1234/");
        assert_eq!(config.api_url, "http://127.0.0.1:1234");
    }
}
