// GitHub API endpoint URLs.
// Builds the URL of every upstream resource the source methods read.

use semver::Version;

use crate::config::Config;
use crate::error::{HubError, Result};

/// First release whose API reference lives in `API.md` at the repository root.
const API_MD_SINCE: Version = Version::new(8, 0, 0);

/// URL builder bound to one API base and organization.
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_url: String,
    org: String,
    core_repo: String,
    assets_repo: String,
}

impl Endpoints {
    pub fn new(config: &Config) -> Self {
        Self {
            api_url: config.api_url.clone(),
            org: config.org.clone(),
            core_repo: config.core_repo.clone(),
            assets_repo: config.assets_repo.clone(),
        }
    }

    /// Name of the framework's own repository.
    pub fn core_repo(&self) -> &str {
        &self.core_repo
    }

    /// Style guide document in the assets repository.
    pub fn style_guide(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/STYLE.md",
            self.api_url, self.org, self.assets_repo
        )
    }

    /// Organization repository listing.
    pub fn repos(&self) -> String {
        format!("{}/orgs/{}/repos", self.api_url, self.org)
    }

    /// Release tags of the core repository.
    pub fn tags(&self) -> String {
        format!("{}/repos/{}/{}/tags", self.api_url, self.org, self.core_repo)
    }

    /// API reference for a released version. Releases before 8.0.0 kept it in
    /// `docs/Reference.md`; later ones in `API.md`.
    pub fn reference(&self, version: &str) -> Result<String> {
        let parsed = Version::parse(version).map_err(|source| HubError::InvalidVersion {
            version: version.to_string(),
            source,
        })?;

        let path = if parsed < API_MD_SINCE {
            "docs/Reference.md"
        } else {
            "API.md"
        };

        Ok(format!(
            "{}/repos/{}/{}/contents/{}?ref=v{}",
            self.api_url, self.org, self.core_repo, path, version
        ))
    }

    /// API documentation of an organization repository.
    pub fn api_doc(&self, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/API.md",
            self.api_url, self.org, repo
        )
    }
}
