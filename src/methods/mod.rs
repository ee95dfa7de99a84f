// Source methods.
// Named operations that read the snapshot store, fetch from GitHub through the
// cache registry, or combine already-resolved results.

pub mod aggregate;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CachePolicy, CacheRegistry, FIFTEEN_MINUTES, ONE_DAY, ONE_MINUTE, ONE_YEAR};
use crate::config::Config;
use crate::error::{HubError, Result};
use crate::github::{
    ApiModule, Commit, Download, Endpoints, Fetched, Issue, LatestUpdate, PullRequest,
    Repository, RequestOptions, Tag, download_json, download_text,
};
use crate::store::{self, SnapshotStore};

const STYLE_GUIDE_POLICY: CachePolicy = CachePolicy::new(ONE_DAY, ONE_MINUTE);
const REPOS_POLICY: CachePolicy = CachePolicy::new(ONE_DAY, ONE_MINUTE);
const TAGS_POLICY: CachePolicy = CachePolicy::new(FIFTEEN_MINUTES, ONE_MINUTE);
const REFERENCE_POLICY: CachePolicy = CachePolicy::new(ONE_YEAR, ONE_MINUTE);
const LATEST_UPDATE_POLICY: CachePolicy = CachePolicy::new(FIFTEEN_MINUTES, ONE_MINUTE);

/// Every registered source method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodName {
    Commits,
    Issues,
    PullRequests,
    StyleGuide,
    LatestUpdate,
    Repos,
    Tags,
    Reference,
    ApiModules,
}

impl MethodName {
    pub const ALL: [MethodName; 9] = [
        MethodName::Commits,
        MethodName::Issues,
        MethodName::PullRequests,
        MethodName::StyleGuide,
        MethodName::LatestUpdate,
        MethodName::Repos,
        MethodName::Tags,
        MethodName::Reference,
        MethodName::ApiModules,
    ];

    /// Registered name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodName::Commits => "github.commits",
            MethodName::Issues => "github.issues",
            MethodName::PullRequests => "github.pullRequests",
            MethodName::StyleGuide => "github.styleGuide",
            MethodName::LatestUpdate => "github.latestUpdate",
            MethodName::Repos => "github.repos",
            MethodName::Tags => "github.tags",
            MethodName::Reference => "github.reference",
            MethodName::ApiModules => "github.apiModules",
        }
    }

    /// Cache policy, or `None` for methods that are not cached here.
    pub fn policy(&self) -> Option<CachePolicy> {
        match self {
            MethodName::StyleGuide => Some(STYLE_GUIDE_POLICY),
            MethodName::Repos => Some(REPOS_POLICY),
            MethodName::Tags => Some(TAGS_POLICY),
            MethodName::Reference => Some(REFERENCE_POLICY),
            MethodName::LatestUpdate => Some(LATEST_UPDATE_POLICY),
            MethodName::Commits
            | MethodName::Issues
            | MethodName::PullRequests
            | MethodName::ApiModules => None,
        }
    }

    /// Cache key for a call with `arg`. `None` for uncached methods.
    pub fn cache_key(&self, arg: Option<&str>) -> Option<String> {
        self.policy()?;
        match (self, arg) {
            (MethodName::Reference, Some(version)) => Some(reference_key(version)),
            (MethodName::Reference, None) => None,
            _ => Some(self.as_str().to_string()),
        }
    }

    /// Methods whose results must be resolved before this one runs.
    pub fn dependencies(&self) -> &'static [MethodName] {
        match self {
            MethodName::LatestUpdate => &[MethodName::Commits, MethodName::Issues],
            MethodName::ApiModules => &[MethodName::Repos],
            _ => &[],
        }
    }

    pub fn takes_argument(&self) -> bool {
        matches!(self, MethodName::Reference)
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodName {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        MethodName::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| HubError::UnknownMethod(s.to_string()))
    }
}

fn reference_key(version: &str) -> String {
    format!("{}.{}", MethodName::Reference.as_str(), version)
}

/// The source methods, bound to their collaborators and a shared cache.
pub struct SourceMethods {
    endpoints: Endpoints,
    download: Arc<dyn Download>,
    store: Arc<dyn SnapshotStore>,
    cache: CacheRegistry,
    fanout_limit: Option<usize>,
}

impl SourceMethods {
    pub fn new(
        config: &Config,
        download: Arc<dyn Download>,
        store: Arc<dyn SnapshotStore>,
        cache: CacheRegistry,
    ) -> Self {
        Self {
            endpoints: Endpoints::new(config),
            download,
            store,
            cache,
            fanout_limit: None,
        }
    }

    /// Cap how many API doc fetches run at once. Unlimited by default.
    pub fn with_fanout_limit(mut self, limit: usize) -> Self {
        self.fanout_limit = Some(limit.max(1));
        self
    }

    pub fn cache(&self) -> &CacheRegistry {
        &self.cache
    }

    /// Commits from the snapshot store, most recent first.
    pub async fn commits(&self) -> Result<Vec<Commit>> {
        debug!("commits");
        let snapshots = self.store.clone();
        detached(async move {
            let mut session = snapshots.connect().await?;
            let read = session.commits().await;
            store::release(session, read).await
        })
        .await
    }

    /// Issues from the snapshot store, without pull requests.
    pub async fn issues(&self) -> Result<Vec<Issue>> {
        let snapshots = self.store.clone();
        let issues = detached(async move {
            let mut session = snapshots.connect().await?;
            let read = session.issues().await;
            store::release(session, read).await
        })
        .await?;

        debug!("return issues");
        Ok(issues
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .collect())
    }

    /// Merged pull requests from the snapshot store.
    pub async fn pull_requests(&self) -> Result<Vec<PullRequest>> {
        let snapshots = self.store.clone();
        let pull_requests = detached(async move {
            let mut session = snapshots.connect().await?;
            let read = session.pull_requests().await;
            store::release(session, read).await
        })
        .await?;

        debug!("return pull requests");
        Ok(pull_requests
            .into_iter()
            .filter(PullRequest::is_merged)
            .collect())
    }

    /// Rendered style guide.
    pub async fn style_guide(&self) -> Result<Fetched<String>> {
        let download = self.download.clone();
        let url = self.endpoints.style_guide();
        self.cache
            .get(MethodName::StyleGuide.as_str(), STYLE_GUIDE_POLICY, move || async move {
                download_text(download.as_ref(), &url, &RequestOptions::html()).await
            })
            .await
    }

    /// Organization repositories.
    pub async fn repos(&self) -> Result<Fetched<Vec<Repository>>> {
        let download = self.download.clone();
        let url = self.endpoints.repos();
        self.cache
            .get(MethodName::Repos.as_str(), REPOS_POLICY, move || async move {
                download_json(download.as_ref(), &url, &RequestOptions::json()).await
            })
            .await
    }

    /// Release tags of the core repository.
    pub async fn tags(&self) -> Result<Fetched<Vec<Tag>>> {
        let download = self.download.clone();
        let url = self.endpoints.tags();
        self.cache
            .get(MethodName::Tags.as_str(), TAGS_POLICY, move || async move {
                download_json(download.as_ref(), &url, &RequestOptions::json()).await
            })
            .await
    }

    /// Rendered API reference for one released version, cached per version.
    pub async fn reference(&self, version: &str) -> Result<Fetched<String>> {
        let url = self.endpoints.reference(version)?;
        let key = reference_key(version);
        let download = self.download.clone();
        self.cache
            .get(&key, REFERENCE_POLICY, move || async move {
                download_text(download.as_ref(), &url, &RequestOptions::html()).await
            })
            .await
    }

    /// Most recent activity, from already-resolved commits and issues.
    pub async fn latest_update(&self, commits: &[Commit], issues: &[Issue]) -> Result<LatestUpdate> {
        let latest_commit = commits.first().cloned();
        let latest_issue = issues.first().cloned();
        self.cache
            .get(
                MethodName::LatestUpdate.as_str(),
                LATEST_UPDATE_POLICY,
                move || async move {
                    Ok(aggregate::latest_update(
                        latest_commit.as_ref(),
                        latest_issue.as_ref(),
                    ))
                },
            )
            .await
    }

    /// Repositories that publish API docs, sorted by name. Every doc fetch is
    /// started before any is awaited; a miss only drops that repository.
    pub async fn api_modules(&self, repos: &[Repository]) -> Vec<ApiModule> {
        let names = aggregate::active_repo_names(repos);
        let download = self.download.as_ref();

        let fetches = names.iter().map(|name| {
            let url = self.endpoints.api_doc(name);
            async move {
                match download_text(download, &url, &RequestOptions::html()).await {
                    Ok(doc) => doc,
                    Err(e) => {
                        warn!(url = %url, error = %e, "API doc fetch failed");
                        Fetched::Absent
                    }
                }
            }
        });

        let docs: Vec<Fetched<String>> = match self.fanout_limit {
            None => join_all(fetches).await,
            Some(limit) => stream::iter(fetches).buffered(limit).collect().await,
        };

        aggregate::collect_api_modules(names, docs, self.endpoints.core_repo())
    }

    /// Resolve `name`'s dependencies, run it, and return its result as JSON.
    pub async fn invoke(&self, name: &str, arg: Option<&str>) -> Result<Value> {
        let method: MethodName = name.parse()?;
        debug!(method = %method, ?arg, "invoke");

        let value = match method {
            MethodName::Commits => serde_json::to_value(self.commits().await?)?,
            MethodName::Issues => serde_json::to_value(self.issues().await?)?,
            MethodName::PullRequests => serde_json::to_value(self.pull_requests().await?)?,
            MethodName::StyleGuide => serde_json::to_value(self.style_guide().await?)?,
            MethodName::Repos => serde_json::to_value(self.repos().await?)?,
            MethodName::Tags => serde_json::to_value(self.tags().await?)?,
            MethodName::Reference => {
                let version = arg.ok_or(HubError::MissingArgument(method.as_str()))?;
                serde_json::to_value(self.reference(version).await?)?
            }
            MethodName::LatestUpdate => {
                // Both reads run to completion so each session is closed.
                let (commits, issues) = tokio::join!(self.commits(), self.issues());
                let (commits, issues) = (commits?, issues?);
                serde_json::to_value(self.latest_update(&commits, &issues).await?)?
            }
            MethodName::ApiModules => {
                let repos = self.repos().await?.into_option().unwrap_or_default();
                serde_json::to_value(self.api_modules(&repos).await)?
            }
        };

        Ok(value)
    }
}

/// Run a store read on its own task. The session is closed even when the
/// caller stops waiting before the read finishes.
async fn detached<T, Fut>(read: Fut) -> Result<T>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(read)
        .await
        .map_err(|e| HubError::Store(format!("store read aborted: {e}")))?
}
