// GitHub API record types.
// Only the fields the cached views read are deserialized; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository commit, as returned by the commits listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub sha: String,
    pub html_url: String,
    pub commit: CommitDetail,
}

/// Git-level commit data nested inside a [`Commit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub committer: Signature,
}

/// Author or committer signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub name: Option<String>,
    pub date: DateTime<Utc>,
}

/// Issue from the issues collection. Pull requests also appear here,
/// distinguished by a non-null `pull_request` back-reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pull_request: Option<PullRequestLink>,
}

impl Issue {
    /// Whether this record is really a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Back-reference from an issue record to its pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestLink {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Pull request from the pull request collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

/// Organization repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}

/// Release tag of the core repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub commit: Option<TagCommit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCommit {
    pub sha: String,
}

/// A repository that publishes rendered API documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiModule {
    pub name: String,
    pub html: String,
}

/// Most recent activity across commits and issues. All fields are absent
/// when there is neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

impl LatestUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.updated.is_none() && self.url.is_none()
    }
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_pull_request_reference() {
        let plain: Issue = serde_json::from_value(json!({
            "number": 1,
            "title": "bug",
            "html_url": "https://github.com/hapijs/hapi/issues/1",
            "updated_at": "2020-01-01T00:00:00Z",
            "pull_request": null
        }))
        .unwrap();
        assert!(!plain.is_pull_request());

        let pr: Issue = serde_json::from_value(json!({
            "number": 2,
            "title": "fix",
            "html_url": "https://github.com/hapijs/hapi/pull/2",
            "updated_at": "2020-01-01T00:00:00Z",
            "pull_request": { "url": "https://api.github.com/repos/hapijs/hapi/pulls/2" }
        }))
        .unwrap();
        assert!(pr.is_pull_request());
    }

    #[test]
    fn test_commit_date_with_offset_is_normalized() {
        let commit: Commit = serde_json::from_value(json!({
            "sha": "abc",
            "html_url": "https://github.com/hapijs/hapi/commit/abc",
            "commit": {
                "message": "msg",
                "committer": { "name": "x", "date": "2020-01-01T02:00:00+02:00" }
            }
        }))
        .unwrap();

        let expected: DateTime<Utc> = "2020-01-01T00:00:00Z".parse().unwrap();
        assert_eq!(commit.commit.committer.date, expected);
    }

    #[test]
    fn test_repository_archived_defaults_false() {
        let repo: Repository = serde_json::from_value(json!({ "name": "joi" })).unwrap();
        assert!(!repo.archived);
    }

    #[test]
    fn test_empty_latest_update_serializes_to_empty_object() {
        let latest = LatestUpdate::default();
        assert!(latest.is_empty());
        assert_eq!(serde_json::to_value(&latest).unwrap(), json!({}));
    }
}
