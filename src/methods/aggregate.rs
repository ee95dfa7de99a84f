// Derived views over cached GitHub data.
// Recency merge of the newest commit and issue, and selection of repositories
// that publish API documentation.

use crate::github::{ApiModule, Commit, Fetched, Issue, LatestUpdate, Repository};

/// Pick the most recent of the newest commit and the newest issue.
///
/// The commit wins only when its committer date is strictly later than the
/// issue's update time; equal instants go to the issue.
pub fn latest_update(latest_commit: Option<&Commit>, latest_issue: Option<&Issue>) -> LatestUpdate {
    match (latest_commit, latest_issue) {
        (Some(commit), issue)
            if issue.is_none_or(|issue| commit.commit.committer.date > issue.updated_at) =>
        {
            LatestUpdate {
                title: Some(commit.commit.message.clone()),
                updated: Some(commit.commit.committer.date),
                url: Some(commit.html_url.clone()),
            }
        }
        (_, Some(issue)) => LatestUpdate {
            title: Some(issue.title.clone()),
            updated: Some(issue.updated_at),
            url: Some(issue.html_url.clone()),
        },
        _ => LatestUpdate::default(),
    }
}

/// Names of repositories that are not archived, in input order.
pub fn active_repo_names(repos: &[Repository]) -> Vec<String> {
    repos
        .iter()
        .filter(|repo| !repo.archived)
        .map(|repo| repo.name.clone())
        .collect()
}

/// Pair each name with its fetched document, drop misses and the core
/// repository, and sort by name.
pub fn collect_api_modules(
    names: Vec<String>,
    docs: Vec<Fetched<String>>,
    core_repo: &str,
) -> Vec<ApiModule> {
    let mut modules: Vec<ApiModule> = names
        .into_iter()
        .zip(docs)
        .filter(|(name, _)| name != core_repo)
        .filter_map(|(name, doc)| doc.into_option().map(|html| ApiModule { name, html }))
        .collect();

    modules.sort_by(|a, b| a.name.cmp(&b.name));
    modules
}
