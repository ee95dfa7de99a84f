// Snapshot store client interface.
// Long-lived commit, issue, and pull request snapshots are precomputed elsewhere
// and read here through a short-lived session.

use async_trait::async_trait;

use crate::error::Result;
use crate::github::{Commit, Issue, PullRequest};

/// Opens sessions against the persistent snapshot store.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StoreSession>>;
}

/// One open connection. Must be closed exactly once.
#[async_trait]
pub trait StoreSession: Send {
    /// Commits, most recent first.
    async fn commits(&mut self) -> Result<Vec<Commit>>;

    /// Issues, including pull-request-shaped issues, most recently updated first.
    async fn issues(&mut self) -> Result<Vec<Issue>>;

    async fn pull_requests(&mut self) -> Result<Vec<PullRequest>>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Close `session` and return `read`. A read failure wins over a close failure.
pub async fn release<T>(session: Box<dyn StoreSession>, read: Result<T>) -> Result<T> {
    let closed = session.close().await;
    let value = read?;
    closed?;
    Ok(value)
}
