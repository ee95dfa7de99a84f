// hubcache: read-through cache of GitHub organization data.
// Source methods read commit and issue snapshots from a store, fetch documents
// and listings from the GitHub API, and memoize results per key.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod methods;
pub mod store;

pub use cache::{CachePolicy, CacheRegistry, CacheStats};
pub use config::Config;
pub use error::{HubError, Result};
pub use github::{Download, Fetched, GitHubFetcher, RequestOptions};
pub use methods::{MethodName, SourceMethods};
pub use store::{SnapshotStore, StoreSession};
