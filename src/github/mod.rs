// GitHub API module.
// Provides the download capability, endpoint URLs, and record types.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{Download, Fetched, GitHubFetcher, RequestOptions, download_json, download_text};
pub use endpoints::Endpoints;
pub use types::*;
