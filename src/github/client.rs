// GitHub download capability.
// Fetches one URL and absorbs every HTTP-level failure into `Fetched::Absent`.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{
    Client, Response,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT},
};
use serde::{Serialize, Serializer, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{HubError, Result};

use super::types::RateLimit;

const HTML_MEDIA_TYPE: &str = "application/vnd.github.3.html";

/// Outcome of a best-effort fetch: the payload, or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Found(T),
    Absent,
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Fetched::Absent
    }
}

impl<T> Fetched<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Fetched::Found(_))
    }

    /// Borrow the payload if present.
    pub fn found(&self) -> Option<&T> {
        match self {
            Fetched::Found(value) => Some(value),
            Fetched::Absent => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Fetched::Found(value) => Some(value),
            Fetched::Absent => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Found(value) => Fetched::Found(f(value)),
            Fetched::Absent => Fetched::Absent,
        }
    }
}

impl<T> From<Option<T>> for Fetched<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Fetched::Found(value),
            None => Fetched::Absent,
        }
    }
}

impl<T: Serialize> Serialize for Fetched<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Fetched::Found(value) => value.serialize(serializer),
            Fetched::Absent => serializer.serialize_none(),
        }
    }
}

/// Per-request options layered over the fetcher's default headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    /// Decode the body as JSON; otherwise it is returned as a string.
    pub json: bool,
}

impl RequestOptions {
    /// JSON API request with no extra headers.
    pub fn json() -> Self {
        Self {
            headers: Vec::new(),
            json: true,
        }
    }

    /// Rendered-markdown request: asks GitHub for HTML and keeps the raw body.
    pub fn html() -> Self {
        Self {
            headers: Vec::new(),
            json: false,
        }
        .with_header("accept", HTML_MEDIA_TYPE)
    }

    /// Set a header, replacing any existing one with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HubError::InvalidHeader(e.to_string()))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| HubError::InvalidHeader(e.to_string()))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

/// Fetch capability. Implementations never fail for HTTP-level problems;
/// they return `Fetched::Absent` instead. Errors are reserved for faults in
/// the call itself, such as an unencodable header.
#[async_trait]
pub trait Download: Send + Sync {
    async fn download(&self, url: &str, options: &RequestOptions) -> Result<Fetched<Value>>;
}

/// Download and decode a JSON payload. A payload that does not match `T`
/// counts as absent.
pub async fn download_json<T: DeserializeOwned>(
    download: &dyn Download,
    url: &str,
    options: &RequestOptions,
) -> Result<Fetched<T>> {
    let fetched = download.download(url, options).await?;
    Ok(match fetched {
        Fetched::Found(value) => match serde_json::from_value(value) {
            Ok(decoded) => Fetched::Found(decoded),
            Err(e) => {
                debug!(url, error = %e, "payload did not match expected shape");
                Fetched::Absent
            }
        },
        Fetched::Absent => Fetched::Absent,
    })
}

/// Download a raw text body (rendered HTML).
pub async fn download_text(
    download: &dyn Download,
    url: &str,
    options: &RequestOptions,
) -> Result<Fetched<String>> {
    let fetched = download.download(url, options).await?;
    Ok(match fetched {
        Fetched::Found(Value::String(text)) => Fetched::Found(text),
        Fetched::Found(other) => Fetched::Found(other.to_string()),
        Fetched::Absent => Fetched::Absent,
    })
}

/// reqwest-backed fetcher with token authentication and rate limit tracking.
pub struct GitHubFetcher {
    client: Client,
    rate_limit: Mutex<RateLimit>,
}

impl GitHubFetcher {
    /// Create a fetcher that authenticates with the configured token.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}", config.github_token))
                .map_err(|e| HubError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| HubError::InvalidHeader(e.to_string()))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            rate_limit: Mutex::new(RateLimit::default()),
        })
    }

    /// Rate limit values from the most recent response.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit.lock().clone()
    }

    /// Update rate limit from response headers.
    fn update_rate_limit(&self, response: &Response) {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        };

        let mut rate_limit = self.rate_limit.lock();
        if let Some(limit) = header("x-ratelimit-limit") {
            rate_limit.limit = limit;
        }
        if let Some(reset) = header("x-ratelimit-reset") {
            rate_limit.reset = reset;
        }
        if let Some(remaining) = header("x-ratelimit-remaining") {
            rate_limit.remaining = remaining;
            if remaining == 0 {
                let reset_at = chrono::DateTime::from_timestamp(rate_limit.reset as i64, 0)
                    .map(|dt| dt.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(%reset_at, "GitHub rate limit exhausted");
            }
        }
    }
}

#[async_trait]
impl Download for GitHubFetcher {
    async fn download(&self, url: &str, options: &RequestOptions) -> Result<Fetched<Value>> {
        let headers = options.header_map()?;

        let response = match self.client.get(url).headers(headers).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "request failed");
                return Ok(Fetched::Absent);
            }
        };

        self.update_rate_limit(&response);

        let status = response.status();
        if !status.is_success() {
            debug!(url, %status, "non-success response");
            return Ok(Fetched::Absent);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(url, error = %e, "failed to read body");
                return Ok(Fetched::Absent);
            }
        };

        if !options.json {
            return Ok(Fetched::Found(Value::String(body)));
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(Fetched::Found(value)),
            Err(e) => {
                debug!(url, error = %e, "response was not valid JSON");
                Ok(Fetched::Absent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::{Router, routing::get};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn spawn_server() -> SocketAddr {
        let app = Router::new()
            .route(
                "/json",
                get(|| async {
                    (
                        [("x-ratelimit-limit", "5000"), ("x-ratelimit-remaining", "4999")],
                        r#"{"name":"hapi"}"#,
                    )
                }),
            )
            .route("/text", get(|| async { "<h1>API</h1>" }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/echo",
                get(|headers: AxumHeaders| async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    };
                    axum::Json(serde_json::json!({
                        "authorization": header("authorization"),
                        "user_agent": header("user-agent"),
                        "accept": header("accept"),
                    }))
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    fn fetcher() -> GitHubFetcher {
        GitHubFetcher::new(&Config::new("secret")).unwrap()
    }

    #[test]
    fn test_with_header_replaces_case_insensitively() {
        let options = RequestOptions::html().with_header("Accept", "text/plain");
        assert_eq!(options.headers.len(), 1);
        assert_eq!(options.header("accept"), Some("text/plain"));
    }

    #[test]
    fn test_fetched_serializes_absent_as_null() {
        let absent: Fetched<String> = Fetched::Absent;
        assert_eq!(serde_json::to_value(&absent).unwrap(), Value::Null);
        let found = Fetched::Found("doc".to_string());
        assert_eq!(serde_json::to_value(&found).unwrap(), Value::from("doc"));
    }

    #[tokio::test]
    async fn test_download_json_found() {
        let addr = spawn_server().await;
        let fetcher = fetcher();

        let fetched = fetcher
            .download(&format!("http://{addr}/json"), &RequestOptions::json())
            .await
            .unwrap();

        assert_eq!(fetched, Fetched::Found(serde_json::json!({ "name": "hapi" })));
        assert_eq!(fetcher.rate_limit().limit, 5000);
        assert_eq!(fetcher.rate_limit().remaining, 4999);
    }

    #[tokio::test]
    async fn test_download_raw_text() {
        let addr = spawn_server().await;
        let text = download_text(&fetcher(), &format!("http://{addr}/text"), &RequestOptions::html())
            .await
            .unwrap();
        assert_eq!(text, Fetched::Found("<h1>API</h1>".to_string()));
    }

    #[tokio::test]
    async fn test_not_found_is_absent() {
        let addr = spawn_server().await;
        let fetched = fetcher()
            .download(&format!("http://{addr}/missing"), &RequestOptions::json())
            .await
            .unwrap();
        assert_eq!(fetched, Fetched::Absent);
    }

    #[tokio::test]
    async fn test_invalid_json_is_absent() {
        let addr = spawn_server().await;
        let fetched = fetcher()
            .download(&format!("http://{addr}/text"), &RequestOptions::json())
            .await
            .unwrap();
        assert_eq!(fetched, Fetched::Absent);
    }

    #[tokio::test]
    async fn test_connection_refused_is_absent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetched = fetcher()
            .download(&format!("http://{addr}/json"), &RequestOptions::json())
            .await
            .unwrap();
        assert_eq!(fetched, Fetched::Absent);
    }

    #[tokio::test]
    async fn test_default_and_request_headers_are_sent() {
        let addr = spawn_server().await;
        let fetched = download_json::<serde_json::Value>(
            &fetcher(),
            &format!("http://{addr}/echo"),
            &RequestOptions::json().with_header("accept", HTML_MEDIA_TYPE),
        )
        .await
        .unwrap();

        let echoed = fetched.into_option().unwrap();
        assert_eq!(echoed["authorization"], "token secret");
        assert_eq!(echoed["user_agent"], "hapijs.com");
        assert_eq!(echoed["accept"], HTML_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_invalid_header_is_an_error() {
        let options = RequestOptions::json().with_header("bad header", "x");
        let result = fetcher().download("http://127.0.0.1:1/", &options).await;
        assert!(matches!(result, Err(HubError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_absent() {
        let addr = spawn_server().await;
        let fetched = download_json::<Vec<String>>(
            &fetcher(),
            &format!("http://{addr}/json"),
            &RequestOptions::json(),
        )
        .await
        .unwrap();
        assert_eq!(fetched, Fetched::Absent);
    }
}
