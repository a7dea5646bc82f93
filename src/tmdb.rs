//! TMDB API client for searching the remote catalog.
//!
//! This module provides:
//!
//! - `CatalogClient`: HTTP client wrapper bound to one search endpoint
//! - `ApiError`: the single error type surfaced for transport, status and parse failures
//! - `QueryParams`: the key/value pairs sent as the query string
//!
//! The response envelope is TMDB's paged search result. Only its `results`
//! array is used; a response without one is an empty page, not an error.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::models::Movie;

/// Default search endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/search/tv";

/// User agent for API requests
const USER_AGENT: &str = concat!("moviebox/", env!("CARGO_PKG_VERSION"));

/// Query string parameters (ordered so requests are reproducible in logs)
pub type QueryParams = BTreeMap<String, String>;

/// Error returned by the catalog API or while talking to it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable description, never empty
    pub message: String,
    /// HTTP status when the server answered
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message: if message.is_empty() {
                "Unknown API error".to_string()
            } else {
                message
            },
            status: None,
        }
    }

    fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(message)
        }
    }
}

/// Paged search envelope
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Option<Vec<Movie>>,
}

/// Error body TMDB sends with non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    status_message: Option<String>,
}

/// Parse a successful response body into catalog records
pub fn parse_results(body: &str) -> Result<Vec<Movie>, ApiError> {
    let page: SearchPage = serde_json::from_str(body)
        .map_err(|e| ApiError::new(format!("Malformed response: {}", e)))?;
    Ok(page.results.unwrap_or_default())
}

/// TMDB catalog client
#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl CatalogClient {
    /// Create a client for the given search endpoint
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| ApiError::new(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::new(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Host and port the client talks to, for reachability probing
    pub fn endpoint(&self) -> Option<(String, u16)> {
        let host = self.base_url.host_str()?.to_string();
        let port = self.base_url.port_or_known_default()?;
        Some((host, port))
    }

    /// GET the search endpoint with `params` and return the page's records
    pub async fn fetch(&self, params: &QueryParams) -> Result<Vec<Movie>, ApiError> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get(self.base_url.clone())
            .query(params)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::new(describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::new(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.status_message)
                .unwrap_or_else(|| {
                    format!(
                        "Request failed with status {} {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown error")
                    )
                });
            tracing::warn!("Catalog request failed ({}): {}", status, message);
            return Err(ApiError::with_status(message, status.as_u16()));
        }

        let movies = parse_results(&body)?;
        tracing::debug!(
            "Fetched {} records (page {}) in {:.1}s",
            movies.len(),
            params.get("page").map(String::as_str).unwrap_or("?"),
            start.elapsed().as_secs_f32()
        );
        Ok(movies)
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        format!("Could not connect to the catalog server: {}", e)
    } else {
        format!("Network error: {}", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single canned HTTP response; the request head is sent back on the channel.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let head = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(head);
        });

        (format!("http://{}/3/search/tv", addr), rx)
    }

    fn client(url: &str) -> CatalogClient {
        CatalogClient::new(url, Duration::from_secs(5)).unwrap()
    }

    fn params(query: &str, page: u32) -> QueryParams {
        let mut params = QueryParams::new();
        params.insert("api_key".into(), "secret".into());
        params.insert("page".into(), page.to_string());
        params.insert("query".into(), query.into());
        params
    }

    #[test]
    fn test_parse_results() {
        let movies = parse_results(
            r#"{"page": 1, "results": [{"id": 10, "name": "Batman"}, {"id": 20, "name": "Batman Beyond"}]}"#,
        )
        .unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].id, 10);
        assert_eq!(movies[1].name, "Batman Beyond");
    }

    #[test]
    fn test_parse_results_missing_array_is_empty() {
        assert!(parse_results(r#"{"page": 3}"#).unwrap().is_empty());
        assert!(parse_results(r#"{"results": null}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_results_malformed() {
        let err = parse_results("<html>oops</html>").unwrap_err();
        assert!(err.message.starts_with("Malformed response"));
    }

    #[test]
    fn test_api_error_never_empty() {
        assert_eq!(ApiError::new("").message, "Unknown API error");
        assert_eq!(ApiError::new("bad").to_string(), "bad");
    }

    #[test]
    fn test_endpoint() {
        let c = client("https://api.themoviedb.org/3/search/tv");
        assert_eq!(c.endpoint(), Some(("api.themoviedb.org".to_string(), 443)));
    }

    #[tokio::test]
    async fn test_fetch_success_sends_query_params() {
        let (url, head) = serve_once(
            "200 OK",
            r#"{"page": 1, "results": [{"id": 10, "name": "Batman"}, {"id": 20, "name": "The Batman"}]}"#,
        )
        .await;

        let movies = client(&url).fetch(&params("batman", 1)).await.unwrap();
        assert_eq!(movies.iter().map(|m| m.id).collect::<Vec<_>>(), vec![10, 20]);

        let head = head.await.unwrap();
        let request_line = head.lines().next().unwrap();
        assert!(request_line.starts_with("GET /3/search/tv?"));
        assert!(request_line.contains("api_key=secret"));
        assert!(request_line.contains("page=1"));
        assert!(request_line.contains("query=batman"));
    }

    #[tokio::test]
    async fn test_fetch_status_error_uses_status_message() {
        let (url, _head) = serve_once(
            "401 Unauthorized",
            r#"{"status_code": 7, "status_message": "Invalid API key: You must be granted a valid key."}"#,
        )
        .await;

        let err = client(&url).fetch(&params("all", 1)).await.unwrap_err();
        assert_eq!(err.status, Some(401));
        assert!(err.message.starts_with("Invalid API key"));
    }

    #[tokio::test]
    async fn test_fetch_status_error_without_body() {
        let (url, _head) = serve_once("500 Internal Server Error", "").await;

        let err = client(&url).fetch(&params("all", 1)).await.unwrap_err();
        assert_eq!(err.status, Some(500));
        assert!(err.message.contains("500"));
    }

    #[tokio::test]
    async fn test_fetch_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}/search", addr))
            .fetch(&params("all", 1))
            .await
            .unwrap_err();
        assert!(!err.message.is_empty());
        assert_eq!(err.status, None);
    }
}
