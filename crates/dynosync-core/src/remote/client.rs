//! Client for the platform's config-var API.
//!
//! A single authenticated PATCH sets one variable. There is no retry here;
//! a failed write is simply attempted again on the next debounce.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::RemoteError;
use crate::platform::RemoteCredentials;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the platform API
pub const DEFAULT_API_BASE_URL: &str = "https://api.heroku.com";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Platform API v3 media type
const ACCEPT_V3: &str = "application/vnd.heroku+json; version=3";

/// Sets named variables in a remote key/value config store.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn update_variable(
        &self,
        credentials: &RemoteCredentials,
        name: &str,
        value: &str,
    ) -> Result<(), RemoteError>;
}

/// Config-var client for the hosting platform.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HerokuClient {
    client: Client,
    base_url: String,
}

impl HerokuClient {
    pub fn new() -> Result<Self, RemoteError> {
        Self::with_settings(DEFAULT_API_BASE_URL, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_settings(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn config_vars_url(&self, app_name: &str) -> String {
        format!("{}/apps/{}/config-vars", self.base_url, app_name)
    }

    fn headers(api_key: &str) -> Result<header::HeaderMap, RemoteError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_V3));
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| RemoteError::InvalidHeader)?,
        );
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl ConfigStore for HerokuClient {
    async fn update_variable(
        &self,
        credentials: &RemoteCredentials,
        name: &str,
        value: &str,
    ) -> Result<(), RemoteError> {
        let url = self.config_vars_url(&credentials.app_name);
        let body: HashMap<&str, &str> = HashMap::from([(name, value)]);

        debug!(app = %credentials.app_name, var = name, bytes = value.len(), "Updating config var");

        let response = self
            .client
            .patch(&url)
            .headers(Self::headers(&credentials.api_key)?)
            .json(&body)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn creds() -> RemoteCredentials {
        RemoteCredentials {
            app_name: "my-bot".into(),
            api_key: "key-123".into(),
        }
    }

    /// Accept one connection, capture the raw request, reply with `response`.
    async fn one_shot_server(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).into_owned()
        });

        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_config_vars_url() {
        let client = HerokuClient::with_settings("https://api.example.com/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.config_vars_url("my-bot"),
            "https://api.example.com/apps/my-bot/config-vars"
        );
    }

    #[test]
    fn test_headers_reject_newlines() {
        assert!(matches!(
            HerokuClient::headers("bad\nkey"),
            Err(RemoteError::InvalidHeader)
        ));
    }

    #[tokio::test]
    async fn test_patch_sends_authenticated_json() {
        let (base, server) =
            one_shot_server("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}").await;
        let client = HerokuClient::with_settings(&base, Duration::from_secs(5)).unwrap();

        client
            .update_variable(&creds(), "SESSION_ID", "T:~YWJj")
            .await
            .unwrap();

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("PATCH /apps/my-bot/config-vars HTTP/1.1"));
        assert!(lower.contains("authorization: bearer key-123"));
        assert!(lower.contains("accept: application/vnd.heroku+json; version=3"));
        assert!(lower.contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"SESSION_ID":"T:~YWJj"}"#));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (base, server) = one_shot_server(
            "HTTP/1.1 403 Forbidden\r\nContent-Length: 6\r\nConnection: close\r\n\r\ndenied",
        )
        .await;
        let client = HerokuClient::with_settings(&base, Duration::from_secs(5)).unwrap();

        let err = client
            .update_variable(&creds(), "SESSION_ID", "v")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::AccessDenied(body) if body == "denied"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_server_is_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client =
            HerokuClient::with_settings(&format!("http://{}", addr), Duration::from_millis(100))
                .unwrap();
        let err = client
            .update_variable(&creds(), "SESSION_ID", "v")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Timeout));
        server.abort();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Bind then drop to get a port nobody is listening on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HerokuClient::with_settings(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
        let err = client
            .update_variable(&creds(), "SESSION_ID", "v")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Network(_) | RemoteError::Timeout));
    }
}
