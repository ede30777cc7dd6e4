use async_trait::async_trait;
use log::{debug, log_enabled, Level};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Url};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{AppError, Context, LookupError, Result};

use super::{normalize_channel, LookupResult, RecordSource};

/// Client for the public Kick channel endpoint. Sends no cookies or credentials.
pub struct KickClient {
    client: Client,
    api_base: Url,
}

impl KickClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .with_context(|| format!("Invalid API base URL: {}", config.api_base))?;
        if api_base.cannot_be_a_base() {
            return Err(AppError::message(format!(
                "API base URL cannot hold a path: {}",
                config.api_base
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .context("Failed to construct Kick HTTP client")?;

        Ok(Self { client, api_base })
    }

    /// `{api_base}/channels/{identifier}`, with the identifier percent-encoded.
    pub fn channel_url(&self, identifier: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("channels").push(identifier);
        }
        url
    }
}

#[async_trait]
impl RecordSource for KickClient {
    async fn fetch_record(&self, identifier: &str) -> LookupResult {
        let url = self.channel_url(identifier);
        debug!("Fetching channel {} from {}", identifier, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| LookupError::Transport {
                identifier: identifier.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                identifier: identifier.to_string(),
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| LookupError::Transport {
                identifier: identifier.to_string(),
                source,
            })?;

        let payload: Value =
            serde_json::from_str(&body).map_err(|source| LookupError::Decode {
                identifier: identifier.to_string(),
                source,
            })?;

        let record = normalize_channel(&payload, identifier)?;
        if log_enabled!(Level::Debug) {
            debug!(
                "Normalized channel {}: {}",
                identifier,
                serde_json::to_string(&record).unwrap_or_default()
            );
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one connection per canned `(status line, body)` pair and return
    /// the raw request heads in order.
    async fn serve(responses: Vec<(&'static str, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/v1", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut heads = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                heads.push(String::from_utf8_lossy(&head).to_lowercase());

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            heads
        });
        (base, server)
    }

    fn client_with_base(base: &str) -> KickClient {
        let mut config = Config::builtin().client;
        config.api_base = base.to_string();
        KickClient::new(&config).expect("client builds")
    }

    #[test]
    fn builds_channel_url_from_base() {
        let client = client_with_base("https://kick.com/api/v1");
        assert_eq!(
            client.channel_url("Seenacrash").as_str(),
            "https://kick.com/api/v1/channels/Seenacrash"
        );
    }

    #[test]
    fn tolerates_trailing_slash_and_encodes_identifier() {
        let client = client_with_base("https://kick.com/api/v1/");
        assert_eq!(
            client.channel_url("a b/c").as_str(),
            "https://kick.com/api/v1/channels/a%20b%2Fc"
        );
    }

    #[test]
    fn rejects_invalid_base() {
        let mut config = Config::builtin().client;
        config.api_base = "not a url".to_string();
        assert!(KickClient::new(&config).is_err());

        config.api_base = "mailto:someone@example.com".to_string();
        assert!(KickClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn upstream_failures_become_lookup_errors() {
        let (base, server) = serve(vec![
            ("500 Internal Server Error", "{}"),
            ("200 OK", "<html>cloudflare</html>"),
            ("200 OK", r#"{"error":"x"}"#),
            (
                "200 OK",
                r#"{"id":7,"user":{"username":"Keoxer"},"livestream":null}"#,
            ),
        ])
        .await;
        let client = client_with_base(&base);

        let err = client.fetch_record("Keoxer").await.unwrap_err();
        assert!(
            matches!(&err, LookupError::Status { status, .. } if status.as_u16() == 500),
            "{err:?}"
        );
        let err = client.fetch_record("Keoxer").await.unwrap_err();
        assert!(matches!(err, LookupError::Decode { .. }), "{err:?}");
        let err = client.fetch_record("Keoxer").await.unwrap_err();
        assert!(matches!(err, LookupError::MissingShape { .. }), "{err:?}");
        assert_eq!(err.identifier(), "Keoxer");

        let record = client.fetch_record("Keoxer").await.unwrap();
        assert_eq!(record.id, Some(7));
        assert_eq!(record.username, "Keoxer");
        assert_eq!(record.is_live, Some(false));

        let heads = server.await.unwrap();
        assert_eq!(heads.len(), 4);
        for head in &heads {
            assert!(head.starts_with("get /api/v1/channels/keoxer http/1.1"), "{head}");
            assert!(head.contains("accept: application/json"), "{head}");
            assert!(head.contains("user-agent: kick-persian-streams/1.0"), "{head}");
            assert!(!head.contains("cookie:"), "{head}");
            assert!(!head.contains("authorization:"), "{head}");
        }
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/v1", listener.local_addr().unwrap());
        drop(listener);
        let client = client_with_base(&base);

        let err = client.fetch_record("Erph").await.unwrap_err();
        assert!(matches!(err, LookupError::Transport { .. }), "{err:?}");
    }
}
