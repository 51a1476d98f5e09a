use reqwest::blocking::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::FetchError;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("schema-validate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&Config> for HttpClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            user_agent: config.network.user_agent.clone(),
        }
    }
}

/// Blocking HTTP client for referenced schema documents.
///
/// Each document is requested once, with no timeout and no retries.
/// Schema compilation is synchronous, so this client must only be used from
/// a blocking thread (never from an async worker).
pub struct SchemaHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl SchemaHttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Download a JSON document
    pub fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "schema download failed");
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json()?)
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answer every request with `status` and count the connections.
    fn serve(status_line: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/schema.json", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let body = "{\"type\": \"string\"}";
                let response = format!(
                    "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (url, hits)
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = Config::default();
        settings.network.user_agent = "catalog-checker/2".to_string();

        let config = HttpClientConfig::from(&settings);
        assert_eq!(config.user_agent, "catalog-checker/2");
        assert!(HttpClientConfig::default().user_agent.starts_with("schema-validate/"));
    }

    #[test]
    fn test_fetch_json() {
        let (url, hits) = serve("HTTP/1.1 200 OK");
        let client = SchemaHttpClient::new(HttpClientConfig::default()).unwrap();

        let value = client.fetch_json(&url).unwrap();
        assert_eq!(value, serde_json::json!({"type": "string"}));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_server_error_is_not_retried() {
        let (url, hits) = serve("HTTP/1.1 503 Service Unavailable");
        let client = SchemaHttpClient::new(HttpClientConfig::default()).unwrap();

        match client.fetch_json(&url).unwrap_err() {
            FetchError::HttpStatus { status, .. } => assert_eq!(status, 503),
            other => panic!("Expected HttpStatus, got {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
