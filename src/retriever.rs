//! `$ref` retrieval for the JSON Schema engine.
//!
//! Preloaded documents are served from memory, `file://` targets are read
//! from disk and `http(s)://` targets go through [`SchemaHttpClient`].

use jsonschema::{Retrieve, Uri};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

use crate::error::FetchError;
use crate::http_client::{HttpClientConfig, SchemaHttpClient};

/// A failed retrieval, kept so the caller can report which reference broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub uri: String,
    pub details: String,
}

#[derive(Clone)]
pub struct SchemaRetriever {
    inner: Arc<RetrieverInner>,
}

struct RetrieverInner {
    documents: HashMap<String, Value>,
    http: Option<SchemaHttpClient>,
    last_failure: Mutex<Option<FetchFailure>>,
}

impl SchemaRetriever {
    /// Remote references are refused when `remote_refs` is false.
    pub fn new(
        http_config: HttpClientConfig,
        remote_refs: bool,
        documents: HashMap<String, Value>,
    ) -> Result<Self, FetchError> {
        let http = if remote_refs {
            Some(SchemaHttpClient::new(http_config)?)
        } else {
            None
        };

        Ok(Self {
            inner: Arc::new(RetrieverInner {
                documents,
                http,
                last_failure: Mutex::new(None),
            }),
        })
    }

    pub fn fetch(&self, uri: &str) -> Result<Value, FetchError> {
        let key = uri.split('#').next().unwrap_or(uri);
        if let Some(document) = self.inner.documents.get(key) {
            return Ok(document.clone());
        }

        let url = Url::parse(key).map_err(|e| FetchError::InvalidUri(format!("{key}: {e}")))?;
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::InvalidUri(key.to_string()))?;
                tracing::debug!(path = %path.display(), "reading referenced schema");
                let text = std::fs::read_to_string(&path)?;
                Ok(serde_json::from_str(&text)?)
            }
            "http" | "https" => match &self.inner.http {
                Some(client) => {
                    tracing::debug!(%url, "downloading referenced schema");
                    client.fetch_json(url.as_str())
                }
                None => Err(FetchError::RemoteDisabled {
                    url: url.to_string(),
                }),
            },
            other => Err(FetchError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }

    /// The most recent failed retrieval, if any.
    pub fn last_failure(&self) -> Option<FetchFailure> {
        self.inner
            .last_failure
            .lock()
            .ok()
            .and_then(|failure| failure.clone())
    }

    fn record_failure(&self, uri: &str, error: &FetchError) {
        if let Ok(mut slot) = self.inner.last_failure.lock() {
            *slot = Some(FetchFailure {
                uri: uri.to_string(),
                details: error.to_string(),
            });
        }
    }
}

impl Retrieve for SchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        self.fetch(uri.as_str()).map_err(|error| {
            tracing::debug!(uri = uri.as_str(), %error, "schema reference retrieval failed");
            self.record_failure(uri.as_str(), &error);
            error.into()
        })
    }
}
