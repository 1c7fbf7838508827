//! Uploader configuration.
//!
//! Stored as TOML, e.g.:
//!
//! ```toml
//! endpoint = "https://files.example.com/upload"
//! chunk_size = 1000000
//! delete_endpoint = "https://files.example.com/delete"
//!
//! [headers]
//! X-Requested-With = "XMLHttpRequest"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use chunkline_protocol::constants::REQUESTED_WITH_HEADER;
use chunkline_transfer::DEFAULT_CHUNK_SIZE;

use crate::error::UploadError;

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// URL every chunk is POSTed to. Required.
    #[serde(default)]
    pub endpoint: String,

    /// Maximum payload bytes per chunk request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Optional URL for remote deletes (`POST <url>?fid=<fid>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_endpoint: Option<String>,

    /// Extra headers sent with every chunk request.
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_headers() -> BTreeMap<String, String> {
    let (name, value) = REQUESTED_WITH_HEADER;
    BTreeMap::from([(name.to_string(), value.to_string())])
}

impl UploaderConfig {
    /// Creates a config for `endpoint` with default chunk size and headers.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            chunk_size: default_chunk_size(),
            delete_endpoint: None,
            headers: default_headers(),
        }
    }

    /// Reads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, UploadError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            endpoint = %config.endpoint,
            "uploader config loaded"
        );
        Ok(config)
    }

    /// Checks the config is usable. Every queue constructor calls this.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.endpoint.trim().is_empty() {
            return Err(UploadError::Config("must specify uploading address".into()));
        }
        self.endpoint_url()?;
        self.delete_url()?;

        if self.chunk_size == 0 {
            return Err(UploadError::Config("chunk_size must be greater than 0".into()));
        }

        self.header_map()?;
        Ok(())
    }

    pub(crate) fn endpoint_url(&self) -> Result<Url, UploadError> {
        parse_http_url("endpoint", &self.endpoint)
    }

    pub(crate) fn delete_url(&self) -> Result<Option<Url>, UploadError> {
        self.delete_endpoint
            .as_deref()
            .map(|url| parse_http_url("delete_endpoint", url))
            .transpose()
    }

    pub(crate) fn header_map(&self) -> Result<HeaderMap, UploadError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| UploadError::Config(format!("invalid header name: {name}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| UploadError::Config(format!("invalid value for header {name}")))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

fn parse_http_url(field: &str, raw: &str) -> Result<Url, UploadError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| UploadError::Config(format!("invalid {field} {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UploadError::Config(format!(
            "unsupported {field} scheme: {other}"
        ))),
    }
}
