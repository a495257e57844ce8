use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;

use crate::{FailureKind, OEmbedDocument, OEmbedError};

pub const INSTAGRAM_OEMBED_ENDPOINT: &str = "https://graph.facebook.com/v18.0/instagram_oembed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OEmbedSettings {
    pub endpoint: String,
    /// Credential sent as the `access_token` query parameter.
    pub access_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for OEmbedSettings {
    fn default() -> Self {
        Self {
            endpoint: INSTAGRAM_OEMBED_ENDPOINT.to_string(),
            access_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 1024 * 1024,
        }
    }
}

#[async_trait::async_trait]
pub trait OEmbedFetcher: Send + Sync {
    async fn fetch(&self, post_url: &str) -> Result<OEmbedDocument, OEmbedError>;
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    provider_name: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestOEmbedFetcher {
    settings: OEmbedSettings,
}

impl ReqwestOEmbedFetcher {
    pub fn new(settings: OEmbedSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, OEmbedError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| OEmbedError::new(FailureKind::Network, err.to_string()))
    }

    fn request_url(&self, post_url: &str) -> Result<reqwest::Url, OEmbedError> {
        let mut params = vec![("url", post_url)];
        if let Some(token) = self.settings.access_token.as_deref() {
            params.push(("access_token", token));
        }
        reqwest::Url::parse_with_params(&self.settings.endpoint, &params)
            .map_err(|err| OEmbedError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl OEmbedFetcher for ReqwestOEmbedFetcher {
    async fn fetch(&self, post_url: &str) -> Result<OEmbedDocument, OEmbedError> {
        let request_url = self.request_url(post_url)?;
        let client = self.build_client()?;

        let response = client
            .get(request_url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OEmbedError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(OEmbedError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(OEmbedError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        parse_response(&bytes)
    }
}

fn parse_response(bytes: &[u8]) -> Result<OEmbedDocument, OEmbedError> {
    let response: OEmbedResponse = serde_json::from_slice(bytes)
        .map_err(|err| OEmbedError::new(FailureKind::MalformedResponse, err.to_string()))?;
    let html = response
        .html
        .filter(|html| !html.trim().is_empty())
        .ok_or_else(|| OEmbedError::new(FailureKind::MalformedResponse, "missing html field"))?;
    Ok(OEmbedDocument {
        html,
        title: response.title,
        author_name: response.author_name,
        provider_name: response.provider_name,
        thumbnail_url: response.thumbnail_url,
    })
}

fn map_reqwest_error(err: reqwest::Error) -> OEmbedError {
    if err.is_timeout() {
        return OEmbedError::new(FailureKind::Timeout, err.to_string());
    }
    OEmbedError::new(FailureKind::Network, err.to_string())
}
