use crate::config::UpdateConfig;
use crate::error::FetchError;
use crate::manifest::Manifest;
use async_trait::async_trait;
use reqwest::Client;

/// Header carrying the optional release channel identifier.
pub const CHANNEL_HEADER: &str = "x-ota-channel";

/// Abstraction over retrieving the candidate manifest.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Perform one manifest request as described by `config`.
    async fn fetch_manifest(&self, config: &UpdateConfig) -> Result<Manifest, FetchError>;
}

/// HTTP manifest fetcher backed by a shared [`reqwest::Client`].
#[derive(Clone, Default)]
pub struct HttpManifestFetcher {
    client: Client,
}

impl HttpManifestFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-provided client (custom TLS, proxies, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch_manifest(&self, config: &UpdateConfig) -> Result<Manifest, FetchError> {
        let mut request = self
            .client
            .get(config.manifest_url().clone())
            .timeout(config.manifest_timeout());
        for (name, value) in config.manifest_request_headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(channel) = config.channel() {
            request = request.header(CHANNEL_HEADER, channel);
        }

        let response = request.send().await.map_err(map_request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status));
        }

        let body = response.bytes().await.map_err(map_request_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| FetchError::MalformedResponse(err.to_string()))
    }
}

fn map_request_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err)
    }
}
