use reqwest::Url;
use std::time::Duration;

const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_BUNDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Immutable configuration for an update engine.
///
/// Built once by the host at construction time; the engine never mutates it.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    manifest_url: Url,
    manifest_request_headers: Vec<(String, String)>,
    channel_identifier: Option<String>,
    manifest_request_timeout: Duration,
    bundle_request_timeout: Duration,
}

impl UpdateConfig {
    /// Create a config for the given manifest endpoint with default timeouts.
    pub fn new(manifest_url: Url) -> Self {
        Self {
            manifest_url,
            manifest_request_headers: Vec::new(),
            channel_identifier: None,
            manifest_request_timeout: DEFAULT_MANIFEST_TIMEOUT,
            bundle_request_timeout: DEFAULT_BUNDLE_TIMEOUT,
        }
    }

    /// Add a header sent verbatim with every manifest request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.manifest_request_headers
            .push((name.into(), value.into()));
        self
    }

    /// Set the release channel advertised to the update server.
    pub fn channel_identifier(mut self, channel: impl Into<String>) -> Self {
        self.channel_identifier = Some(channel.into());
        self
    }

    /// Set the timeout for the manifest request.
    pub fn manifest_request_timeout(mut self, timeout: Duration) -> Self {
        self.manifest_request_timeout = timeout;
        self
    }

    /// Set the timeout for the bundle download.
    pub fn bundle_request_timeout(mut self, timeout: Duration) -> Self {
        self.bundle_request_timeout = timeout;
        self
    }

    pub fn manifest_url(&self) -> &Url {
        &self.manifest_url
    }

    pub fn manifest_request_headers(&self) -> &[(String, String)] {
        &self.manifest_request_headers
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel_identifier.as_deref()
    }

    pub fn manifest_timeout(&self) -> Duration {
        self.manifest_request_timeout
    }

    pub fn bundle_timeout(&self) -> Duration {
        self.bundle_request_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_headers_and_channel() {
        let config = UpdateConfig::new("https://updates.example/manifest".parse().unwrap())
            .header("authorization", "Bearer token")
            .header("accept", "application/json")
            .channel_identifier("staging")
            .manifest_request_timeout(Duration::from_secs(5));

        assert_eq!(config.manifest_request_headers().len(), 2);
        assert_eq!(config.channel(), Some("staging"));
        assert_eq!(config.manifest_timeout(), Duration::from_secs(5));
        assert_eq!(config.bundle_timeout(), Duration::from_secs(120));
    }
}
