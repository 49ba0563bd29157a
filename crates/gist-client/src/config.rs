//! Gateway configuration.
//!
//! Configuration is data. Each backend environment has a fixed pair of base
//! URLs; everything else has a default that production clients keep.

use std::time::Duration;

use gist_core::{DEFAULT_HEARTBEAT_TIMEOUT, RetryPolicy};
use gist_store::GistEnvironment;
use url::Url;

use crate::ConfigError;

/// Path of the server-sent events endpoint.
pub const SSE_PATH: &str = "/api/v3/sse";

/// Path of the queue polling endpoint.
pub const QUEUE_PATH: &str = "/api/v4/users";

/// Request header names.
pub mod headers {
    /// Workspace site id.
    pub const SITE_ID: &str = "X-CIO-Site-Id";
    /// Data center code.
    pub const DATA_CENTER: &str = "X-CIO-Datacenter";
    /// Client platform name.
    pub const CLIENT_PLATFORM: &str = "X-CIO-Client-Platform";
    /// Client version.
    pub const CLIENT_VERSION: &str = "X-CIO-Client-Version";
    /// `true` when no user is identified.
    pub const USER_ANONYMOUS: &str = "X-Gist-User-Anonymous";
    /// Base64 user token. Polling only, never sent on the SSE stream.
    pub const ENCODED_USER_TOKEN: &str = "X-Gist-Encoded-User-Token";
    /// Polling interval advertised by the queue, in seconds.
    pub const QUEUE_POLLING_INTERVAL: &str = "X-Gist-Queue-Polling-Interval";
    /// Id of the last event received, sent when the stream is reopened.
    pub const LAST_EVENT_ID: &str = "Last-Event-ID";
}

/// Connection settings for one backend environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL of the realtime (SSE) gateway.
    pub sse_base_url: String,
    /// Base URL of the queue (polling) API.
    pub queue_base_url: String,
    /// Value of the client platform header.
    pub client_platform: String,
    /// Value of the client version header.
    pub client_version: String,
    /// Heartbeat window until the server announces one.
    pub heartbeat_timeout: Duration,
    /// Retry policy for the persistent connection.
    pub retry: RetryPolicy,
    /// Capacity of the manager's command channel.
    pub command_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::for_environment(GistEnvironment::Production)
    }
}

impl GatewayConfig {
    /// Default configuration for `environment`.
    pub fn for_environment(environment: GistEnvironment) -> Self {
        let (sse, queue) = match environment {
            GistEnvironment::Production => {
                ("https://realtime.cloud.gist.build", "https://consumer.cloud.gist.build")
            },
            GistEnvironment::Development => {
                ("https://realtime.cloud.dev.gist.build", "https://consumer.cloud.dev.gist.build")
            },
            GistEnvironment::Local => ("http://realtime.local.gist.build:3000", "http://api.local.gist.build:86"),
        };

        Self {
            sse_base_url: sse.to_string(),
            queue_base_url: queue.to_string(),
            client_platform: "rust".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            retry: RetryPolicy::default(),
            command_buffer: 64,
        }
    }

    /// Check both base URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sse_endpoint()?;
        self.queue_endpoint()?;
        Ok(())
    }

    /// Full SSE endpoint URL.
    pub fn sse_endpoint(&self) -> Result<Url, ConfigError> {
        endpoint(&self.sse_base_url, SSE_PATH)
    }

    /// Full queue polling endpoint URL.
    pub fn queue_endpoint(&self) -> Result<Url, ConfigError> {
        endpoint(&self.queue_base_url, QUEUE_PATH)
    }
}

fn endpoint(base: &str, path: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl { url: base.to_string(), reason };

    let url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme { url: base.to_string(), scheme: url.scheme().to_string() });
    }

    url.join(path).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_environment_is_valid() {
        for environment in [GistEnvironment::Production, GistEnvironment::Development, GistEnvironment::Local] {
            GatewayConfig::for_environment(environment).validate().unwrap();
        }
    }

    #[test]
    fn endpoints_append_paths() {
        let config = GatewayConfig::default();
        assert_eq!(config.sse_endpoint().unwrap().as_str(), "https://realtime.cloud.gist.build/api/v3/sse");
        assert_eq!(config.queue_endpoint().unwrap().path(), QUEUE_PATH);
    }

    #[test]
    fn rejects_non_http_schemes() {
        let config = GatewayConfig { sse_base_url: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::UnsupportedScheme { .. })));

        let config = GatewayConfig { queue_base_url: "not a url".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }
}
