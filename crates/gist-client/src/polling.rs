//! Queue polling fallback.
//!
//! Used when the persistent connection cannot be kept up. The loop fetches
//! the user's queue immediately, then once per `poll_interval` as currently
//! stored in the state, so an interval advertised by the server takes effect
//! from the next wait.

use std::{sync::Arc, time::Duration};

use gist_core::Environment;
use gist_store::{Action, InAppMessageState, Store};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    ConfigError, ConnectRequest, GatewayConfig, PollingApi, TransportError,
    config::headers,
    service::{encoded_user_token, site_headers},
};

/// Build the queue request for `state`.
///
/// Unlike the SSE request, the user token travels as a header.
pub fn poll_request(config: &GatewayConfig, state: &InAppMessageState) -> Result<ConnectRequest, ConfigError> {
    if state.site_id.is_empty() {
        return Err(ConfigError::MissingSiteId);
    }

    let url = config.queue_endpoint()?;
    let mut headers = site_headers(config, state);
    if let Some(token) = encoded_user_token(state) {
        headers.push((headers::ENCODED_USER_TOKEN.to_string(), token));
    }
    Ok(ConnectRequest { url, headers })
}

/// Parse the `X-Gist-Queue-Polling-Interval` header (whole seconds).
pub fn parse_poll_interval(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().filter(|secs| *secs > 0).map(Duration::from_secs)
}

/// Handle to the polling loop.
#[derive(Debug, Default)]
pub struct Poller {
    task: Option<JoinHandle<()>>,
}

impl Poller {
    /// Idle poller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling. No-op if already running.
    pub fn start<E: Environment>(
        &mut self,
        env: E,
        api: Arc<dyn PollingApi>,
        store: Arc<Store>,
        config: Arc<GatewayConfig>,
    ) {
        if self.is_active() {
            return;
        }
        info!("queue polling started");
        self.task = Some(tokio::spawn(poll_loop(env, api, store, config)));
    }

    /// Stop polling. Returns whether a loop was running.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                info!("queue polling stopped");
                true
            },
            None => false,
        }
    }

    /// Whether the loop is running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll_loop<E: Environment>(
    env: E,
    api: Arc<dyn PollingApi>,
    store: Arc<Store>,
    config: Arc<GatewayConfig>,
) {
    loop {
        poll_once(api.as_ref(), &store, &config).await;
        let interval = store.state().poll_interval;
        env.sleep(interval).await;
    }
}

/// Fetch the queue once and feed the result into the store.
pub async fn poll_once(api: &dyn PollingApi, store: &Store, config: &GatewayConfig) {
    let state = store.state();
    if !state.is_identified() {
        debug!("skipping poll: no user identified");
        return;
    }

    let request = match poll_request(config, &state) {
        Ok(request) => request,
        Err(error) => {
            warn!(%error, "cannot build poll request");
            return;
        },
    };

    let response = match api.fetch(request).await {
        Ok(response) => response,
        Err(error @ TransportError::Decode(_)) => {
            debug!(%error, "malformed queue response");
            return;
        },
        Err(error) => {
            warn!(%error, "queue poll failed");
            return;
        },
    };

    if let Some(interval) = response.poll_interval.filter(|i| *i != state.poll_interval) {
        debug!(interval_secs = interval.as_secs(), "server changed poll interval");
        dispatch(store, Action::SetPollingInterval(interval)).await;
    }

    debug!(count = response.messages.len(), "queue polled");
    dispatch(store, Action::ProcessMessageQueue(response.messages)).await;
}

async fn dispatch(store: &Store, action: Action) {
    if let Err(error) = store.dispatch(action).await {
        warn!(%error, "dispatch failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_header() {
        assert_eq!(parse_poll_interval("60"), Some(Duration::from_secs(60)));
        assert_eq!(parse_poll_interval(" 15 "), Some(Duration::from_secs(15)));
        assert_eq!(parse_poll_interval("0"), None);
        assert_eq!(parse_poll_interval("-5"), None);
        assert_eq!(parse_poll_interval("soon"), None);
    }

    #[test]
    fn poll_request_sends_token_header() {
        let state = InAppMessageState {
            site_id: "site".into(),
            data_center: "eu".into(),
            user_id: Some("u1".into()),
            ..Default::default()
        };
        let request = poll_request(&GatewayConfig::default(), &state).unwrap();

        assert_eq!(request.header(headers::ENCODED_USER_TOKEN), Some("dTE="));
        assert_eq!(request.header(headers::DATA_CENTER), Some("eu"));
        assert_eq!(request.url.path(), crate::config::QUEUE_PATH);
        assert!(request.url.query().is_none());
    }
}
