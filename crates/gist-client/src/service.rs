//! One persistent connection at a time.
//!
//! [`ConnectionService`] owns the reader task of the current stream. Each
//! stream is tagged with the generation it was opened under, and every event
//! it forwards carries that tag so the manager can discard events from a
//! stream it has already replaced.
//!
//! # Invariants
//!
//! - At most one reader task exists. Starting a stream aborts the previous
//!   reader first.
//! - `stop(generation)` only affects the stream opened under `generation`.
//! - A reader forwards at most one terminal event and exits after it.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use futures::StreamExt;
use gist_core::{Generation, GenerationTagged};
use gist_store::InAppMessageState;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

use crate::{
    ConfigError, ConnectRequest, GatewayConfig, Transport, TransportEvent, config::headers,
};

struct Reader {
    generation: Generation,
    task: JoinHandle<()>,
}

/// Wraps a [`Transport`] and its single reader task.
pub struct ConnectionService {
    transport: Arc<dyn Transport>,
    config: Arc<GatewayConfig>,
    reader: Option<Reader>,
}

impl ConnectionService {
    /// Service over `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: Arc<GatewayConfig>) -> Self {
        Self { transport, config, reader: None }
    }

    /// Build the SSE request for `state`.
    ///
    /// The user token travels only in the URL; headers carry site and client
    /// metadata.
    pub fn request(&self, state: &InAppMessageState, session_id: &str) -> Result<ConnectRequest, ConfigError> {
        if state.site_id.is_empty() {
            return Err(ConfigError::MissingSiteId);
        }

        let mut url = self.config.sse_endpoint()?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("sessionId", session_id);
            query.append_pair("siteId", &state.site_id);
            if let Some(user_token) = encoded_user_token(state) {
                query.append_pair("userToken", &user_token);
            }
        }

        Ok(ConnectRequest { url, headers: site_headers(&self.config, state) })
    }

    /// Open a stream for `generation`, forwarding events into `sink`.
    ///
    /// Any stream already running is aborted first.
    pub fn start<M, F>(&mut self, generation: Generation, request: ConnectRequest, sink: mpsc::Sender<M>, wrap: F)
    where
        M: Send + 'static,
        F: Fn(GenerationTagged<TransportEvent>) -> M + Send + 'static,
    {
        self.abort_reader();

        let mut events = self.transport.open(request);
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let terminal = event.is_terminal();
                if sink.send(wrap(GenerationTagged::new(generation, event))).await.is_err() || terminal {
                    return;
                }
            }
            // Stream ended without saying why.
            let _ = sink.send(wrap(GenerationTagged::new(generation, TransportEvent::Closed))).await;
        });

        debug!(%generation, "reader started");
        self.reader = Some(Reader { generation, task });
    }

    /// Stop the stream opened under `generation`. Returns whether one was
    /// stopped.
    pub fn stop(&mut self, generation: Generation) -> bool {
        match &self.reader {
            Some(reader) if reader.generation == generation => {
                self.abort_reader();
                true
            },
            Some(reader) => {
                debug!(%generation, active = %reader.generation, "stop for stale generation ignored");
                false
            },
            None => false,
        }
    }

    /// Generation of the running stream, if any.
    pub fn active_generation(&self) -> Option<Generation> {
        self.reader.as_ref().filter(|r| !r.task.is_finished()).map(|r| r.generation)
    }

    fn abort_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.task.abort();
            debug!(generation = %reader.generation, "reader stopped");
        }
    }
}

impl Drop for ConnectionService {
    fn drop(&mut self) {
        self.abort_reader();
    }
}

/// Base64 of the identified user id.
pub fn encoded_user_token(state: &InAppMessageState) -> Option<String> {
    state.user_id.as_deref().filter(|id| !id.is_empty()).map(|id| STANDARD.encode(id))
}

/// Site and client headers shared by the SSE and polling requests.
pub fn site_headers(config: &GatewayConfig, state: &InAppMessageState) -> Vec<(String, String)> {
    vec![
        (headers::SITE_ID.to_string(), state.site_id.clone()),
        (headers::DATA_CENTER.to_string(), state.data_center.clone()),
        (headers::CLIENT_PLATFORM.to_string(), config.client_platform.clone()),
        (headers::CLIENT_VERSION.to_string(), config.client_version.clone()),
        (headers::USER_ANONYMOUS.to_string(), (!state.is_identified()).to_string()),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use futures::stream;

    use super::*;
    use crate::EventStream;

    /// Replays a fixed script per `open`, or stays pending forever.
    #[derive(Default)]
    struct Script {
        scripts: Mutex<Vec<Vec<TransportEvent>>>,
    }

    impl Transport for Script {
        fn open(&self, _request: ConnectRequest) -> EventStream {
            match self.scripts.lock().unwrap().pop() {
                Some(events) => stream::iter(events).boxed(),
                None => stream::pending().boxed(),
            }
        }
    }

    fn state() -> InAppMessageState {
        InAppMessageState {
            site_id: "site".into(),
            data_center: "us".into(),
            user_id: Some("u1".into()),
            ..Default::default()
        }
    }

    fn service(script: Script) -> ConnectionService {
        ConnectionService::new(Arc::new(script), Arc::new(GatewayConfig::default()))
    }

    fn request(service: &ConnectionService) -> ConnectRequest {
        service.request(&state(), "session").unwrap()
    }

    #[test]
    fn request_carries_token_in_url_only() {
        let service = service(Script::default());
        let request = request(&service);

        assert_eq!(request.query("sessionId").as_deref(), Some("session"));
        assert_eq!(request.query("siteId").as_deref(), Some("site"));
        assert_eq!(request.query("userToken").as_deref(), Some("dTE="));
        assert_eq!(request.header("x-cio-site-id"), Some("site"));
        assert_eq!(request.header(headers::DATA_CENTER), Some("us"));
        assert_eq!(request.header(headers::USER_ANONYMOUS), Some("false"));
        assert!(request.header(headers::ENCODED_USER_TOKEN).is_none());
        assert!(request.headers.iter().all(|(_, value)| value != "dTE=" && value != "u1"));
    }

    #[test]
    fn anonymous_request_has_no_token() {
        let service = service(Script::default());
        let anonymous = InAppMessageState { user_id: None, ..state() };
        let request = service.request(&anonymous, "session").unwrap();

        assert!(request.query("userToken").is_none());
        assert_eq!(request.header(headers::USER_ANONYMOUS), Some("true"));
    }

    #[test]
    fn request_requires_site_id() {
        let service = service(Script::default());
        let unconfigured = InAppMessageState::default();
        assert_eq!(service.request(&unconfigured, "s"), Err(ConfigError::MissingSiteId));
    }

    #[tokio::test]
    async fn forwards_tagged_events_and_synthesizes_close() {
        let script = Script::default();
        script.scripts.lock().unwrap().push(vec![
            TransportEvent::Opened,
            TransportEvent::Message { event_type: "heartbeat".into(), data: "30".into(), id: String::new() },
        ]);
        let mut service = service(script);
        let (tx, mut rx) = mpsc::channel(8);
        let g = Generation::new(4);

        let req = request(&service);
        service.start(g, req, tx, |tagged| tagged);

        let mut seen = Vec::new();
        while let Some(tagged) = rx.recv().await {
            assert_eq!(tagged.generation, g);
            seen.push(tagged.value);
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], TransportEvent::Closed);
    }

    #[tokio::test]
    async fn stop_ignores_other_generations() {
        let mut service = service(Script::default());
        let (tx, _rx) = mpsc::channel::<GenerationTagged<TransportEvent>>(8);

        let req = request(&service);
        service.start(Generation::new(2), req, tx, |tagged| tagged);

        assert!(!service.stop(Generation::new(1)));
        assert_eq!(service.active_generation(), Some(Generation::new(2)));

        assert!(service.stop(Generation::new(2)));
        assert_eq!(service.active_generation(), None);
    }

    #[tokio::test]
    async fn restart_replaces_reader() {
        let mut service = service(Script::default());
        let (tx, _rx) = mpsc::channel::<GenerationTagged<TransportEvent>>(8);

        let req = request(&service);
        service.start(Generation::new(1), req.clone(), tx.clone(), |tagged| tagged);
        service.start(Generation::new(2), req, tx, |tagged| tagged);

        assert_eq!(service.active_generation(), Some(Generation::new(2)));
        assert!(!service.stop(Generation::new(1)));
    }
}
