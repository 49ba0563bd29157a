//! Scripted network seams.
//!
//! [`ScriptedTransport`] answers every `open` according to a queue of
//! [`OpenBehavior`]s and keeps a live channel to each stream it hands out,
//! so a test can push events into connection `n` at any point.
//! [`ScriptedPolling`] replays queued responses and counts requests.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use futures::{StreamExt, channel::mpsc, stream};
use gist_client::{
    ConnectRequest, EventStream, PollResponse, PollingApi, Transport, TransportError, TransportEvent,
};
use tracing::trace;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How [`ScriptedTransport`] answers one `open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenBehavior {
    /// Report `Opened`, then relay whatever the test pushes.
    Accept,
    /// Relay pushed events only. The stream never reports `Opened` by itself.
    Silent,
    /// Fail immediately with this error.
    Fail(TransportError),
}

#[derive(Debug)]
struct Connections {
    script: VecDeque<OpenBehavior>,
    fallback: OpenBehavior,
    requests: Vec<ConnectRequest>,
    senders: Vec<Option<mpsc::UnboundedSender<TransportEvent>>>,
}

/// [`Transport`] driven by the test.
#[derive(Debug)]
pub struct ScriptedTransport {
    inner: Mutex<Connections>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new(OpenBehavior::Accept)
    }
}

impl ScriptedTransport {
    /// Transport answering every unscripted `open` with `fallback`.
    pub fn new(fallback: OpenBehavior) -> Self {
        Self {
            inner: Mutex::new(Connections {
                script: VecDeque::new(),
                fallback,
                requests: Vec::new(),
                senders: Vec::new(),
            }),
        }
    }

    /// Answer the next unanswered `open` with `behavior`.
    pub fn then(&self, behavior: OpenBehavior) -> &Self {
        lock(&self.inner).script.push_back(behavior);
        self
    }

    /// Number of `open` calls so far.
    pub fn open_count(&self) -> usize {
        lock(&self.inner).requests.len()
    }

    /// Request of the `index`th `open` (0-based).
    pub fn request(&self, index: usize) -> Option<ConnectRequest> {
        lock(&self.inner).requests.get(index).cloned()
    }

    /// Push `event` into connection `index`. Returns false if that stream is
    /// gone (failed, or dropped by the reader).
    pub fn push(&self, index: usize, event: TransportEvent) -> bool {
        let inner = lock(&self.inner);
        match inner.senders.get(index).and_then(Option::as_ref) {
            Some(sender) => sender.unbounded_send(event).is_ok(),
            None => false,
        }
    }

    /// Push `event` into the most recent connection.
    pub fn push_latest(&self, event: TransportEvent) -> bool {
        let latest = self.open_count().saturating_sub(1);
        self.push(latest, event)
    }

    /// End connection `index` as if the server hung up.
    pub fn hang_up(&self, index: usize) {
        if let Some(slot) = lock(&self.inner).senders.get_mut(index) {
            slot.take();
        }
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, request: ConnectRequest) -> EventStream {
        let mut inner = lock(&self.inner);
        let behavior = inner.script.pop_front().unwrap_or_else(|| inner.fallback.clone());
        trace!(index = inner.requests.len(), ?behavior, "scripted open");
        inner.requests.push(request);

        match behavior {
            OpenBehavior::Fail(error) => {
                inner.senders.push(None);
                stream::iter([TransportEvent::Error(error)]).boxed()
            },
            OpenBehavior::Accept | OpenBehavior::Silent => {
                let (tx, rx) = mpsc::unbounded();
                if behavior == OpenBehavior::Accept {
                    let _ = tx.unbounded_send(TransportEvent::Opened);
                }
                inner.senders.push(Some(tx));
                rx.boxed()
            },
        }
    }
}

/// [`PollingApi`] replaying queued responses.
///
/// Once the queue runs dry every fetch answers with an empty queue.
#[derive(Debug, Default)]
pub struct ScriptedPolling {
    responses: Mutex<VecDeque<Result<PollResponse, TransportError>>>,
    requests: Mutex<Vec<ConnectRequest>>,
}

impl ScriptedPolling {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next fetch with `response`.
    pub fn then(&self, response: Result<PollResponse, TransportError>) -> &Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Number of fetches so far.
    pub fn fetch_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Request of the `index`th fetch (0-based).
    pub fn request(&self, index: usize) -> Option<ConnectRequest> {
        lock(&self.requests).get(index).cloned()
    }
}

#[async_trait]
impl PollingApi for ScriptedPolling {
    async fn fetch(&self, request: ConnectRequest) -> Result<PollResponse, TransportError> {
        lock(&self.requests).push(request);
        lock(&self.responses).pop_front().unwrap_or_else(|| Ok(PollResponse::default()))
    }
}
