//! Transport seams.
//!
//! The connection layer never touches sockets directly. A [`Transport`] turns
//! a [`ConnectRequest`] into a stream of [`TransportEvent`]s; a
//! [`PollingApi`] answers one queue request. Production implementations live
//! in [`crate::http`] (feature `http`); tests script them.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use gist_proto::{Message, SseEvent};
use url::Url;

use crate::TransportError;

/// A request to open (or poll) a gateway endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Full URL including query parameters.
    pub url: Url,
    /// Request headers, in send order.
    pub headers: Vec<(String, String)>,
}

impl ConnectRequest {
    /// Value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    /// Value of query parameter `name`.
    pub fn query(&self, name: &str) -> Option<String> {
        self.url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
    }
}

/// Something that happened on a persistent connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The stream is open.
    Opened,
    /// A server-sent event.
    Message {
        /// Event type (`messages`, `heartbeat`, `ttl_exceeded`, ...)
        event_type: String,
        /// Event payload
        data: String,
        /// Event id
        id: String,
    },
    /// The server ended the stream.
    Closed,
    /// The stream failed.
    Error(TransportError),
}

impl TransportEvent {
    /// Ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Error(_))
    }
}

impl From<SseEvent> for TransportEvent {
    fn from(event: SseEvent) -> Self {
        Self::Message { event_type: event.event, data: event.data, id: event.id }
    }
}

/// Boxed event stream returned by [`Transport::open`].
pub type EventStream = BoxStream<'static, TransportEvent>;

/// A persistent-connection transport.
///
/// `open` must not block: connecting happens when the stream is first polled,
/// and success is reported as [`TransportEvent::Opened`]. Dropping the stream
/// closes the connection.
pub trait Transport: Send + Sync + 'static {
    /// Begin connecting.
    fn open(&self, request: ConnectRequest) -> EventStream;
}

/// One queue poll result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollResponse {
    /// Messages in the user's queue.
    pub messages: Vec<Message>,
    /// Interval advertised by the queue, if any.
    pub poll_interval: Option<Duration>,
}

/// The queue polling API.
#[async_trait]
pub trait PollingApi: Send + Sync + 'static {
    /// Fetch the user's queue.
    async fn fetch(&self, request: ConnectRequest) -> Result<PollResponse, TransportError>;
}
