//! reqwest-backed transports.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use gist_proto::{SseDecoder, parse_message_batch};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::{
    ConnectRequest, EventStream, PollResponse, PollingApi, Transport, TransportError, TransportEvent,
    config::headers, parse_poll_interval,
};

fn build(client: &Client, request: ConnectRequest) -> RequestBuilder {
    request.headers.into_iter().fold(client.get(request.url), |builder, (name, value)| builder.header(name, value))
}

fn connect_error(error: &reqwest::Error) -> TransportError {
    match error.status() {
        Some(status) => TransportError::Status { status: status.as_u16() },
        None => TransportError::Connect(error.to_string()),
    }
}

/// Server-sent events over HTTP GET.
#[derive(Debug, Clone, Default)]
pub struct SseHttpTransport {
    client: Client,
}

impl SseHttpTransport {
    /// Transport sharing `client`'s connection pool.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

type Body = std::pin::Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

enum Phase {
    Connect(RequestBuilder),
    Reading { body: Body, decoder: SseDecoder, ready: VecDeque<TransportEvent> },
    Done,
}

impl Transport for SseHttpTransport {
    fn open(&self, request: ConnectRequest) -> EventStream {
        let builder = build(&self.client, request).header(reqwest::header::ACCEPT, "text/event-stream");

        stream::unfold(Phase::Connect(builder), |phase| async move {
            match phase {
                Phase::Connect(builder) => match builder.send().await.and_then(Response::error_for_status) {
                    Ok(response) => {
                        debug!(status = %response.status(), "event stream opened");
                        let body: Body = Box::pin(response.bytes_stream());
                        let reading = Phase::Reading { body, decoder: SseDecoder::new(), ready: VecDeque::new() };
                        Some((TransportEvent::Opened, reading))
                    },
                    Err(error) => Some((TransportEvent::Error(connect_error(&error)), Phase::Done)),
                },
                Phase::Reading { mut body, mut decoder, mut ready } => loop {
                    if let Some(event) = ready.pop_front() {
                        return Some((event, Phase::Reading { body, decoder, ready }));
                    }
                    match body.next().await {
                        Some(Ok(chunk)) => ready.extend(decoder.feed(&chunk).into_iter().map(TransportEvent::from)),
                        Some(Err(error)) => {
                            return Some((TransportEvent::Error(TransportError::Stream(error.to_string())), Phase::Done));
                        },
                        None => return Some((TransportEvent::Closed, Phase::Done)),
                    }
                },
                Phase::Done => None,
            }
        })
        .boxed()
    }
}

/// Queue polling over HTTP GET.
#[derive(Debug, Clone, Default)]
pub struct HttpPollingApi {
    client: Client,
}

impl HttpPollingApi {
    /// API sharing `client`'s connection pool.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PollingApi for HttpPollingApi {
    async fn fetch(&self, request: ConnectRequest) -> Result<PollResponse, TransportError> {
        let response = build(&self.client, request)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| connect_error(&e))?;

        let poll_interval = response
            .headers()
            .get(headers::QUEUE_POLLING_INTERVAL)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_poll_interval);

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(PollResponse { messages: Vec::new(), poll_interval });
        }

        let body = response.text().await.map_err(|e| TransportError::Stream(e.to_string()))?;
        let batch = parse_message_batch(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        if batch.skipped > 0 {
            debug!(skipped = batch.skipped, "dropped undecodable messages");
        }

        Ok(PollResponse { messages: batch.messages, poll_interval })
    }
}
