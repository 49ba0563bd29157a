//! Gist connection driver.
//!
//! Keeps the in-app [`gist_store::Store`] fed with the user's message queue.
//! A persistent server-sent-events stream is preferred; when it cannot be
//! kept up the driver falls back to polling the queue API.
//!
//! # Architecture
//!
//! The state machines in [`gist_core`] decide; this crate executes. The
//! [`ConnectionManager`] task owns a [`gist_core::RetryHelper`], a
//! [`gist_core::HeartbeatTimer`], the [`ConnectionService`] and the
//! [`Poller`], and turns their decisions into spawned timers, reader tasks
//! and store dispatches.
//!
//! # Components
//!
//! - [`ConnectionManager`]: lifecycle, retries, heartbeat and polling fallback
//! - [`ConnectionService`]: the single reader task of the current stream
//! - [`Poller`]: queue polling loop
//! - [`Transport`], [`PollingApi`]: network seams
//! - [`SystemEnv`]: production [`gist_core::Environment`]
//!
//! # HTTP (optional)
//!
//! With the `http` feature enabled, [`http::SseHttpTransport`] and
//! [`http::HttpPollingApi`] implement the seams over reqwest.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
mod error;
mod manager;
mod polling;
mod service;
mod system_env;
mod transport;

#[cfg(feature = "http")]
pub mod http;

pub use config::GatewayConfig;
pub use error::{ClientError, ConfigError, TransportError};
pub use gist_core::Environment;
pub use manager::{ConnectionManager, ConnectionStatus, EVENT_HEARTBEAT, EVENT_MESSAGES, EVENT_TTL_EXCEEDED};
pub use polling::{Poller, parse_poll_interval, poll_once, poll_request};
pub use service::{ConnectionService, encoded_user_token, site_headers};
pub use system_env::SystemEnv;
pub use transport::{ConnectRequest, EventStream, PollResponse, PollingApi, Transport, TransportEvent};
