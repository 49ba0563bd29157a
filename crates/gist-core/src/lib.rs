//! Gist connection core.
//!
//! Sans-IO building blocks for the persistent-connection layer. Nothing here
//! spawns tasks, sleeps or touches the network: methods take the current
//! generation (and ticket) as input and return decisions for a driver to
//! execute. The driver in `gist-client` owns one instance of each and mutates
//! them only from its command loop.
//!
//! # Components
//!
//! - [`Generation`]: epoch tag identifying one connection attempt
//! - [`ConnectionState`]: lifecycle of the persistent connection
//! - [`RetryHelper`]: bounded retry policy with generation fencing
//! - [`HeartbeatTimer`]: single in-flight silence detector
//! - [`Environment`]: time and randomness abstraction for deterministic tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;
pub mod heartbeat;
pub mod retry;

pub use connection::{ConnectionState, Generation, GenerationTagged};
pub use env::Environment;
pub use error::ConnectionError;
pub use heartbeat::{DEFAULT_HEARTBEAT_TIMEOUT, HEARTBEAT_BUFFER, HeartbeatTicket, HeartbeatTimer};
pub use retry::{RetryDecision, RetryHelper, RetryPolicy, RetryStep, RetryTicket};
