//! Gist wire formats.
//!
//! Data model and parsers shared by the store and the connection layer:
//!
//! - [`Message`]: an in-app message as delivered by the queue gateway
//! - [`PageRule`]: route predicate restricting where a message may appear
//! - [`parse_message_batch`]: JSON array payload of SSE `messages` events and
//!   polling responses
//! - [`SseDecoder`]: incremental `text/event-stream` decoder
//!
//! Nothing in this crate performs I/O. Parsers are total: malformed input
//! yields a [`ProtoError`] (or skipped entries), never a panic.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod message;
mod page_rule;
mod payloads;
pub mod sse;

pub use errors::{ProtoError, Result};
pub use message::{GistProperties, Message, MessagePosition, MessageProperties};
pub use page_rule::PageRule;
pub use payloads::{MessageBatch, parse_heartbeat_timeout, parse_message_batch};
pub use sse::{SseDecoder, SseEvent};
