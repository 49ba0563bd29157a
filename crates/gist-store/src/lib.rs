//! In-app message store.
//!
//! A single-writer state container in the Redux style: every change is an
//! [`Action`] that passes through a fixed middleware chain and then the pure
//! [`reduce`] function. The [`Store`] serializes dispatches FIFO and publishes
//! each result as an immutable `Arc` snapshot.
//!
//! # Components
//!
//! - [`InAppMessageState`]: value-type state (queue, modal and inline lifecycle)
//! - [`Action`]: closed set of state changes
//! - [`reduce`]: pure transition function
//! - [`middleware`]: the seven-stage pipeline and the [`Middleware`] trait
//! - [`Store`]: serialized dispatch, snapshots and subscriptions
//! - [`InAppEventListener`], [`MetricsLogger`], [`MessageRenderer`]: the outside world

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod collaborators;
mod error;
pub mod middleware;
mod reducer;
mod state;
mod store;

pub use action::{Action, EngineAction};
pub use collaborators::{Collaborators, InAppEventListener, MessageRenderer, MetricsLogger, Noop};
pub use error::{MetricsError, StoreError, UnknownEnvironment};
pub use middleware::{InAppPipeline, Middleware};
pub use reducer::reduce;
pub use state::{
    DEFAULT_POLL_INTERVAL, GistEnvironment, InAppMessageState, InlineMessageState, ModalMessageState,
};
pub use store::{Comparator, MAX_CASCADE, Store, StoreSubscriber, SubscriptionId};
