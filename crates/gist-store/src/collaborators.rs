//! External collaborators driven by the middleware pipeline.
//!
//! The store never renders, networks or persists anything itself. Middleware
//! reaches the outside world only through these traits; every call is
//! synchronous and must not block, so implementations that do I/O hand the
//! work off (spawn a task, post to a UI thread) and return.

use std::sync::Arc;

use gist_proto::{Message, MessagePosition};

use crate::MetricsError;

/// Lifecycle callbacks for the host application.
///
/// Every method defaults to a no-op.
pub trait InAppEventListener: Send + Sync {
    /// A message went on screen.
    fn message_shown(&self, _message: &Message) {}

    /// A message was closed.
    fn message_dismissed(&self, _message: &Message) {}

    /// An inline message is ready for container `element_id`.
    fn embed_message(&self, _message: &Message, _element_id: &str) {}

    /// The renderer failed to show a message.
    fn message_error(&self, _message: &Message) {}

    /// The user triggered an action inside a message.
    fn message_action(&self, _message: &Message, _route: &str, _action: &str, _name: &str) {}
}

/// Reports message views to the backend.
pub trait MetricsLogger: Send + Sync {
    /// Record that `user_token` viewed `message`.
    fn log_view(&self, message: &Message, user_token: &str) -> Result<(), MetricsError>;
}

/// Shows modal messages.
pub trait MessageRenderer: Send + Sync {
    /// Begin rendering `message` anchored at `position`.
    fn show_modal(&self, message: &Message, position: MessagePosition);
}

/// Collaborator that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl InAppEventListener for Noop {}

impl MetricsLogger for Noop {
    fn log_view(&self, _message: &Message, _user_token: &str) -> Result<(), MetricsError> {
        Ok(())
    }
}

impl MessageRenderer for Noop {
    fn show_modal(&self, _message: &Message, _position: MessagePosition) {}
}

/// The set of collaborators a standard pipeline needs.
#[derive(Clone)]
pub struct Collaborators {
    /// Host lifecycle callbacks
    pub listener: Arc<dyn InAppEventListener>,
    /// View metrics
    pub metrics: Arc<dyn MetricsLogger>,
    /// Modal renderer
    pub renderer: Arc<dyn MessageRenderer>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self { listener: Arc::new(Noop), metrics: Arc::new(Noop), renderer: Arc::new(Noop) }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
