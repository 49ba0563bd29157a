//! Collaborator that writes down everything it is told.

use std::sync::{Arc, Mutex, PoisonError};

use gist_proto::{Message, MessagePosition};
use gist_store::{Collaborators, InAppEventListener, MessageRenderer, MetricsError, MetricsLogger};

/// Records listener, metrics and renderer calls as short strings:
///
/// | call | entry |
/// |------|-------|
/// | `show_modal` | `render:<id>` |
/// | `log_view` | `view:<id>:<user>` |
/// | `message_shown` | `shown:<id>` |
/// | `message_dismissed` | `dismissed:<id>` |
/// | `embed_message` | `embed:<id>:<element>` |
/// | `message_error` | `error:<id>` |
/// | `message_action` | `action:<id>:<action>` |
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    /// Empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Collaborators routing all three roles to `recorder`.
    pub fn collaborators(recorder: &Arc<Self>) -> Collaborators {
        Collaborators {
            listener: Arc::clone(recorder) as _,
            metrics: Arc::clone(recorder) as _,
            renderer: Arc::clone(recorder) as _,
        }
    }

    /// Entries so far, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Entries starting with `prefix`.
    pub fn events_matching(&self, prefix: &str) -> Vec<String> {
        self.events().into_iter().filter(|event| event.starts_with(prefix)).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl InAppEventListener for Recorder {
    fn message_shown(&self, message: &Message) {
        self.record(format!("shown:{}", message.id()));
    }

    fn message_dismissed(&self, message: &Message) {
        self.record(format!("dismissed:{}", message.id()));
    }

    fn embed_message(&self, message: &Message, element_id: &str) {
        self.record(format!("embed:{}:{element_id}", message.id()));
    }

    fn message_error(&self, message: &Message) {
        self.record(format!("error:{}", message.id()));
    }

    fn message_action(&self, message: &Message, _route: &str, action: &str, _name: &str) {
        self.record(format!("action:{}:{action}", message.id()));
    }
}

impl MetricsLogger for Recorder {
    fn log_view(&self, message: &Message, user_token: &str) -> Result<(), MetricsError> {
        self.record(format!("view:{}:{user_token}", message.id()));
        Ok(())
    }
}

impl MessageRenderer for Recorder {
    fn show_modal(&self, message: &Message, _position: MessagePosition) {
        self.record(format!("render:{}", message.id()));
    }
}
