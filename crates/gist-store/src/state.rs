//! In-app message state.
//!
//! [`InAppMessageState`] is a value type. The reducer never mutates a state in
//! place: it clones, edits the clone and returns it, and the store publishes
//! the result as a fresh `Arc` snapshot. Readers holding an older snapshot
//! never observe a change.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
    time::Duration,
};

use gist_proto::Message;

use crate::UnknownEnvironment;

/// Queue polling interval used until the server advertises one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(600);

/// Backend environment a client talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GistEnvironment {
    /// Production endpoints.
    #[default]
    Production,
    /// Development (staging) endpoints.
    Development,
    /// Locally running gateway.
    Local,
}

impl fmt::Display for GistEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Local => "local",
        };
        f.write_str(name)
    }
}

impl FromStr for GistEnvironment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            "local" => Ok(Self::Local),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

/// Lifecycle of the (single) modal message.
///
/// ```text
/// Initial ──load──> Loading ──display──> Displayed
///    ↑                 │                     │
///    │               dismiss              dismiss
///    │                 ↓                     │
///    └──── load ── Dismissed <───────────────┘
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModalMessageState {
    /// Nothing requested yet.
    #[default]
    Initial,
    /// Renderer asked to show the message.
    Loading(Message),
    /// Message on screen.
    Displayed(Message),
    /// Message closed, failed or was routed away.
    Dismissed(Message),
}

impl ModalMessageState {
    /// The message this state refers to, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Initial => None,
            Self::Loading(m) | Self::Displayed(m) | Self::Dismissed(m) => Some(m),
        }
    }

    /// Loading or displayed.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Loading(_) | Self::Displayed(_))
    }

    /// The message currently loading or on screen.
    pub fn active_message(&self) -> Option<&Message> {
        match self {
            Self::Loading(m) | Self::Displayed(m) => Some(m),
            Self::Initial | Self::Dismissed(_) => None,
        }
    }
}

/// Lifecycle of an inline message in one host container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InlineMessageState {
    /// Nothing requested yet.
    #[default]
    Initial,
    /// Waiting for the host container to embed the message.
    ReadyToEmbed {
        /// Message to embed
        message: Message,
        /// Host container
        element_id: String,
    },
    /// Message embedded in the container.
    Embedded {
        /// Embedded message
        message: Message,
        /// Host container
        element_id: String,
    },
    /// Message removed from the container.
    Dismissed(Message),
}

impl InlineMessageState {
    /// The message this state refers to, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Initial => None,
            Self::ReadyToEmbed { message, .. }
            | Self::Embedded { message, .. }
            | Self::Dismissed(message) => Some(message),
        }
    }

    /// Waiting to embed or embedded.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::ReadyToEmbed { .. } | Self::Embedded { .. })
    }
}

/// Complete in-app messaging state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InAppMessageState {
    /// Workspace site id.
    pub site_id: String,
    /// Data center code (`us`, `eu`).
    pub data_center: String,
    /// Backend environment.
    pub environment: GistEnvironment,
    /// Queue polling interval.
    pub poll_interval: Duration,
    /// Identified user. `None` until `SetUserIdentifier`.
    pub user_id: Option<String>,
    /// Route the host app is showing.
    pub current_route: Option<String>,
    /// Modal lifecycle.
    pub current_message_state: ModalMessageState,
    /// Inline lifecycle per host container.
    pub embedded_messages_state: HashMap<String, InlineMessageState>,
    /// Messages waiting to be shown.
    pub messages_in_queue: HashSet<Message>,
    /// Queue ids already shown. Append-only.
    pub shown_message_queue_ids: HashSet<String>,
}

impl Default for InAppMessageState {
    fn default() -> Self {
        Self {
            site_id: String::new(),
            data_center: String::new(),
            environment: GistEnvironment::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            user_id: None,
            current_route: None,
            current_message_state: ModalMessageState::Initial,
            embedded_messages_state: HashMap::new(),
            messages_in_queue: HashSet::new(),
            shown_message_queue_ids: HashSet::new(),
        }
    }
}

impl InAppMessageState {
    /// True if a non-empty user id is set.
    pub fn is_identified(&self) -> bool {
        self.user_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Has this queue id already been shown?
    pub fn was_shown(&self, queue_id: &str) -> bool {
        self.shown_message_queue_ids.contains(queue_id)
    }

    /// Queued messages ordered by queue id.
    ///
    /// The queue itself is unordered; this gives re-processing a deterministic
    /// starting order before the priority sort.
    pub fn queued_messages(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = self.messages_in_queue.iter().cloned().collect();
        messages.sort_by(|a, b| a.queue_id().cmp(&b.queue_id()).then_with(|| a.id().cmp(b.id())));
        messages
    }

    /// Inline state for host container `element_id`.
    pub fn inline_state(&self, element_id: &str) -> Option<&InlineMessageState> {
        self.embedded_messages_state.get(element_id)
    }
}
