//! Store actions.
//!
//! Actions are plain data. The set is closed: the reducer and every
//! middleware match on it exhaustively.

use std::time::Duration;

use gist_proto::{Message, MessagePosition};

use crate::GistEnvironment;

/// Events raised by the message rendering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAction {
    /// The user tapped an action inside a message.
    Tap {
        /// Message tapped
        message: Message,
        /// Route the message was showing on
        route: String,
        /// Action payload
        action: String,
        /// Action name
        name: String,
    },
    /// The renderer could not load the message.
    MessageLoadingFailed(Message),
    /// The renderer reported an error for the message.
    Error(Message),
}

/// Everything that can change the in-app message state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start over for a workspace. Clears the user and queues.
    Initialize {
        /// Workspace site id
        site_id: String,
        /// Data center code
        data_center: String,
        /// Backend environment
        environment: GistEnvironment,
    },
    /// Server-advertised polling interval.
    SetPollingInterval(Duration),
    /// Identify the user.
    SetUserIdentifier(String),
    /// The host app navigated.
    SetPageRoute(String),
    /// Messages fetched from the gateway.
    ProcessMessageQueue(Vec<Message>),
    /// Drop every queued message.
    ClearMessageQueue,
    /// Ask the renderer to load a modal message.
    LoadMessage {
        /// Message to show
        message: Message,
        /// Anchor override. Defaults to the message's own position.
        position: Option<MessagePosition>,
    },
    /// Hand an inline message to its host container.
    EmbedMessage {
        /// Message to embed
        message: Message,
        /// Host container
        element_id: String,
    },
    /// The renderer put the message on screen.
    DisplayMessage(Message),
    /// Close a message.
    DismissMessage {
        /// Message to close
        message: Message,
        /// Whether this dismissal may log a view metric
        should_log: bool,
        /// Dismissed by an explicit close action
        via_close_action: bool,
    },
    /// A domain error (unauthenticated action, refused display).
    ReportError(String),
    /// Renderer event.
    EngineAction(EngineAction),
    /// Forget the user and queue, keep the workspace configuration.
    ResetState,
}

impl Action {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::SetPollingInterval(_) => "set_polling_interval",
            Self::SetUserIdentifier(_) => "set_user_identifier",
            Self::SetPageRoute(_) => "set_page_route",
            Self::ProcessMessageQueue(_) => "process_message_queue",
            Self::ClearMessageQueue => "clear_message_queue",
            Self::LoadMessage { .. } => "load_message",
            Self::EmbedMessage { .. } => "embed_message",
            Self::DisplayMessage(_) => "display_message",
            Self::DismissMessage { .. } => "dismiss_message",
            Self::ReportError(_) => "report_error",
            Self::EngineAction(_) => "engine_action",
            Self::ResetState => "reset_state",
        }
    }

    /// Actions allowed before a user is identified.
    pub fn allowed_anonymously(&self) -> bool {
        matches!(
            self,
            Self::Initialize { .. }
                | Self::SetUserIdentifier(_)
                | Self::SetPageRoute(_)
                | Self::ResetState
                | Self::ReportError(_)
        )
    }

    /// Dismissal that never logs a metric.
    pub fn silent_dismiss(message: Message) -> Self {
        Self::DismissMessage { message, should_log: false, via_close_action: false }
    }
}
