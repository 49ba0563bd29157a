//! Host lifecycle callbacks.

use std::sync::Arc;

use super::{Context, Middleware, Next};
use crate::{Action, EngineAction, InAppEventListener};

/// Forwards embed, display, dismiss and engine actions to the host listener.
/// Never alters or swallows the action.
pub struct EventCallback {
    listener: Arc<dyn InAppEventListener>,
}

impl EventCallback {
    /// Notify `listener`.
    pub fn new(listener: Arc<dyn InAppEventListener>) -> Self {
        Self { listener }
    }
}

impl Middleware for EventCallback {
    fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
        match &action {
            Action::EmbedMessage { message, element_id } => self.listener.embed_message(message, element_id),
            Action::DisplayMessage(message) => self.listener.message_shown(message),
            Action::DismissMessage { message, .. } => self.listener.message_dismissed(message),
            Action::EngineAction(EngineAction::Tap { message, route, action, name }) => {
                self.listener.message_action(message, route, action, name);
            },
            Action::EngineAction(
                EngineAction::MessageLoadingFailed(message) | EngineAction::Error(message),
            ) => self.listener.message_error(message),
            _ => {},
        }

        next.run(ctx, action);
    }
}
