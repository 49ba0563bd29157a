//! Queue filtering, ordering and selection.
//!
//! On `ProcessMessageQueue` the incoming list is trimmed to messages that can
//! still be shown:
//!
//! 1. drop messages without a queue id or whose queue id was already shown
//! 2. de-duplicate by queue id, first occurrence wins
//! 3. stable sort by priority, lowest first, unset priorities last
//!
//! The trimmed list continues to the reducer. If no modal is loading or on
//! screen, the first message eligible for the current route is then loaded
//! (modal) or embedded (inline).

use std::collections::HashSet;

use gist_proto::Message;
use tracing::debug;

use super::{Context, Middleware, Next};
use crate::{Action, InAppMessageState};

/// Trims the queue and picks the next message to show.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageQueueProcessor;

impl Middleware for MessageQueueProcessor {
    fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
        let Action::ProcessMessageQueue(messages) = action else {
            next.run(ctx, action);
            return;
        };

        let eligible = prioritize(ctx.state(), messages);
        let candidate = select(ctx.state(), &eligible).cloned();

        next.run(ctx, Action::ProcessMessageQueue(eligible));

        let Some(message) = candidate else {
            return;
        };

        debug!(message_id = message.id(), queue_id = message.queue_id(), "next message selected");
        match message.element_id() {
            Some(element_id) => {
                let element_id = element_id.to_string();
                ctx.dispatch(Action::EmbedMessage { message, element_id });
            },
            None => ctx.dispatch(Action::LoadMessage { message, position: None }),
        }
    }
}

/// Filter, de-duplicate and order `messages` against `state`.
pub fn prioritize(state: &InAppMessageState, messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut eligible: Vec<Message> = messages
        .into_iter()
        .filter(|m| match m.queue_id() {
            Some(queue_id) => !state.was_shown(queue_id) && seen.insert(queue_id.to_string()),
            None => false,
        })
        .collect();

    eligible.sort_by_key(|m| (m.priority().is_none(), m.priority()));
    eligible
}

/// First message in `eligible` that should be shown now.
///
/// Nothing is selected while a modal is loading or displayed. Inline
/// messages already waiting in or embedded in their container are skipped.
pub fn select<'m>(state: &InAppMessageState, eligible: &'m [Message]) -> Option<&'m Message> {
    if state.current_message_state.is_active() {
        return None;
    }

    let route = state.current_route.as_deref();
    eligible.iter().find(|m| {
        let already_embedded = m.element_id().and_then(|id| state.inline_state(id)).is_some_and(
            |inline| inline.is_active() && inline.message() == Some(*m),
        );
        m.matches_route(route) && !already_embedded
    })
}
