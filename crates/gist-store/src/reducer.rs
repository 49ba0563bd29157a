//! Pure state transitions.
//!
//! [`reduce`] is total over [`Action`], performs no I/O and never logs.
//! Transitions that the modal lifecycle forbids leave the state unchanged.

use gist_proto::Message;

use crate::{
    Action, EngineAction, InAppMessageState, InlineMessageState, ModalMessageState,
};

/// Apply `action` to `state`, returning the next state.
pub fn reduce(state: &InAppMessageState, action: &Action) -> InAppMessageState {
    let mut next = state.clone();

    match action {
        Action::Initialize { site_id, data_center, environment } => {
            return InAppMessageState {
                site_id: site_id.clone(),
                data_center: data_center.clone(),
                environment: *environment,
                ..InAppMessageState::default()
            };
        },
        Action::ResetState => {
            return InAppMessageState {
                site_id: state.site_id.clone(),
                data_center: state.data_center.clone(),
                environment: state.environment,
                poll_interval: state.poll_interval,
                ..InAppMessageState::default()
            };
        },
        Action::SetPollingInterval(interval) => next.poll_interval = *interval,
        Action::SetUserIdentifier(user_id) => next.user_id = Some(user_id.clone()),
        Action::SetPageRoute(route) => next.current_route = Some(route.clone()),
        Action::ProcessMessageQueue(messages) => {
            next.messages_in_queue = messages
                .iter()
                .filter(|m| m.queue_id().is_some_and(|q| !state.was_shown(q)))
                .cloned()
                .collect();
        },
        Action::ClearMessageQueue => next.messages_in_queue.clear(),
        Action::LoadMessage { message, .. } => {
            if !matches!(state.current_message_state, ModalMessageState::Displayed(_)) {
                next.current_message_state = ModalMessageState::Loading(message.clone());
            }
        },
        Action::EmbedMessage { message, element_id } => {
            next.embedded_messages_state.insert(
                element_id.clone(),
                InlineMessageState::ReadyToEmbed {
                    message: message.clone(),
                    element_id: element_id.clone(),
                },
            );
        },
        Action::DisplayMessage(message) => display(&mut next, message),
        Action::DismissMessage { message, .. } => dismiss(&mut next, message),
        Action::EngineAction(EngineAction::MessageLoadingFailed(message)) => {
            if next.current_message_state.active_message() == Some(message) {
                next.current_message_state = ModalMessageState::Dismissed(message.clone());
            }
        },
        Action::EngineAction(EngineAction::Tap { .. } | EngineAction::Error(_))
        | Action::ReportError(_) => {},
    }

    next
}

fn display(state: &mut InAppMessageState, message: &Message) {
    if let Some(element_id) = message.element_id() {
        state.embedded_messages_state.insert(
            element_id.to_string(),
            InlineMessageState::Embedded {
                message: message.clone(),
                element_id: element_id.to_string(),
            },
        );
    } else if matches!(&state.current_message_state, ModalMessageState::Loading(loading) if loading == message) {
        state.current_message_state = ModalMessageState::Displayed(message.clone());
    } else {
        return;
    }

    mark_shown(state, message);
}

fn dismiss(state: &mut InAppMessageState, message: &Message) {
    if let Some(element_id) = message.element_id() {
        state
            .embedded_messages_state
            .insert(element_id.to_string(), InlineMessageState::Dismissed(message.clone()));
    } else if state.current_message_state.active_message() == Some(message) {
        state.current_message_state = ModalMessageState::Dismissed(message.clone());
    }
}

fn mark_shown(state: &mut InAppMessageState, message: &Message) {
    let Some(queue_id) = message.queue_id() else {
        return;
    };
    state.shown_message_queue_ids.insert(queue_id.to_string());
    state.messages_in_queue.retain(|queued| queued.queue_id() != Some(queue_id));
}
