//! Standard store invariants.

use gist_store::{Action, InlineMessageState};

use super::{Invariant, InvariantResult, Transition, Violation};

/// The queue never holds a message that was already shown, or one without
/// a queue id.
pub struct QueueExcludesShown;

impl Invariant for QueueExcludesShown {
    fn name(&self) -> &'static str {
        "queue_excludes_shown"
    }

    fn check(&self, transition: &Transition) -> InvariantResult {
        let state = &transition.after;
        for message in &state.messages_in_queue {
            match message.queue_id() {
                None => {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("message {} queued without a queue id", message.id()),
                    });
                },
                Some(queue_id) if state.was_shown(queue_id) => {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("message {} queued again after being shown", message.id()),
                    });
                },
                Some(_) => {},
            }
        }
        Ok(())
    }
}

/// Shown queue ids are only forgotten by `Initialize` and `ResetState`.
pub struct ShownIdsPersist;

impl Invariant for ShownIdsPersist {
    fn name(&self) -> &'static str {
        "shown_ids_persist"
    }

    fn check(&self, transition: &Transition) -> InvariantResult {
        if matches!(transition.action, Action::Initialize { .. } | Action::ResetState) {
            return Ok(());
        }

        let lost: Vec<_> = transition
            .before
            .shown_message_queue_ids
            .difference(&transition.after.shown_message_queue_ids)
            .collect();
        if lost.is_empty() {
            Ok(())
        } else {
            Err(Violation { invariant: self.name(), message: format!("forgot shown queue ids {lost:?}") })
        }
    }
}

/// The modal slot never holds an inline message.
pub struct ModalNeverInline;

impl Invariant for ModalNeverInline {
    fn name(&self) -> &'static str {
        "modal_never_inline"
    }

    fn check(&self, transition: &Transition) -> InvariantResult {
        match transition.after.current_message_state.message() {
            Some(message) if message.is_inline() => Err(Violation {
                invariant: self.name(),
                message: format!("inline message {} in the modal slot", message.id()),
            }),
            _ => Ok(()),
        }
    }
}

/// Every inline entry is stored under its own element id.
pub struct EmbeddedKeyedByElement;

impl Invariant for EmbeddedKeyedByElement {
    fn name(&self) -> &'static str {
        "embedded_keyed_by_element"
    }

    fn check(&self, transition: &Transition) -> InvariantResult {
        for (key, entry) in &transition.after.embedded_messages_state {
            let element = match entry {
                InlineMessageState::Initial => continue,
                InlineMessageState::ReadyToEmbed { element_id, .. }
                | InlineMessageState::Embedded { element_id, .. } => Some(element_id.as_str()),
                InlineMessageState::Dismissed(message) => message.element_id(),
            };
            if element != Some(key.as_str()) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("entry for {element:?} stored under {key}"),
                });
            }
        }
        Ok(())
    }
}
