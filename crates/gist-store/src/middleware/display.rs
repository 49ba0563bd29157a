//! Single-modal gate.

use std::sync::Arc;

use super::{Context, Middleware, Next};
use crate::{Action, MessageRenderer, ModalMessageState};

/// On `LoadMessage`: refuse while a modal is on screen, otherwise hand the
/// message to the renderer and continue.
pub struct ModalDisplayState {
    renderer: Arc<dyn MessageRenderer>,
}

impl ModalDisplayState {
    /// Gate rendering through `renderer`.
    pub fn new(renderer: Arc<dyn MessageRenderer>) -> Self {
        Self { renderer }
    }
}

impl Middleware for ModalDisplayState {
    fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
        let Action::LoadMessage { message, position } = &action else {
            next.run(ctx, action);
            return;
        };

        if let ModalMessageState::Displayed(current) = &ctx.state().current_message_state {
            let error = format!("cannot load {} while {} is displayed", message.id(), current.id());
            next.run(ctx, Action::ReportError(error));
            return;
        }

        self.renderer.show_modal(message, position.unwrap_or_else(|| message.position()));
        next.run(ctx, action);
    }
}
