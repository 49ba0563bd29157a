//! View metrics.

use std::sync::Arc;

use gist_proto::Message;
use tracing::warn;

use super::{Context, Middleware, Next};
use crate::{Action, MetricsLogger};

/// Logs a view when a message shows, or for persistent messages when the
/// user closes them.
pub struct Metrics {
    logger: Arc<dyn MetricsLogger>,
}

impl Metrics {
    /// Report views through `logger`.
    pub fn new(logger: Arc<dyn MetricsLogger>) -> Self {
        Self { logger }
    }

    fn log(&self, ctx: &Context<'_>, message: &Message) {
        let Some(user_token) = ctx.state().user_id.as_deref() else {
            return;
        };
        if let Err(error) = self.logger.log_view(message, user_token) {
            warn!(message_id = message.id(), %error, "failed to log view");
        }
    }
}

impl Middleware for Metrics {
    fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
        match &action {
            Action::DisplayMessage(message) if !message.is_persistent() => self.log(ctx, message),
            Action::DismissMessage { message, should_log: true, via_close_action: true }
                if message.is_persistent() =>
            {
                self.log(ctx, message);
            },
            _ => {},
        }

        next.run(ctx, action);
    }
}
