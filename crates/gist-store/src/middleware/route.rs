//! Keeps the modal in sync with the host app's route.

use tracing::debug;

use super::{Context, Middleware, Next};
use crate::Action;

/// On `SetPageRoute`: dismiss a modal whose page rule no longer matches, then
/// re-run queue processing so a message eligible for the new route can show.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteMatching;

impl Middleware for RouteMatching {
    fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
        let Action::SetPageRoute(route) = &action else {
            next.run(ctx, action);
            return;
        };
        let route = route.clone();

        next.run(ctx, action);

        let stale = ctx
            .state()
            .current_message_state
            .active_message()
            .filter(|m| m.page_rule().is_some() && !m.matches_route(Some(&route)))
            .cloned();

        if let Some(message) = stale {
            debug!(message_id = message.id(), route = %route, "route no longer matches, dismissing");
            ctx.dispatch(Action::silent_dismiss(message));
        }

        let queue = ctx.state().queued_messages();
        ctx.dispatch(Action::ProcessMessageQueue(queue));
    }
}
