//! Blocks actions until a user is identified.

use tracing::debug;

use super::{Context, Middleware, Next};
use crate::Action;

/// Converts actions into `ReportError` while no user is identified.
///
/// Runs first, so no later stage ever sees an unauthenticated action.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserAuthentication;

impl Middleware for UserAuthentication {
    fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
        if action.allowed_anonymously() || ctx.state().is_identified() {
            next.run(ctx, action);
            return;
        }

        debug!(action = action.name(), "blocked: no user identified");
        next.run(ctx, Action::ReportError(format!("{} requires an identified user", action.name())));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use gist_proto::Message;

    use super::*;
    use crate::{
        GistEnvironment, InAppMessageState, ModalMessageState,
        middleware::{InAppPipeline, test_support::run_once},
    };

    /// Records what reaches the stage after the gate.
    #[derive(Default)]
    struct Seen(Arc<Mutex<Vec<Action>>>);

    impl Middleware for Seen {
        fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
            self.0.lock().unwrap().push(action.clone());
            next.run(ctx, action);
        }
    }

    fn gate() -> (InAppPipeline, Arc<Mutex<Vec<Action>>>) {
        let seen = Seen::default();
        let log = Arc::clone(&seen.0);
        (InAppPipeline::new(vec![Box::new(UserAuthentication), Box::new(seen)]), log)
    }

    #[test]
    fn anonymous_load_becomes_error() {
        let (pipeline, seen) = gate();
        let m = Message::new("m1").with_queue_id("q1");
        let (state, injected) =
            run_once(&pipeline, InAppMessageState::default(), Action::LoadMessage { message: m, position: None });

        assert_eq!(state.current_message_state, ModalMessageState::Initial);
        assert!(injected.is_empty());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(&seen[0], Action::ReportError(reason) if reason.contains("load_message")));
    }

    #[test]
    fn anonymous_actions_pass_unchanged() {
        let allowed = vec![
            Action::Initialize {
                site_id: "site".into(),
                data_center: "us".into(),
                environment: GistEnvironment::Production,
            },
            Action::SetUserIdentifier("u1".into()),
            Action::SetPageRoute("home".into()),
            Action::ResetState,
            Action::ReportError("boom".into()),
        ];

        for action in allowed {
            let (pipeline, seen) = gate();
            run_once(&pipeline, InAppMessageState::default(), action.clone());
            assert_eq!(*seen.lock().unwrap(), vec![action]);
        }
    }

    #[test]
    fn anonymous_route_is_allowed() {
        let (pipeline, _) = gate();
        let (state, _) = run_once(&pipeline, InAppMessageState::default(), Action::SetPageRoute("home".into()));
        assert_eq!(state.current_route.as_deref(), Some("home"));
    }

    #[test]
    fn identified_user_passes() {
        let (pipeline, seen) = gate();
        let state = InAppMessageState { user_id: Some("u1".into()), ..Default::default() };
        let m = Message::new("m1").with_queue_id("q1");
        let (state, _) = run_once(&pipeline, state, Action::ProcessMessageQueue(vec![m.clone()]));
        assert!(state.messages_in_queue.contains(&m));
        assert_eq!(*seen.lock().unwrap(), vec![Action::ProcessMessageQueue(vec![m])]);
    }
}
