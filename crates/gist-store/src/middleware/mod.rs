//! Middleware pipeline.
//!
//! Every dispatched action flows through a fixed chain of [`Middleware`]
//! before it reaches the reducer:
//!
//! ```text
//! dispatch ──> UserAuthentication ──> RouteMatching ──> ModalDisplayState
//!          ──> Metrics ──> MessageQueueProcessor ──> EventCallback
//!          ──> ErrorReporting ──> reduce
//! ```
//!
//! A middleware continues the chain with [`Next::run`], possibly with a
//! substituted action, or swallows the action by not calling it. Actions
//! injected with [`Context::dispatch`] are queued and processed after the
//! current action has gone all the way through the reducer.

mod auth;
mod callback;
mod display;
mod error_reporting;
mod metrics;
mod queue;
mod route;

use std::collections::VecDeque;

pub use auth::UserAuthentication;
pub use callback::EventCallback;
pub use display::ModalDisplayState;
pub use error_reporting::ErrorReporting;
pub use metrics::Metrics;
pub use queue::MessageQueueProcessor;
pub use route::RouteMatching;

use crate::{Action, Collaborators, InAppMessageState, reduce};

/// One stage of the pipeline.
pub trait Middleware: Send + Sync {
    /// Handle `action`. Call `next.run(ctx, action)` to continue the chain.
    fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>);
}

/// What a middleware can see and do while handling an action.
pub struct Context<'a> {
    state: &'a mut InAppMessageState,
    pending: &'a mut VecDeque<Action>,
}

impl<'a> Context<'a> {
    /// Wrap the working state and the injected-action queue.
    pub fn new(state: &'a mut InAppMessageState, pending: &'a mut VecDeque<Action>) -> Self {
        Self { state, pending }
    }

    /// State as of this point in the chain.
    ///
    /// After `next.run` returns this includes the reducer's result.
    pub fn state(&self) -> &InAppMessageState {
        self.state
    }

    /// Queue `action` to run after the current one.
    pub fn dispatch(&mut self, action: Action) {
        self.pending.push_back(action);
    }
}

/// The rest of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Box<dyn Middleware>],
}

impl Next<'_> {
    /// Pass `action` to the next stage, or to the reducer at the end.
    pub fn run(self, ctx: &mut Context<'_>, action: Action) {
        match self.chain.split_first() {
            Some((head, rest)) => head.process(ctx, action, Next { chain: rest }),
            None => *ctx.state = reduce(ctx.state, &action),
        }
    }
}

/// An ordered middleware chain ending in the reducer.
pub struct InAppPipeline {
    chain: Vec<Box<dyn Middleware>>,
}

impl InAppPipeline {
    /// Custom chain.
    pub fn new(chain: Vec<Box<dyn Middleware>>) -> Self {
        Self { chain }
    }

    /// The standard seven-stage chain.
    pub fn standard(collaborators: Collaborators) -> Self {
        let Collaborators { listener, metrics, renderer } = collaborators;
        Self::new(vec![
            Box::new(UserAuthentication),
            Box::new(RouteMatching),
            Box::new(ModalDisplayState::new(renderer)),
            Box::new(Metrics::new(metrics)),
            Box::new(MessageQueueProcessor),
            Box::new(EventCallback::new(listener)),
            Box::new(ErrorReporting),
        ])
    }

    /// Reducer only.
    pub fn bare() -> Self {
        Self::new(Vec::new())
    }

    /// Run `action` through the chain.
    pub fn run(&self, ctx: &mut Context<'_>, action: Action) {
        Next { chain: &self.chain }.run(ctx, action);
    }

    /// Number of middleware stages.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// True for a reducer-only pipeline.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl Default for InAppPipeline {
    fn default() -> Self {
        Self::standard(Collaborators::default())
    }
}

impl std::fmt::Debug for InAppPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InAppPipeline").field("stages", &self.chain.len()).finish()
    }
}
