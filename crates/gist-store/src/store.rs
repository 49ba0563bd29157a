//! Serialized state container.
//!
//! # Architecture
//!
//! ```text
//! dispatch(a) ──> gate (FIFO async mutex)
//!                  │
//!                  ├─ pending = [a]
//!                  ├─ while let Some(x) = pending.pop_front()
//!                  │      pipeline.run(x)      // may push to pending
//!                  ├─ publish snapshot
//!                  └─ notify subscribers
//! ```
//!
//! # Invariants
//!
//! - At most one dispatch runs middleware or the reducer at a time; waiting
//!   dispatches are admitted in arrival order.
//! - Readers only ever see whole published snapshots.
//! - A panicking action leaves the published state at the value before that
//!   action and releases the gate.

use std::{
    any::Any,
    collections::VecDeque,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError, RwLock, Weak},
};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::{
    Action, InAppMessageState, StoreError,
    middleware::{Context, InAppPipeline},
};

/// Upper bound on actions processed by one `dispatch`, injected ones included.
pub const MAX_CASCADE: usize = 256;

/// Receives state changes.
pub trait StoreSubscriber: Send + Sync {
    /// Called after a dispatch that the subscription's comparator reports as
    /// a change.
    fn state_changed(&self, state: &InAppMessageState);
}

impl<F> StoreSubscriber for F
where
    F: Fn(&InAppMessageState) + Send + Sync,
{
    fn state_changed(&self, state: &InAppMessageState) {
        self(state);
    }
}

/// Decides whether a subscriber cares about a change: `(old, new) -> bool`.
pub type Comparator = Arc<dyn Fn(&InAppMessageState, &InAppMessageState) -> bool + Send + Sync>;

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    subscriber: Weak<dyn StoreSubscriber>,
    comparator: Comparator,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<Subscription>,
}

/// The in-app message store.
///
/// Share it as `Arc<Store>`; every method takes `&self`.
pub struct Store {
    pipeline: InAppPipeline,
    gate: AsyncMutex<()>,
    snapshot: RwLock<Arc<InAppMessageState>>,
    subscribers: Mutex<Subscribers>,
}

impl Store {
    /// Store with default state.
    pub fn new(pipeline: InAppPipeline) -> Self {
        Self::with_state(pipeline, InAppMessageState::default())
    }

    /// Store starting from `state`.
    pub fn with_state(pipeline: InAppPipeline, state: InAppMessageState) -> Self {
        Self {
            pipeline,
            gate: AsyncMutex::new(()),
            snapshot: RwLock::new(Arc::new(state)),
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    /// Current snapshot. Never waits for an in-flight dispatch.
    pub fn state(&self) -> Arc<InAppMessageState> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply `action` and everything middleware injects while handling it.
    ///
    /// Returns once the reducer has run for every queued action and
    /// subscribers have been notified.
    ///
    /// # Errors
    ///
    /// - `StoreError::ActionPanicked` if a middleware or the reducer panicked
    /// - `StoreError::CascadeOverflow` if more than [`MAX_CASCADE`] actions
    ///   were queued
    pub async fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        let _gate = self.gate.lock().await;

        let before = self.state();
        let (after, outcome) = self.apply((*before).clone(), action);
        let after = Arc::new(after);

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&after);
        self.notify(&before, &after);

        outcome
    }

    fn apply(&self, mut state: InAppMessageState, action: Action) -> (InAppMessageState, Result<(), StoreError>) {
        let mut pending = VecDeque::from([action]);
        let mut processed = 0usize;

        while let Some(action) = pending.pop_front() {
            if processed == MAX_CASCADE {
                warn!(limit = MAX_CASCADE, dropped = pending.len() + 1, "dispatch cascade overflow");
                return (state, Err(StoreError::CascadeOverflow { limit: MAX_CASCADE }));
            }
            processed += 1;

            let name = action.name();
            debug!(action = name, "reducing");

            let last_good = state.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut ctx = Context::new(&mut state, &mut pending);
                self.pipeline.run(&mut ctx, action);
            }));

            if let Err(payload) = outcome {
                let reason = panic_reason(payload.as_ref());
                warn!(action = name, %reason, "action panicked, state rolled back");
                return (last_good, Err(StoreError::ActionPanicked { action: name, reason }));
            }
        }

        (state, Ok(()))
    }

    /// Subscribe with the default comparator (any change).
    ///
    /// The store keeps only a weak reference; the subscription ends when the
    /// caller drops its last `Arc` to `subscriber`.
    pub fn subscribe(&self, subscriber: &Arc<dyn StoreSubscriber>) -> SubscriptionId {
        self.subscribe_with(subscriber, Arc::new(|old: &InAppMessageState, new: &InAppMessageState| old != new))
    }

    /// Subscribe, notified only when `comparator(old, new)` is true.
    pub fn subscribe_with(&self, subscriber: &Arc<dyn StoreSubscriber>, comparator: Comparator) -> SubscriptionId {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.entries.push(Subscription { id, subscriber: Arc::downgrade(subscriber), comparator });
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    ///
    /// Safe to call from inside [`StoreSubscriber::state_changed`].
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.entries.retain(|s| s.id != id);
    }

    /// Number of live subscriptions. Subscribers that were dropped are not
    /// counted.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.entries.retain(|s| s.subscriber.strong_count() > 0);
        subscribers.entries.len()
    }

    fn notify(&self, before: &InAppMessageState, after: &InAppMessageState) {
        let entries = {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            subscribers.entries.retain(|s| s.subscriber.strong_count() > 0);
            subscribers.entries.clone()
        };

        for subscription in entries {
            if !(subscription.comparator)(before, after) {
                continue;
            }
            let Some(subscriber) = subscription.subscriber.upgrade() else {
                continue;
            };
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| subscriber.state_changed(after)));
            if delivered.is_err() {
                warn!(subscription = subscription.id.0, "subscriber panicked");
            }
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("pipeline", &self.pipeline)
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gist_proto::Message;

    use super::*;
    use crate::middleware::{Middleware, Next};

    struct PanicOn(&'static str);

    impl Middleware for PanicOn {
        fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
            if let Action::SetUserIdentifier(id) = &action
                && id == self.0
            {
                panic!("refusing {id}");
            }
            next.run(ctx, action);
        }
    }

    struct Echo;

    impl Middleware for Echo {
        fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
            let route = match &action {
                Action::SetPageRoute(route) => Some(route.clone()),
                _ => None,
            };
            next.run(ctx, action);
            if let Some(route) = route {
                ctx.dispatch(Action::SetUserIdentifier(format!("visitor@{route}")));
            }
        }
    }

    struct Loop;

    impl Middleware for Loop {
        fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
            ctx.dispatch(Action::ClearMessageQueue);
            next.run(ctx, action);
        }
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<dyn StoreSubscriber>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let subscriber: Arc<dyn StoreSubscriber> = Arc::new(move |_: &InAppMessageState| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, subscriber)
    }

    #[tokio::test]
    async fn dispatch_publishes_new_snapshot() {
        let store = Store::new(InAppPipeline::bare());
        let old = store.state();

        store.dispatch(Action::SetUserIdentifier("u1".into())).await.unwrap();

        assert_eq!(old.user_id, None);
        assert_eq!(store.state().user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn injected_actions_run_after_current() {
        let store = Store::new(InAppPipeline::new(vec![Box::new(Echo)]));
        store.dispatch(Action::SetPageRoute("home".into())).await.unwrap();

        let state = store.state();
        assert_eq!(state.current_route.as_deref(), Some("home"));
        assert_eq!(state.user_id.as_deref(), Some("visitor@home"));
    }

    #[tokio::test]
    async fn panic_rolls_back_and_releases_gate() {
        let store = Store::new(InAppPipeline::new(vec![Box::new(PanicOn("bad"))]));
        store.dispatch(Action::SetUserIdentifier("good".into())).await.unwrap();

        let err = store.dispatch(Action::SetUserIdentifier("bad".into())).await.unwrap_err();
        assert!(matches!(err, StoreError::ActionPanicked { action: "set_user_identifier", .. }));
        assert_eq!(store.state().user_id.as_deref(), Some("good"));

        store.dispatch(Action::SetPageRoute("next".into())).await.unwrap();
        assert_eq!(store.state().current_route.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn runaway_cascade_is_cut_off() {
        let store = Store::new(InAppPipeline::new(vec![Box::new(Loop)]));
        let err = store.dispatch(Action::ClearMessageQueue).await.unwrap_err();
        assert_eq!(err, StoreError::CascadeOverflow { limit: MAX_CASCADE });
    }

    #[tokio::test]
    async fn subscribers_notified_once_per_changing_dispatch() {
        let store = Store::new(InAppPipeline::new(vec![Box::new(Echo)]));
        let (count, subscriber) = counter();
        store.subscribe(&subscriber);

        // Two reductions, one notification.
        store.dispatch(Action::SetPageRoute("home".into())).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // No change, no notification.
        store.dispatch(Action::ReportError("noop".into())).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn comparator_filters_notifications() {
        let store = Store::new(InAppPipeline::bare());
        let (count, subscriber) = counter();
        store.subscribe_with(&subscriber, Arc::new(|old: &InAppMessageState, new: &InAppMessageState| {
            old.messages_in_queue != new.messages_in_queue
        }));

        store.dispatch(Action::SetUserIdentifier("u1".into())).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let m = Message::new("m1").with_queue_id("q1");
        store.dispatch(Action::ProcessMessageQueue(vec![m])).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_from_callback() {
        let store = Arc::new(Store::new(InAppPipeline::bare()));
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let subscriber: Arc<dyn StoreSubscriber> = {
            let store = Arc::downgrade(&store);
            let count = Arc::clone(&count);
            let slot = Arc::clone(&slot);
            Arc::new(move |_: &InAppMessageState| {
                count.fetch_add(1, Ordering::SeqCst);
                if let (Some(store), Some(id)) = (store.upgrade(), *slot.lock().unwrap()) {
                    store.unsubscribe(id);
                }
            })
        };
        *slot.lock().unwrap() = Some(store.subscribe(&subscriber));

        store.dispatch(Action::SetUserIdentifier("u1".into())).await.unwrap();
        store.dispatch(Action::SetUserIdentifier("u2".into())).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_forgotten() {
        let store = Store::new(InAppPipeline::bare());
        let (count, subscriber) = counter();
        store.subscribe(&subscriber);
        assert_eq!(store.subscriber_count(), 1);

        drop(subscriber);
        store.dispatch(Action::SetUserIdentifier("u1".into())).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscriber_owning_the_store_does_not_leak_it() {
        let store = Arc::new(Store::new(InAppPipeline::bare()));
        let subscriber: Arc<dyn StoreSubscriber> = {
            let owned = Arc::clone(&store);
            Arc::new(move |_: &InAppMessageState| {
                let _ = owned.state();
            })
        };
        store.subscribe(&subscriber);
        store.dispatch(Action::SetUserIdentifier("u1".into())).await.unwrap();
        assert_eq!(Arc::strong_count(&store), 2);

        drop(subscriber);
        assert_eq!(Arc::strong_count(&store), 1);
    }

    #[derive(Default)]
    struct Exclusive {
        busy: std::sync::atomic::AtomicBool,
        overlaps: AtomicUsize,
    }

    impl Middleware for Arc<Exclusive> {
        fn process(&self, ctx: &mut Context<'_>, action: Action, next: Next<'_>) {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
            next.run(ctx, action);
            self.busy.store(false, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatches_do_not_interleave() {
        let probe = Arc::new(Exclusive::default());
        let store = Arc::new(Store::new(InAppPipeline::new(vec![Box::new(Arc::clone(&probe))])));

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.dispatch(Action::SetPageRoute(format!("r{i}"))).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(probe.overlaps.load(Ordering::SeqCst), 0);
        assert!(store.state().current_route.is_some());
    }
}
