//! Invariant checking over store transitions.
//!
//! Every dispatch is captured as a [`Transition`] (state before, the action,
//! state after) and run through the registered [`Invariant`]s. Invariants
//! state what must hold after any action sequence, not what one scenario
//! should produce.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let transition = Transition::dispatch(&store, action).await;
//! registry.assert_all(&transition, "after route change");
//! ```

mod checks;

use std::{fmt, sync::Arc};

use gist_store::{Action, InAppMessageState, Store, StoreError};

pub use checks::{EmbeddedKeyedByElement, ModalNeverInline, QueueExcludesShown, ShownIdsPersist};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// One dispatch as seen from outside the store.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Snapshot before the dispatch.
    pub before: Arc<InAppMessageState>,
    /// The dispatched action.
    pub action: Action,
    /// Snapshot after the dispatch.
    pub after: Arc<InAppMessageState>,
    /// What `dispatch` returned.
    pub outcome: Result<(), StoreError>,
}

impl Transition {
    /// Dispatch `action` into `store` and capture the transition.
    ///
    /// Assumes nothing else dispatches concurrently.
    pub async fn dispatch(store: &Store, action: Action) -> Self {
        let before = store.state();
        let outcome = store.dispatch(action.clone()).await;
        Self { before, action, after: store.state(), outcome }
    }
}

/// A property every transition must satisfy.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against `transition`.
    fn check(&self, transition: &Transition) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with the standard store invariants:
    ///
    /// - [`QueueExcludesShown`]
    /// - [`ShownIdsPersist`]
    /// - [`ModalNeverInline`]
    /// - [`EmbeddedKeyedByElement`]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(QueueExcludesShown);
        registry.add(ShownIdsPersist);
        registry.add(ModalNeverInline);
        registry.add(EmbeddedKeyedByElement);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Whether no invariants are registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// Check all invariants, collecting every violation.
    pub fn check_all(&self, transition: &Transition) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(transition).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    ///
    /// # Panics
    ///
    /// If any invariant fails.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, transition: &Transition, context: &str) {
        if let Err(violations) = self.check_all(transition) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!(
                "Invariant violation {context} (action {}):\n  {}",
                transition.action.name(),
                messages.join("\n  ")
            );
        }
    }
}
