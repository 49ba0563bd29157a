//! Bounded retry policy with generation fencing.
//!
//! The helper decides *whether* and *when* to retry; the driver performs the
//! wait and reports back with [`RetryHelper::delay_elapsed`]. Decisions are
//! only ever produced for the generation that is active at the moment they
//! are produced, so a delay that outlives its connection attempt emits
//! nothing.
//!
//! ```text
//! failure #1 ──> RetryNow(1)              (immediate)
//! failure #2 ──> Wait(delay) ──> RetryNow(2)
//! failure #3 ──> Wait(delay) ──> RetryNow(3)
//! failure #4 ──> MaxRetriesReached
//! ```

use std::time::Duration;

use crate::{Generation, GenerationTagged};

/// Maximum retry attempts before giving up on the persistent connection.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Wait between retries after the first (immediate) one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed per failure streak.
    pub max_retries: u32,
    /// Delay before every retry except the first.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, retry_delay: DEFAULT_RETRY_DELAY }
    }
}

/// Outcome of a failed connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reconnect now. `attempt` counts from 1 within the failure streak.
    RetryNow {
        /// Attempt number
        attempt: u32,
    },
    /// The streak exhausted [`RetryPolicy::max_retries`].
    MaxRetriesReached,
    /// The failure cannot be fixed by retrying.
    RetryNotPossible,
}

/// Handle for a pending delayed retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryTicket {
    generation: Generation,
    id: u64,
}

impl RetryTicket {
    /// Generation the retry was scheduled under.
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// What the driver should do after reporting a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStep {
    /// Act on this decision now.
    Emit(GenerationTagged<RetryDecision>),
    /// Sleep for `delay`, then call [`RetryHelper::delay_elapsed`].
    Wait {
        /// How long to wait
        delay: Duration,
        /// Ticket to hand back
        ticket: RetryTicket,
    },
}

#[derive(Debug, Clone, Copy)]
struct PendingRetry {
    ticket: RetryTicket,
    attempt: u32,
}

/// Retry state machine.
///
/// Pure state machine - no timers, no I/O. The caller serializes access.
#[derive(Debug, Clone)]
pub struct RetryHelper {
    policy: RetryPolicy,
    active: Generation,
    retry_count: u32,
    pending: Option<PendingRetry>,
    next_ticket: u64,
}

impl Default for RetryHelper {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryHelper {
    /// Create a helper with no active generation.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            active: Generation::default(),
            retry_count: 0,
            pending: None,
            next_ticket: 0,
        }
    }

    /// Retry configuration.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generation decisions are currently produced for.
    pub fn active_generation(&self) -> Generation {
        self.active
    }

    /// Retries consumed in the current failure streak.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether a delayed retry is outstanding.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a new failure streak under `generation`.
    ///
    /// Cancels any outstanding delayed retry (its ticket will never emit) and
    /// zeroes the attempt counter.
    pub fn set_active_generation(&mut self, generation: Generation) {
        self.active = generation;
        self.retry_count = 0;
        self.pending = None;
    }

    /// Move to `generation` as part of the current failure streak.
    ///
    /// Used when a retry opens a new connection attempt: outstanding tickets
    /// are cancelled but the attempt counter carries over, so the streak stays
    /// bounded by [`RetryPolicy::max_retries`].
    pub fn adopt_generation(&mut self, generation: Generation) {
        self.active = generation;
        self.pending = None;
    }

    /// Clear retry state if `generation` is active.
    ///
    /// Called when a stream opens successfully or is stopped on purpose.
    pub fn reset(&mut self, generation: Generation) {
        if generation == self.active {
            self.retry_count = 0;
            self.pending = None;
        }
    }

    /// Report a failure of `generation`.
    ///
    /// Returns `None` if `generation` is stale or a delayed retry is already
    /// outstanding for it (duplicate failure reports count once).
    pub fn schedule(&mut self, generation: Generation, retryable: bool) -> Option<RetryStep> {
        if generation != self.active || self.pending.is_some() {
            return None;
        }

        let emit = |decision| Some(RetryStep::Emit(GenerationTagged::new(generation, decision)));

        if !retryable {
            return emit(RetryDecision::RetryNotPossible);
        }

        if self.retry_count >= self.policy.max_retries {
            return emit(RetryDecision::MaxRetriesReached);
        }

        self.retry_count += 1;
        let attempt = self.retry_count;

        if attempt == 1 {
            return emit(RetryDecision::RetryNow { attempt });
        }

        let ticket = RetryTicket { generation, id: self.next_ticket };
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.pending = Some(PendingRetry { ticket, attempt });

        Some(RetryStep::Wait { delay: self.policy.retry_delay, ticket })
    }

    /// A scheduled delay finished.
    ///
    /// Emits `RetryNow` only if `ticket` is the outstanding one and its
    /// generation is still active; superseded or cancelled tickets yield
    /// `None`.
    pub fn delay_elapsed(&mut self, ticket: RetryTicket) -> Option<GenerationTagged<RetryDecision>> {
        let pending = self.pending?;
        if pending.ticket != ticket || ticket.generation != self.active {
            return None;
        }

        self.pending = None;
        Some(GenerationTagged::new(
            ticket.generation,
            RetryDecision::RetryNow { attempt: pending.attempt },
        ))
    }
}
