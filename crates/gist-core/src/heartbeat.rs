//! Heartbeat silence detection.
//!
//! At most one heartbeat window is in flight. Starting a new window
//! supersedes the previous one; the driver still holds the old ticket but
//! [`HeartbeatTimer::expire`] refuses it.

use std::time::Duration;

use crate::Generation;

/// Heartbeat window used until the server announces its own.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack added to every window to absorb network jitter.
pub const HEARTBEAT_BUFFER: Duration = Duration::from_secs(5);

/// One armed heartbeat window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeartbeatTicket {
    generation: Generation,
    id: u64,
    wait: Duration,
}

impl HeartbeatTicket {
    /// Generation the window belongs to.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Total wait, including [`HEARTBEAT_BUFFER`].
    pub fn wait(&self) -> Duration {
        self.wait
    }
}

/// Single in-flight heartbeat timer.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatTimer {
    active: Option<HeartbeatTicket>,
    next_id: u64,
}

impl HeartbeatTimer {
    /// Create an idle timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a window of `timeout + HEARTBEAT_BUFFER` for `generation`.
    ///
    /// Replaces any window already in flight.
    pub fn start(&mut self, generation: Generation, timeout: Duration) -> HeartbeatTicket {
        let ticket = HeartbeatTicket {
            generation,
            id: self.next_id,
            wait: timeout.saturating_add(HEARTBEAT_BUFFER),
        };
        self.next_id = self.next_id.wrapping_add(1);
        self.active = Some(ticket);
        ticket
    }

    /// Disarm without firing.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Whether a window is in flight.
    pub fn is_armed(&self) -> bool {
        self.active.is_some()
    }

    /// Ticket of the window in flight, if any.
    pub fn active(&self) -> Option<HeartbeatTicket> {
        self.active
    }

    /// A window's wait finished.
    ///
    /// Returns true exactly once, and only for the ticket still in flight.
    pub fn expire(&mut self, ticket: HeartbeatTicket) -> bool {
        if self.active == Some(ticket) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn window_includes_buffer() {
        let mut timer = HeartbeatTimer::new();
        let ticket = timer.start(Generation::new(1), DEFAULT_HEARTBEAT_TIMEOUT);
        assert_eq!(ticket.wait(), Duration::from_secs(35));
        assert!(timer.is_armed());
    }

    #[test]
    fn expires_once() {
        let mut timer = HeartbeatTimer::new();
        let ticket = timer.start(Generation::new(1), Duration::from_secs(10));
        assert!(timer.expire(ticket));
        assert!(!timer.expire(ticket));
        assert!(!timer.is_armed());
    }

    #[test]
    fn restart_supersedes_previous_window() {
        let mut timer = HeartbeatTimer::new();
        let first = timer.start(Generation::new(1), Duration::from_secs(10));
        let second = timer.start(Generation::new(1), Duration::from_secs(10));

        assert!(!timer.expire(first));
        assert!(timer.expire(second));
    }

    #[test]
    fn reset_disarms() {
        let mut timer = HeartbeatTimer::new();
        let ticket = timer.start(Generation::new(3), Duration::from_secs(1));
        timer.reset();
        assert!(!timer.expire(ticket));
    }

    proptest! {
        #[test]
        fn prop_only_latest_window_fires(starts in 1usize..16, pick in any::<prop::sample::Index>()) {
            let mut timer = HeartbeatTimer::new();
            let tickets: Vec<_> = (0..starts)
                .map(|i| timer.start(Generation::new(i as u64 + 1), Duration::from_secs(1)))
                .collect();

            let chosen = pick.index(tickets.len());
            let fired = timer.expire(tickets[chosen]);
            prop_assert_eq!(fired, chosen == tickets.len() - 1);
        }
    }
}
