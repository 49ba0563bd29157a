//! Connection lifecycle and generation tagging.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  start   ┌────────────┐  opened   ┌───────────┐
//! │ Disconnected │─────────>│ Connecting │──────────>│ Connected │
//! └──────────────┘          └────────────┘           └───────────┘
//!        ↑                        │ failure/close          │ stop
//!        │<───────────────────────┘<───────────────────────┤
//!        │                                                 ↓
//!        │                  stream stopped         ┌───────────────┐
//!        └─────────────────────────────────────────│ Disconnecting │
//!                                                  └───────────────┘
//! ```
//!
//! Every connection attempt gets a fresh [`Generation`]. Anything scheduled
//! asynchronously (reader events, retry delays, heartbeat expiry) carries the
//! generation it was created under and is discarded on arrival if that
//! generation is no longer active.

use std::fmt;

/// Monotonic tag identifying one connection attempt.
///
/// `Generation::default()` (zero) is never active: the first attempt is
/// generation 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Wrap a raw counter value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The next generation.
    ///
    /// Saturates at `u64::MAX`; a client would need 2^64 reconnects to get
    /// there.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A value paired with the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTagged<T> {
    /// Generation the value was produced under.
    pub generation: Generation,
    /// The value.
    pub value: T,
}

impl<T> GenerationTagged<T> {
    /// Tag `value` with `generation`.
    pub fn new(generation: Generation, value: T) -> Self {
        Self { generation, value }
    }

    /// Returns the value only if it belongs to `active`.
    pub fn for_generation(self, active: Generation) -> Option<T> {
        (self.generation == active).then_some(self.value)
    }

    /// Whether this value belongs to `active`.
    pub fn is_current(&self, active: Generation) -> bool {
        self.generation == active
    }
}

/// Persistent-connection lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No stream open.
    #[default]
    Disconnected,
    /// Stream requested, waiting for the transport to open.
    Connecting,
    /// Stream open and receiving events.
    Connected,
    /// Intentional shutdown in progress.
    Disconnecting,
}

impl ConnectionState {
    /// True while a stream is being opened or is open.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase() {
        let g0 = Generation::default();
        let g1 = g0.next();
        assert!(g1 > g0);
        assert_eq!(g1.get(), 1);
        assert_eq!(Generation::new(u64::MAX).next().get(), u64::MAX);
    }

    #[test]
    fn tagged_values_filter_by_generation() {
        let g1 = Generation::new(1);
        let g2 = Generation::new(2);
        assert_eq!(GenerationTagged::new(g1, "x").for_generation(g1), Some("x"));
        assert_eq!(GenerationTagged::new(g1, "x").for_generation(g2), None);
        assert!(!GenerationTagged::new(g1, ()).is_current(g2));
    }

    #[test]
    fn active_states() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Connected.is_active());
        assert!(!ConnectionState::Disconnected.is_active());
        assert!(!ConnectionState::Disconnecting.is_active());
    }
}
