//! Environment abstraction for deterministic testing.
//!
//! Decouples connection logic from system resources (time, randomness).
//! Production uses tokio timers and the OS RNG; the harness uses tokio's
//! paused clock and a seeded RNG so retry and heartbeat timing can be tested
//! without wall-clock waits.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `sleep()` completes no earlier than `duration` after it was called, as
///   measured by `now()`
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; the Sans-IO state machines never do.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a random session id: 32 lowercase hex characters.
    fn session_id(&self) -> String {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
