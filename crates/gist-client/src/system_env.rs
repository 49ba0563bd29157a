//! Production environment: system clock, tokio timers, OS randomness.

use std::time::Duration;

use gist_core::Environment;

/// [`Environment`] backed by the system.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails. Session ids cannot be generated
/// without it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG is available");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_hex_and_distinct() {
        let env = SystemEnv::new();
        let a = env.session_id();
        let b = env.session_id();

        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_uses_tokio_clock() {
        let env = SystemEnv::new();
        let before = tokio::time::Instant::now();
        env.sleep(Duration::from_secs(30)).await;
        assert!(tokio::time::Instant::now() - before >= Duration::from_secs(30));
    }
}
