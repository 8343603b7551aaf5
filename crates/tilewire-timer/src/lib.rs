//! Cancelable deadlines for tilewire's single-task event loop.
//!
//! The client driver multiplexes everything in one `tokio::select!` loop:
//! incoming frames, user commands, and several timers (keep-alive,
//! reconnect delay, flush retry, shout clear). Each timer is a
//! [`Deadline`] that is either armed for some instant or disarmed.
//!
//! # Disarmed means "never"
//!
//! When a deadline is disarmed, [`Deadline::wait`] pends forever. It will
//! never resolve on its own, but `tokio::select!` still processes the
//! other branches, so the loop can list every timer unconditionally:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         frame = conn.recv() => { /* handle frame */ }
//!         _ = keep_alive.wait() => {
//!             keep_alive.cancel();
//!             send_keep_alive();
//!         }
//!     }
//! }
//! ```
//!
//! A fired deadline stays armed (and keeps resolving immediately) until
//! the handler cancels or re-arms it.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// A one-shot, cancelable, re-armable timer.
#[derive(Debug, Clone)]
pub struct Deadline {
    name: &'static str,
    at: Option<Instant>,
}

impl Deadline {
    /// Creates a disarmed deadline. `name` only shows up in traces.
    pub fn new(name: &'static str) -> Self {
        Self { name, at: None }
    }

    /// Arms the deadline to fire `after` from now, replacing any
    /// previous deadline.
    pub fn arm(&mut self, after: Duration) {
        self.arm_at(Instant::now() + after);
    }

    /// Arms the deadline for an absolute instant.
    pub fn arm_at(&mut self, at: Instant) {
        trace!(timer = self.name, "armed");
        self.at = Some(at);
    }

    /// Arms the deadline only if it isn't already armed.
    ///
    /// Returns `true` if it was armed by this call.
    pub fn arm_if_idle(&mut self, after: Duration) -> bool {
        if self.at.is_some() {
            return false;
        }
        self.arm(after);
        true
    }

    /// Disarms the deadline. Idempotent.
    pub fn cancel(&mut self) {
        if self.at.take().is_some() {
            trace!(timer = self.name, "canceled");
        }
    }

    /// Whether the deadline is armed.
    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Time left until the deadline fires, or `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Waits until the deadline is reached.
    ///
    /// Pends forever when disarmed.
    pub async fn wait(&self) {
        match self.at {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Doubling retry delay with a ceiling.
///
/// Setting `initial == max` gives a fixed delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the delay to wait now and doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Starts over from the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// The delay [`next_delay`](Self::next_delay) would return.
    pub fn peek(&self) -> Duration {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(b.next_delay(), Duration::from_secs(1));
        assert_eq!(b.next_delay(), Duration::from_secs(2));
        assert_eq!(b.next_delay(), Duration::from_secs(4));
        assert_eq!(b.next_delay(), Duration::from_secs(5));
        assert_eq!(b.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_reset() {
        let mut b = Backoff::new(Duration::from_secs(2), Duration::from_secs(60));
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.peek(), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_fixed_when_initial_equals_max() {
        let mut b = Backoff::new(Duration::from_secs(3), Duration::from_secs(3));
        for _ in 0..5 {
            assert_eq!(b.next_delay(), Duration::from_secs(3));
        }
    }

    #[test]
    fn test_backoff_max_below_initial_is_raised() {
        let mut b = Backoff::new(Duration::from_secs(10), Duration::from_secs(1));
        assert_eq!(b.next_delay(), Duration::from_secs(10));
        assert_eq!(b.next_delay(), Duration::from_secs(10));
    }
}
