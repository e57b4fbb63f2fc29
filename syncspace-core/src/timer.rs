//! Cancellable trailing-edge scheduling.
//!
//! A [`Debounce`] holds at most one pending value with a deadline. Every
//! `schedule` supersedes the previous one and pushes the deadline out by
//! the full window, so the value fires only after a quiet period measured
//! from the last trigger.
//!
//! Deadlines use [`tokio::time::Instant`], so tests can drive them with a
//! paused clock.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Trailing-edge debounce carrying the latest scheduled value.
#[derive(Debug)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `value` to fire one window from now.
    ///
    /// Returns `true` if a pending value was superseded.
    pub fn schedule(&mut self, value: T) -> bool {
        let superseded = self.pending.is_some();
        self.pending = Some((Instant::now() + self.window, value));
        superseded
    }

    /// Cancel the pending value, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, value)| value)
    }

    /// Take the value if its deadline has passed at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.cancel(),
            _ => None,
        }
    }

    /// Wait for the pending value to fire.
    ///
    /// Never resolves while nothing is pending. Cancel-safe: dropping the
    /// future before it resolves leaves the pending value in place, which
    /// makes it usable as a `tokio::select!` branch.
    pub async fn fired(&mut self) -> T {
        let Some(deadline) = self.deadline() else {
            return std::future::pending().await;
        };
        sleep_until(deadline).await;
        match self.cancel() {
            Some(value) => value,
            None => std::future::pending().await,
        }
    }
}
