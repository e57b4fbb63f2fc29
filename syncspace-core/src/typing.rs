//! Local "is typing" signal.
//!
//! Start is reported once per burst of input; stop is reported when the
//! idle window elapses after the last input, or immediately on
//! [`TypingSignal::force_stop`] (e.g. when a chat message is sent).

use std::time::Duration;

use crate::timer::Debounce;

/// A change in the local typing state that must be broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingTransition {
    Started,
    Stopped,
}

#[derive(Debug)]
pub struct TypingSignal {
    typing: bool,
    idle: Debounce<()>,
}

impl TypingSignal {
    pub fn new(idle_window: Duration) -> Self {
        Self {
            typing: false,
            idle: Debounce::new(idle_window),
        }
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Record a qualifying input event.
    pub fn on_input(&mut self) -> Option<TypingTransition> {
        self.idle.schedule(());
        if self.typing {
            None
        } else {
            self.typing = true;
            Some(TypingTransition::Started)
        }
    }

    /// End the burst now.
    pub fn force_stop(&mut self) -> Option<TypingTransition> {
        self.idle.cancel();
        if self.typing {
            self.typing = false;
            Some(TypingTransition::Stopped)
        } else {
            None
        }
    }

    /// Wait until the idle window elapses after the last input.
    ///
    /// Cancel-safe; never resolves while not typing.
    pub async fn expired(&mut self) -> TypingTransition {
        self.idle.fired().await;
        self.typing = false;
        TypingTransition::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_start_once_per_burst() {
        let mut signal = TypingSignal::new(Duration::from_millis(2000));
        assert_eq!(signal.on_input(), Some(TypingTransition::Started));
        for _ in 0..10 {
            tokio::time::advance(Duration::from_millis(100)).await;
            assert_eq!(signal.on_input(), None);
        }
        assert!(signal.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_fires_idle_window_after_last_input() {
        let mut signal = TypingSignal::new(Duration::from_millis(2000));
        signal.on_input();
        tokio::time::advance(Duration::from_millis(1500)).await;
        signal.on_input();
        let last_input = Instant::now();

        assert_eq!(signal.expired().await, TypingTransition::Stopped);
        assert_eq!(Instant::now() - last_input, Duration::from_millis(2000));
        assert!(!signal.is_typing());

        // A new burst starts again.
        assert_eq!(signal.on_input(), Some(TypingTransition::Started));
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_stop_cancels_timer() {
        let mut signal = TypingSignal::new(Duration::from_millis(2000));
        assert_eq!(signal.force_stop(), None);
        signal.on_input();
        assert_eq!(signal.force_stop(), Some(TypingTransition::Stopped));

        let res = tokio::time::timeout(Duration::from_secs(5), signal.expired()).await;
        assert!(res.is_err());
    }
}
