//! Generic synchronized view: local cache + optimistic update + reconcile.
//!
//! Chat, document and kanban all hold one of these, differing only in the
//! [`MergeStrategy`] they plug in.
//!
//! ```text
//! user action ──► apply_local ──► state ──► render
//!                                   ▲
//! remote event ──► echo filter ──► apply_remote
//! ```

use crate::merge::MergeStrategy;

/// Outcome of reconciling one remote update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Merged and the state changed.
    Applied,
    /// Merged but the state was already equal.
    Unchanged,
    /// Dropped because the local user originated it.
    EchoSuppressed,
}

/// Counters for how the view's state has been mutated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStats {
    pub local_updates: u64,
    pub remote_updates: u64,
    pub echoes_suppressed: u64,
}

/// Local state for one view manager.
pub struct SyncedView<S: MergeStrategy> {
    local_user_id: String,
    state: S::State,
    stats: ViewStats,
}

impl<S: MergeStrategy> SyncedView<S> {
    pub fn new(local_user_id: impl Into<String>, initial: S::State) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            state: initial,
            stats: ViewStats::default(),
        }
    }

    pub fn state(&self) -> &S::State {
        &self.state
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    pub fn stats(&self) -> ViewStats {
        self.stats
    }

    /// Whether an event with this originator is an echo of our own action.
    pub fn is_echo(&self, origin: Option<&str>) -> bool {
        origin.is_some_and(|o| o == self.local_user_id)
    }

    /// Apply a user action before any network round-trip.
    pub fn apply_local(&mut self, update: S::Update) -> bool {
        self.stats.local_updates += 1;
        S::merge(&mut self.state, update)
    }

    /// Mutate the state in place as a local action, for edits that are not
    /// expressible as a merge (status flips, removals).
    pub fn mutate_local<R>(&mut self, f: impl FnOnce(&mut S::State) -> R) -> R {
        self.stats.local_updates += 1;
        f(&mut self.state)
    }

    /// Fold in an update from another participant.
    ///
    /// `origin` is the originating user id when the event carried one.
    pub fn apply_remote(&mut self, origin: Option<&str>, update: S::Update) -> Reconciled {
        if self.is_echo(origin) {
            self.stats.echoes_suppressed += 1;
            log::debug!("Dropping echo of local update from {}", self.local_user_id);
            return Reconciled::EchoSuppressed;
        }
        self.stats.remote_updates += 1;
        if S::merge(&mut self.state, update) {
            Reconciled::Applied
        } else {
            Reconciled::Unchanged
        }
    }

    /// Replace the state with a freshly loaded snapshot.
    pub fn reset(&mut self, state: S::State) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{AppendOnly, LastWriteWins};

    #[test]
    fn test_remote_echo_is_suppressed() {
        let mut view: SyncedView<AppendOnly<&str>> = SyncedView::new("me", Vec::new());
        assert!(view.apply_local("mine"));
        assert_eq!(view.apply_remote(Some("me"), "mine"), Reconciled::EchoSuppressed);
        assert_eq!(view.apply_remote(Some("you"), "yours"), Reconciled::Applied);
        assert_eq!(view.state(), &vec!["mine", "yours"]);

        let stats = view.stats();
        assert_eq!(stats.local_updates, 1);
        assert_eq!(stats.remote_updates, 1);
        assert_eq!(stats.echoes_suppressed, 1);
    }

    #[test]
    fn test_unknown_origin_is_applied() {
        let mut view: SyncedView<AppendOnly<u32>> = SyncedView::new("me", Vec::new());
        assert_eq!(view.apply_remote(None, 7), Reconciled::Applied);
        assert!(!view.is_echo(None));
    }

    #[test]
    fn test_message_count_matches_sends_plus_foreign_events() {
        let mut view: SyncedView<AppendOnly<String>> = SyncedView::new("me", Vec::new());
        let mut sends = 0;
        let mut foreign = 0;
        for i in 0..50 {
            match i % 3 {
                0 => {
                    view.apply_local(format!("local {i}"));
                    sends += 1;
                }
                1 => {
                    view.apply_remote(Some("other"), format!("remote {i}"));
                    foreign += 1;
                }
                _ => {
                    view.apply_remote(Some("me"), format!("echo {i}"));
                }
            }
        }
        assert_eq!(view.state().len(), sends + foreign);
    }

    #[test]
    fn test_last_write_wins_unchanged() {
        let mut view: SyncedView<LastWriteWins<String>> =
            SyncedView::new("me", "same".to_string());
        assert_eq!(
            view.apply_remote(Some("you"), "same".to_string()),
            Reconciled::Unchanged
        );
        assert_eq!(
            view.apply_remote(Some("you"), "new".to_string()),
            Reconciled::Applied
        );
        assert_eq!(view.state(), "new");
    }

    #[test]
    fn test_mutate_local_and_reset() {
        let mut view: SyncedView<AppendOnly<u32>> = SyncedView::new("me", vec![1, 2, 3]);
        let removed = view.mutate_local(|s| s.pop());
        assert_eq!(removed, Some(3));
        view.reset(vec![9]);
        assert_eq!(view.state(), &vec![9]);
        assert_eq!(view.local_user_id(), "me");
    }
}
