//! Merge strategies for reconciling updates into local view state.
//!
//! | Strategy               | Used by  | Update             | Effect                      |
//! |------------------------|----------|--------------------|-----------------------------|
//! | [`AppendOnly`]         | chat     | one item           | pushed to the end           |
//! | [`LastWriteWins`]      | document | whole blob         | replaces if different       |
//! | [`FullReplace`]        | kanban   | authoritative state| always replaces             |

use std::marker::PhantomData;

/// How an update is folded into a view's state.
///
/// `merge` returns `true` when the state changed and the view needs a
/// re-render.
pub trait MergeStrategy {
    type State;
    type Update;

    fn merge(state: &mut Self::State, update: Self::Update) -> bool;
}

/// Ordered log; every update is appended in arrival order.
///
/// There is no dedup key: a re-delivered item is appended twice.
pub struct AppendOnly<T>(PhantomData<T>);

impl<T> MergeStrategy for AppendOnly<T> {
    type State = Vec<T>;
    type Update = T;

    fn merge(state: &mut Vec<T>, update: T) -> bool {
        state.push(update);
        true
    }
}

/// Single blob; the last update to arrive replaces the whole value.
pub struct LastWriteWins<T>(PhantomData<T>);

impl<T: PartialEq> MergeStrategy for LastWriteWins<T> {
    type State = T;
    type Update = T;

    fn merge(state: &mut T, update: T) -> bool {
        if *state == update {
            return false;
        }
        *state = update;
        true
    }
}

/// Authoritative snapshot; the update is a full reload from the server.
pub struct FullReplace<T>(PhantomData<T>);

impl<T> MergeStrategy for FullReplace<T> {
    type State = T;
    type Update = T;

    fn merge(state: &mut T, update: T) -> bool {
        *state = update;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_only_keeps_arrival_order() {
        let mut log = Vec::new();
        assert!(AppendOnly::<&str>::merge(&mut log, "a"));
        assert!(AppendOnly::<&str>::merge(&mut log, "b"));
        assert!(AppendOnly::<&str>::merge(&mut log, "a"));
        assert_eq!(log, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_last_write_wins_skips_identical() {
        let mut blob = String::from("v1");
        assert!(!LastWriteWins::<String>::merge(&mut blob, "v1".to_string()));
        assert!(LastWriteWins::<String>::merge(&mut blob, "v2".to_string()));
        assert_eq!(blob, "v2");
    }

    #[test]
    fn test_full_replace_always_rerenders() {
        let mut state = vec![1, 2];
        assert!(FullReplace::<Vec<i32>>::merge(&mut state, vec![1, 2]));
        assert!(FullReplace::<Vec<i32>>::merge(&mut state, vec![3]));
        assert_eq!(state, vec![3]);
    }
}
