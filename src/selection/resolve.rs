use super::state::SelectionState;
use crate::diff::Diff;
use std::collections::BTreeMap;

/// How much of a file's changes are included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionSummary {
    All,
    Partial,
    None,
}

/// Roll a selection up into a tri-state summary.
///
/// With no overrides the state's default decides. Otherwise the override
/// values alone decide: all `true` is [`SelectionSummary::All`], all `false`
/// is [`SelectionSummary::None`], anything mixed is
/// [`SelectionSummary::Partial`]. Map iteration order has no influence.
pub fn summarize(state: &SelectionState) -> SelectionSummary {
    let mut values = state.overrides().values().copied();
    let Some(first) = values.next() else {
        return state.default_summary();
    };

    if !values.all(|value| value == first) {
        SelectionSummary::Partial
    } else if first {
        SelectionSummary::All
    } else {
        SelectionSummary::None
    }
}

/// Effective inclusion of a global index: its override, else the default.
pub fn effective(state: &SelectionState, index: usize) -> bool {
    state
        .overrides()
        .get(&index)
        .copied()
        .unwrap_or(state.default_include())
}

/// Whether `state` still relies on its default for some selectable line of `diff`.
pub fn needs_seed(diff: &Diff, state: &SelectionState) -> bool {
    diff.selectable_indices()
        .any(|index| !state.overrides().contains_key(&index))
}

/// Expand a sparse selection into one entry per selectable line of `diff`.
///
/// Each entry holds the line's effective state, so applying the result as
/// overrides changes nothing observable. This must happen before the first
/// override is written: a lone override would otherwise make [`summarize`]
/// forget the implied state of every other line.
pub fn seed(diff: &Diff, state: &SelectionState) -> BTreeMap<usize, bool> {
    diff.selectable_indices()
        .map(|index| (index, effective(state, index)))
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// All iff every value is true, None iff every value is false, else Partial
        #[test]
        fn tri_state_matches_values(
            default_include in any::<bool>(),
            overrides in prop::collection::btree_map(0..64usize, any::<bool>(), 1..20)
        ) {
            let expected = if overrides.values().all(|v| *v) {
                SelectionSummary::All
            } else if overrides.values().all(|v| !*v) {
                SelectionSummary::None
            } else {
                SelectionSummary::Partial
            };

            let state = SelectionState::from_parts(default_include, overrides);
            prop_assert_eq!(summarize(&state), expected);
        }
    }
}
