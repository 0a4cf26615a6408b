use super::SelectionError;
use super::resolve::{self, SelectionSummary};
use crate::diff::Diff;
use log::debug;
use std::collections::BTreeMap;

/// Which lines of a file's diff are included in the next stage.
///
/// Stored as a default plus sparse per-line overrides keyed by global index.
/// The default is a plain bool so it can only ever mean "all" or "none".
/// Overrides are only written for `Add`/`Delete` lines of the diff passed to
/// the mutating methods.
///
/// A state outlives any single [`Diff`]: after a reload of the same file call
/// [`SelectionState::reconcile`] with the new diff.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    default_include: bool,
    overrides: BTreeMap<usize, bool>,
}

impl SelectionState {
    /// A fresh state with no overrides.
    pub fn new(default_include: bool) -> Self {
        Self {
            default_include,
            overrides: BTreeMap::new(),
        }
    }

    /// A fresh state from a summary, which must be `All` or `None`.
    ///
    /// # Errors
    ///
    /// [`SelectionError::PartialDefault`] for [`SelectionSummary::Partial`],
    /// which does not describe any concrete selection.
    pub fn with_default(summary: SelectionSummary) -> Result<Self, SelectionError> {
        match summary {
            SelectionSummary::All => Ok(Self::new(true)),
            SelectionSummary::None => Ok(Self::new(false)),
            SelectionSummary::Partial => Err(SelectionError::PartialDefault),
        }
    }

    pub(crate) fn from_parts(default_include: bool, overrides: BTreeMap<usize, bool>) -> Self {
        Self {
            default_include,
            overrides,
        }
    }

    pub fn default_include(&self) -> bool {
        self.default_include
    }

    pub fn default_summary(&self) -> SelectionSummary {
        if self.default_include {
            SelectionSummary::All
        } else {
            SelectionSummary::None
        }
    }

    pub fn overrides(&self) -> &BTreeMap<usize, bool> {
        &self.overrides
    }

    pub fn summary(&self) -> SelectionSummary {
        resolve::summarize(self)
    }

    /// Effective state of a selectable line of `diff`.
    ///
    /// `None` if `index` is out of range or not an `Add`/`Delete` line.
    pub fn is_included(&self, diff: &Diff, index: usize) -> Option<bool> {
        diff.is_selectable(index)
            .then(|| resolve::effective(self, index))
    }

    /// Global indices of every included line of `diff`, ascending.
    pub fn included_indices<'a>(&'a self, diff: &'a Diff) -> impl Iterator<Item = usize> + 'a {
        diff.selectable_indices()
            .filter(move |&index| resolve::effective(self, index))
    }

    /// Invert one line.
    ///
    /// Returns `false` and leaves the state untouched when `index` is not a
    /// selectable line of `diff`.
    pub fn toggle(&mut self, diff: &Diff, index: usize) -> bool {
        match self.is_included(diff, index) {
            Some(current) => {
                self.write(diff, [index], !current);
                true
            }
            None => self.ignore(index),
        }
    }

    /// Set one line to `included`.
    ///
    /// Returns `false` and leaves the state untouched when `index` is not a
    /// selectable line of `diff`.
    pub fn set(&mut self, diff: &Diff, index: usize, included: bool) -> bool {
        if !diff.is_selectable(index) {
            return self.ignore(index);
        }
        self.write(diff, [index], included);
        true
    }

    /// Toggle every selectable line in `start..=end` to the same value.
    ///
    /// The value is the negation of the first selectable line's current state,
    /// so a mixed range becomes uniform. Returns the number of lines written.
    pub fn toggle_range(&mut self, diff: &Diff, start: usize, end: usize) -> usize {
        let targets = selectable_in(diff, start, end);
        let Some(&first) = targets.first() else {
            debug!("no selectable line in {}..={}, ignoring toggle", start, end);
            return 0;
        };

        let included = !resolve::effective(self, first);
        let count = targets.len();
        self.write(diff, targets, included);
        count
    }

    /// Set every selectable line in `start..=end` to `included`.
    ///
    /// Returns the number of lines written.
    pub fn set_range(&mut self, diff: &Diff, start: usize, end: usize, included: bool) -> usize {
        let targets = selectable_in(diff, start, end);
        if targets.is_empty() {
            debug!("no selectable line in {}..={}, ignoring set", start, end);
            return 0;
        }

        let count = targets.len();
        self.write(diff, targets, included);
        count
    }

    /// Forget every override and start over from `included`.
    pub fn reset(&mut self, included: bool) {
        *self = Self::new(included);
    }

    /// Drop overrides that do not name a selectable line of `diff`.
    ///
    /// Used after a reload of the same file: surviving keys are reinterpreted
    /// against the new diff's addressing.
    pub fn reconcile(&mut self, diff: &Diff) {
        let before = self.overrides.len();
        self.overrides.retain(|&index, _| diff.is_selectable(index));

        let dropped = before - self.overrides.len();
        if dropped > 0 {
            debug!(
                "dropped {} stale overrides for {} after reload",
                dropped,
                diff.path()
            );
        }
    }

    /// Project this selection onto the display flags of `diff`.
    pub fn apply_to(&self, diff: &mut Diff) {
        let indices: Vec<usize> = diff.selectable_indices().collect();
        for index in indices {
            let included = resolve::effective(self, index);
            if let Some(line) = diff.line_at_mut(index) {
                line.included = included;
            }
        }
    }

    /// Seed if needed, then write `included` to every target.
    fn write<I>(&mut self, diff: &Diff, targets: I, included: bool)
    where
        I: IntoIterator<Item = usize>,
    {
        if resolve::needs_seed(diff, self) {
            self.overrides = resolve::seed(diff, self);
        }

        for index in targets {
            self.overrides.insert(index, included);
        }
    }

    fn ignore(&self, index: usize) -> bool {
        debug!("index {} is not a selectable line, ignoring", index);
        false
    }
}

fn selectable_in(diff: &Diff, start: usize, end: usize) -> Vec<usize> {
    let (low, high) = if start <= end { (start, end) } else { (end, start) };
    diff.selectable_indices()
        .skip_while(|&index| index < low)
        .take_while(|&index| index <= high)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::{HunkHeader, Line};
    use similar_asserts::assert_eq;

    /// hunk0 [0, 4]: header, context, add, delete, context
    /// hunk1 [5, 7]: header, delete, add
    fn scenario() -> Diff {
        Diff::new(
            "scenario.txt",
            vec![
                (
                    HunkHeader::new(1, 3, 1, 3),
                    vec![
                        Line::context("a", 1, 1),
                        Line::add("b", 2),
                        Line::delete("c", 2),
                        Line::context("d", 3, 3),
                    ],
                ),
                (
                    HunkHeader::new(10, 1, 10, 1),
                    vec![Line::delete("x", 10), Line::add("y", 10)],
                ),
            ],
        )
    }

    #[test]
    fn partial_default_is_rejected() {
        assert!(matches!(
            SelectionState::with_default(SelectionSummary::Partial),
            Err(SelectionError::PartialDefault)
        ));
        assert_eq!(
            SelectionState::with_default(SelectionSummary::All).unwrap(),
            SelectionState::new(true)
        );
        assert_eq!(
            SelectionState::with_default(SelectionSummary::None)
                .unwrap()
                .summary(),
            SelectionSummary::None
        );
    }

    #[test]
    fn scenario_toggle_two_lines_from_none() {
        let diff = scenario();
        let mut state = SelectionState::new(false);

        assert!(state.toggle(&diff, 2));
        assert!(state.toggle(&diff, 3));

        assert_eq!(
            state.overrides(),
            &BTreeMap::from([(2, true), (3, true), (6, false), (7, false)])
        );
        assert_eq!(state.summary(), SelectionSummary::Partial);
        assert!(!state.default_include());
    }

    #[test]
    fn first_toggle_seeds_the_rest() {
        let diff = scenario();
        let mut state = SelectionState::new(true);

        state.toggle(&diff, 6);

        assert_eq!(state.summary(), SelectionSummary::Partial);
        assert_eq!(state.is_included(&diff, 6), Some(false));
        for index in [2, 3, 7] {
            assert_eq!(state.is_included(&diff, index), Some(true), "index {}", index);
        }
    }

    #[test]
    fn toggling_back_restores_uniform_summary() {
        let diff = scenario();
        let mut state = SelectionState::new(true);

        state.toggle(&diff, 2);
        state.toggle(&diff, 2);

        assert_eq!(state.summary(), SelectionSummary::All);
        assert_eq!(state.overrides().len(), 4);
    }

    #[test]
    fn non_selectable_toggle_is_ignored() {
        let diff = scenario();
        let mut state = SelectionState::new(false);

        for index in [0, 1, 4, 5, 8, usize::MAX] {
            assert!(!state.toggle(&diff, index));
            assert!(!state.set(&diff, index, true));
        }
        assert!(state.overrides().is_empty());
        assert_eq!(state.is_included(&diff, 1), None);
    }

    #[test]
    fn set_is_explicit() {
        let diff = scenario();
        let mut state = SelectionState::new(false);

        state.set(&diff, 7, true);
        state.set(&diff, 7, true);

        assert_eq!(state.is_included(&diff, 7), Some(true));
        assert_eq!(state.included_indices(&diff).collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn toggle_range_uses_first_line_for_target() {
        let diff = scenario();
        let mut state = SelectionState::new(false);
        state.set(&diff, 3, true);

        // First selectable line in range is 2 (excluded), so everything becomes included
        let written = state.toggle_range(&diff, 0, 7);

        assert_eq!(written, 4);
        assert_eq!(state.summary(), SelectionSummary::All);

        // Now 2 is included, so the same range flips everything off
        state.toggle_range(&diff, 2, 7);
        assert_eq!(state.summary(), SelectionSummary::None);
    }

    #[test]
    fn toggle_range_across_hunk_boundary() {
        let diff = scenario();
        let mut state = SelectionState::new(false);

        assert_eq!(state.toggle_range(&diff, 3, 6), 2);
        assert_eq!(state.included_indices(&diff).collect::<Vec<_>>(), vec![3, 6]);
    }

    #[test]
    fn range_without_selectable_lines_is_ignored() {
        let diff = scenario();
        let mut state = SelectionState::new(true);

        assert_eq!(state.toggle_range(&diff, 4, 5), 0);
        assert_eq!(state.set_range(&diff, 20, 30, false), 0);
        assert!(state.overrides().is_empty());
    }

    #[test]
    fn reversed_range_is_normalized() {
        let diff = scenario();
        let mut state = SelectionState::new(true);

        assert_eq!(state.set_range(&diff, 7, 6, false), 2);
        assert_eq!(state.included_indices(&diff).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn reset_clears_overrides() {
        let diff = scenario();
        let mut state = SelectionState::new(false);
        state.toggle(&diff, 2);

        state.reset(true);

        assert!(state.overrides().is_empty());
        assert_eq!(state.summary(), SelectionSummary::All);
    }

    #[test]
    fn reconcile_drops_keys_missing_from_new_diff() {
        let diff = scenario();
        let mut state = SelectionState::new(false);
        state.toggle(&diff, 7);

        let reloaded = Diff::new(
            "scenario.txt",
            vec![(
                HunkHeader::new(1, 3, 1, 3),
                vec![
                    Line::context("a", 1, 1),
                    Line::add("b", 2),
                    Line::delete("c", 2),
                    Line::context("d", 3, 3),
                ],
            )],
        );
        state.reconcile(&reloaded);

        assert_eq!(state.overrides(), &BTreeMap::from([(2, false), (3, false)]));
    }

    #[test]
    fn apply_to_projects_onto_flags() {
        let mut diff = scenario();
        let mut state = SelectionState::new(true);
        state.toggle(&diff, 3);

        state.apply_to(&mut diff);

        let flags: Vec<bool> = diff
            .hunks()
            .iter()
            .flat_map(|h| h.lines())
            .map(|l| l.included)
            .collect();
        assert_eq!(
            flags,
            vec![false, false, true, false, false, false, true, true]
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::diff::{HunkHeader, Line, LineKind};
    use proptest::prelude::*;

    fn arb_diff() -> impl Strategy<Value = Diff> {
        let kind = prop_oneof![
            Just(LineKind::Context),
            Just(LineKind::Add),
            Just(LineKind::Delete),
        ];
        prop::collection::vec(prop::collection::vec(kind, 1..6), 1..4).prop_map(|bodies| {
            Diff::new(
                "prop.txt",
                bodies.into_iter().map(|kinds| {
                    let body = kinds
                        .into_iter()
                        .map(|kind| Line::new("x", kind, Some(1), Some(1)))
                        .collect();
                    (HunkHeader::new(1, 1, 1, 1), body)
                }),
            )
        })
    }

    proptest! {
        /// Toggling one line on a fresh state leaves every other line at the default
        #[test]
        fn toggle_preserves_others(
            diff in arb_diff(),
            default_include in any::<bool>(),
            pick in any::<prop::sample::Index>()
        ) {
            let selectable: Vec<usize> = diff.selectable_indices().collect();
            prop_assume!(!selectable.is_empty());
            let target = selectable[pick.index(selectable.len())];

            let mut state = SelectionState::new(default_include);
            prop_assert!(state.toggle(&diff, target));

            for &index in &selectable {
                let expected = if index == target { !default_include } else { default_include };
                prop_assert_eq!(state.is_included(&diff, index), Some(expected));
            }

            let expected_summary = if selectable.len() > 1 {
                SelectionSummary::Partial
            } else if default_include {
                SelectionSummary::None
            } else {
                SelectionSummary::All
            };
            prop_assert_eq!(state.summary(), expected_summary);
        }

        /// Override keys only ever name selectable lines
        #[test]
        fn overrides_stay_selectable(
            diff in arb_diff(),
            toggles in prop::collection::vec(0..40usize, 0..10)
        ) {
            let mut state = SelectionState::new(false);
            for index in toggles {
                state.toggle(&diff, index);
            }
            for index in state.overrides().keys() {
                prop_assert!(diff.is_selectable(*index));
            }
        }
    }
}
