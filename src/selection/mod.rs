//! Per-file line selection and its tri-state rollup.
//!
//! [`SelectionState`] is the single source of truth for which lines are
//! included. It is independent of any one [`Diff`](crate::Diff) snapshot and
//! is addressed by global line index. The functions in [`resolve`] are pure:
//! they compute the summary and the seeded picture a first edit starts from.

use error_set::error_set;

pub mod resolve;
pub mod state;

pub use resolve::{SelectionSummary, summarize};
pub use state::SelectionState;

error_set! {
    /// Errors from building a selection
    SelectionError := {
        /// A default selection must be `All` or `None`
        #[display("A selection default must be All or None, not Partial")]
        PartialDefault,
    }
}
