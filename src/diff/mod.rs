pub mod file;
pub mod hunk;
pub mod line;

pub use file::Diff;
pub use hunk::{Hunk, HunkHeader};
pub use line::{Line, LineKind};

/// Format a diff for display with global indices and inclusion marks.
///
/// Uses the lines' display flags, so project a selection onto the diff with
/// [`SelectionState::apply_to`](crate::SelectionState::apply_to) first.
pub fn format_diff(diff: &Diff) -> String {
    if diff.is_binary() {
        return format!("{}: binary file, nothing to select\n", diff.path());
    }
    if diff.is_empty() {
        return format!("{}: no changes\n", diff.path());
    }

    let width = diff.len().saturating_sub(1).to_string().len();
    let mut result = format!("{}:\n", diff.path());

    for hunk in diff.hunks() {
        for (offset, line) in hunk.lines().iter().enumerate() {
            let index = hunk.global_start() + offset;
            let mark = match (line.kind(), line.included) {
                (LineKind::Hunk | LineKind::Context, _) => "   ",
                (LineKind::Add | LineKind::Delete, true) => "[x]",
                (LineKind::Add | LineKind::Delete, false) => "[ ]",
            };
            let text = match line.kind() {
                LineKind::Hunk => line.text().to_string(),
                kind => format!("{}{}", kind.marker(), line.text()),
            };
            result.push_str(&format!("{:>width$} {} {}\n", index, mark, text));
        }
    }

    result
}
