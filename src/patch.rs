//! Build a patch that stages only the included lines of a diff.
//!
//! Per hunk, included `Add`/`Delete` lines keep their role, excluded
//! deletions are demoted to context (the line stays in the index), excluded
//! additions are dropped, and context lines are always kept. Hunk headers are
//! recounted and later hunks are shifted by the net effect of earlier ones.

use crate::diff::{Diff, Hunk, HunkHeader, Line, LineKind};
use crate::selection::SelectionState;
use crate::selection::resolve::effective;
use error_set::error_set;

error_set! {
    /// Errors from building a partial patch
    PatchError := {
        /// Binary diffs have no lines to select
        #[display("{path} is a binary file; lines cannot be staged selectively")]
        Binary { path: String },
        /// Every selectable line is excluded
        #[display("No lines selected in {path}")]
        NothingSelected { path: String },
    }
}

/// One output line of a filtered hunk
struct PatchLine<'a> {
    marker: char,
    text: &'a str,
    has_trailing_newline: bool,
}

/// Build a git patch containing only the lines `selection` includes.
///
/// The result can be fed to `git apply --cached`.
///
/// # Errors
///
/// [`PatchError::Binary`] for binary diffs, [`PatchError::NothingSelected`]
/// when no selectable line is included.
pub fn build_patch(diff: &Diff, selection: &SelectionState) -> Result<String, PatchError> {
    if diff.is_binary() {
        return Err(PatchError::Binary {
            path: diff.path().to_string(),
        });
    }

    let mut body = String::new();
    let mut cumulative_delta: i64 = 0;

    for hunk in diff.hunks() {
        let Some((header, lines)) = filter_hunk(hunk, selection, cumulative_delta) else {
            continue;
        };
        cumulative_delta += i64::from(header.new_count) - i64::from(header.old_count);

        body.push_str(&format!("{}\n", header));
        for line in lines {
            body.push_str(&format!("{}{}\n", line.marker, line.text));
            if !line.has_trailing_newline {
                body.push_str("\\ No newline at end of file\n");
            }
        }
    }

    if body.is_empty() {
        return Err(PatchError::NothingSelected {
            path: diff.path().to_string(),
        });
    }

    let path = diff.path();
    Ok(format!(
        "diff --git a/{path} b/{path}\n--- a/{path}\n+++ b/{path}\n{body}"
    ))
}

/// Filter one hunk down to its included lines.
///
/// Returns `None` if nothing in the hunk is included.
fn filter_hunk<'a>(
    hunk: &'a Hunk,
    selection: &SelectionState,
    cumulative_delta: i64,
) -> Option<(HunkHeader, Vec<PatchLine<'a>>)> {
    if !hunk
        .selectable_indices()
        .any(|index| effective(selection, index))
    {
        return None;
    }

    let body: Vec<(usize, &Line)> = hunk
        .lines()
        .iter()
        .enumerate()
        .skip(1)
        .map(|(offset, line)| (hunk.global_start() + offset, line))
        .collect();

    let mut lines = Vec::with_capacity(body.len());
    let mut old_count = 0;
    let mut new_count = 0;

    for (position, &(index, line)) in body.iter().enumerate() {
        let included = effective(selection, index);

        match line.kind() {
            LineKind::Context => {
                lines.push(patch_line(' ', line));
                old_count += 1;
                new_count += 1;
            }
            LineKind::Delete if included => {
                lines.push(patch_line('-', line));
                old_count += 1;
            }
            LineKind::Delete => {
                if !line.has_trailing_newline() && has_included_addition(&body[position..], selection)
                {
                    // Appending after a line without a trailing newline has to
                    // rewrite that line with one
                    lines.push(patch_line('-', line));
                    old_count += 1;
                    if !next_addition_restores(&body[position..], selection, line.text()) {
                        lines.push(PatchLine {
                            marker: '+',
                            text: line.text(),
                            has_trailing_newline: true,
                        });
                        new_count += 1;
                    }
                } else {
                    lines.push(patch_line(' ', line));
                    old_count += 1;
                    new_count += 1;
                }
            }
            LineKind::Add if included => {
                lines.push(patch_line('+', line));
                new_count += 1;
            }
            LineKind::Add | LineKind::Hunk => {}
        }
    }

    let old_start = hunk.header().old_start;
    let base = if old_count == 0 {
        // Pure insertion: old_start names the line the insertion follows
        i64::from(old_start) + 1
    } else if new_count == 0 {
        // Pure deletion: new_start names the line before the gap
        i64::from(old_start) - 1
    } else {
        i64::from(old_start)
    };
    let new_start = u32::try_from((base + cumulative_delta).max(0)).unwrap_or(u32::MAX);

    Some((
        HunkHeader::new(old_start, old_count, new_start, new_count),
        lines,
    ))
}

fn patch_line(marker: char, line: &Line) -> PatchLine<'_> {
    PatchLine {
        marker,
        text: line.text(),
        has_trailing_newline: line.has_trailing_newline(),
    }
}

fn has_included_addition(rest: &[(usize, &Line)], selection: &SelectionState) -> bool {
    rest.iter()
        .any(|&(index, line)| line.kind() == LineKind::Add && effective(selection, index))
}

/// Whether the first addition after a deletion is included and re-adds its text
fn next_addition_restores(rest: &[(usize, &Line)], selection: &SelectionState, text: &str) -> bool {
    rest.iter()
        .find(|(_, line)| line.kind() == LineKind::Add)
        .is_some_and(|&(index, line)| effective(selection, index) && line.text() == text)
}
