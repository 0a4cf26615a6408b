use super::hunk::{Hunk, HunkHeader};
use super::line::{Line, LineKind};
use std::fmt;

/// All hunks of one file's diff, addressed by global line index.
///
/// Every line of every hunk (header lines included) has a global index. The
/// ranges of consecutive hunks are contiguous and start at 0, so each index
/// maps to exactly one hunk and one line. Construction goes through
/// [`Diff::new`] or [`Diff::parse`], which assign the ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    path: String,
    hunks: Vec<Hunk>,
    is_binary: bool,
}

impl Diff {
    /// Build a diff from already parsed hunks, in file order.
    ///
    /// A header line is prepended to each hunk's body.
    pub fn new<I>(path: impl Into<String>, hunks: I) -> Self
    where
        I: IntoIterator<Item = (HunkHeader, Vec<Line>)>,
    {
        Self::assemble(
            path.into(),
            hunks
                .into_iter()
                .map(|(header, body)| (header, header.to_string(), body)),
        )
    }

    /// A diff of a binary file: no hunks, nothing selectable.
    pub fn binary(path: impl Into<String>) -> Self {
        Diff {
            path: path.into(),
            hunks: Vec::new(),
            is_binary: true,
        }
    }

    /// A diff with no changes, also used when no diff could be produced.
    pub fn empty(path: impl Into<String>) -> Self {
        Diff {
            path: path.into(),
            hunks: Vec::new(),
            is_binary: false,
        }
    }

    fn assemble<I>(path: String, hunks: I) -> Self
    where
        I: IntoIterator<Item = (HunkHeader, String, Vec<Line>)>,
    {
        let mut next = 0;
        let hunks = hunks
            .into_iter()
            .map(|(header, header_text, body)| {
                let hunk = Hunk::new(header, header_text, body, next);
                next = hunk.global_end() + 1;
                hunk
            })
            .collect();

        Diff {
            path,
            hunks,
            is_binary: false,
        }
    }

    /// Read a single-file unified diff, as printed by `git diff`.
    ///
    /// Returns `None` if no file path can be found in the text.
    pub fn parse(text: &str) -> Option<Self> {
        let path = parse_path(text)?;

        if text
            .lines()
            .any(|line| line.starts_with("Binary files ") || line == "GIT binary patch")
        {
            return Some(Diff::binary(path));
        }

        let mut hunks: Vec<(HunkHeader, String, Vec<Line>)> = Vec::new();
        let mut old_line = 0;
        let mut new_line = 0;
        let mut old_remaining = 0;
        let mut new_remaining = 0;

        // Split on '\n' only: a '\r' belongs to the line's content
        for raw in text.split_terminator('\n') {
            let in_hunk = old_remaining > 0 || new_remaining > 0;

            if let Some(marker) = raw.strip_prefix('\\') {
                // "\ No newline at end of file" applies to the line before it
                if marker.contains("No newline")
                    && let Some(last) = hunks.last_mut().and_then(|(_, _, body)| body.last_mut())
                {
                    last.set_trailing_newline(false);
                }
                continue;
            }

            if !in_hunk {
                if let Some((header, _)) = HunkHeader::parse(raw) {
                    old_line = header.old_start;
                    new_line = header.new_start;
                    old_remaining = header.old_count;
                    new_remaining = header.new_count;
                    hunks.push((header, raw.trim_end_matches('\r').to_string(), Vec::new()));
                }
                continue;
            }

            let Some((_, _, body)) = hunks.last_mut() else {
                continue;
            };

            if let Some(content) = raw.strip_prefix('+') {
                body.push(Line::add(content, new_line));
                new_line += 1;
                new_remaining = new_remaining.saturating_sub(1);
            } else if let Some(content) = raw.strip_prefix('-') {
                body.push(Line::delete(content, old_line));
                old_line += 1;
                old_remaining = old_remaining.saturating_sub(1);
            } else {
                // Some tools strip the leading space from empty context lines
                let content = raw.strip_prefix(' ').unwrap_or(raw);
                body.push(Line::context(content, old_line, new_line));
                old_line += 1;
                new_line += 1;
                old_remaining = old_remaining.saturating_sub(1);
                new_remaining = new_remaining.saturating_sub(1);
            }
        }

        Some(Self::assemble(path, hunks))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    pub fn is_binary(&self) -> bool {
        self.is_binary
    }

    /// Number of global indices (all lines across all hunks).
    pub fn len(&self) -> usize {
        self.hunks.last().map_or(0, |hunk| hunk.global_end() + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// The hunk whose global range contains `index`.
    ///
    /// Binary search over hunk boundaries; `None` past the last hunk.
    pub fn hunk_at(&self, index: usize) -> Option<&Hunk> {
        let position = self.hunks.partition_point(|hunk| hunk.global_end() < index);
        self.hunks.get(position).filter(|hunk| hunk.contains(index))
    }

    /// The line at a global index.
    ///
    /// # Panics
    ///
    /// If the hunk containing `index` does not hold the line its range claims,
    /// which can only happen if the addressing was built incorrectly.
    pub fn line_at(&self, index: usize) -> Option<&Line> {
        let hunk = self.hunk_at(index)?;
        Some(&hunk.lines()[index - hunk.global_start()])
    }

    pub(crate) fn line_at_mut(&mut self, index: usize) -> Option<&mut Line> {
        let position = self.hunks.partition_point(|hunk| hunk.global_end() < index);
        let hunk = self.hunks.get_mut(position).filter(|hunk| hunk.contains(index))?;
        let relative = index - hunk.global_start();
        Some(&mut hunk.lines_mut()[relative])
    }

    /// Global indices of every selectable line, ascending.
    pub fn selectable_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.hunks.iter().flat_map(Hunk::selectable_indices)
    }

    pub fn selectable_count(&self) -> usize {
        self.selectable_indices().count()
    }

    pub fn is_selectable(&self, index: usize) -> bool {
        self.line_at(index).is_some_and(Line::is_selectable)
    }

    /// Set the display flag of every `Add`/`Delete` line.
    ///
    /// Context and header lines are left alone. This does not touch any
    /// [`SelectionState`](crate::SelectionState); see
    /// [`FileSession::select_all`](crate::FileSession::select_all) for the
    /// reconciled version.
    pub fn set_all(&mut self, included: bool) {
        for hunk in &mut self.hunks {
            for line in hunk.lines_mut() {
                if line.is_selectable() {
                    line.included = included;
                }
            }
        }
    }
}

/// Extract the file path from diff headers, preferring the new side
fn parse_path(text: &str) -> Option<String> {
    let from_header = |marker: &str, side: &str| {
        text.lines()
            .find_map(|line| line.strip_prefix(marker))
            .map(unquote)
            .and_then(|name| name.strip_prefix(side).map(str::to_string))
            .filter(|path| !path.is_empty())
    };

    from_header("+++ ", "b/")
        .or_else(|| from_header("--- ", "a/"))
        .or_else(|| {
            text.lines()
                .find_map(|line| line.strip_prefix("diff --git "))
                .and_then(|rest| {
                    if rest.ends_with('"') {
                        rest.rfind(" \"b/").map(|at| unquote(&rest[at + 1..]))
                    } else {
                        rest.rsplit_once(" b/").map(|(_, path)| format!("b/{}", path))
                    }
                })
                .and_then(|name| name.strip_prefix("b/").map(str::to_string))
        })
}

/// Undo git's C-style quoting of a path (`"b/t\303\251st.txt"`).
///
/// Unquoted names are returned as is, minus the tab git appends to names
/// containing spaces.
fn unquote(name: &str) -> String {
    let name = name.trim_end_matches('\t');
    let Some(inner) = name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) else {
        return name.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('a') => bytes.push(0x07),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0c),
            Some('v') => bytes.push(0x0b),
            Some(digit @ '0'..='7') => {
                let mut value = digit.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                bytes.push(u8::try_from(value).unwrap_or(u8::MAX));
            }
            Some(other) => {
                let mut buf = [0; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "diff --git a/{} b/{}", self.path, self.path)?;

        if self.is_binary {
            return writeln!(f, "Binary files a/{} and b/{} differ", self.path, self.path);
        }

        writeln!(f, "--- a/{}", self.path)?;
        writeln!(f, "+++ b/{}", self.path)?;

        for hunk in &self.hunks {
            for line in hunk.lines() {
                match line.kind() {
                    LineKind::Hunk => writeln!(f, "{}", line.text())?,
                    kind => writeln!(f, "{}{}", kind.marker(), line.text())?,
                }
                if !line.has_trailing_newline() {
                    writeln!(f, "\\ No newline at end of file")?;
                }
            }
        }

        Ok(())
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_kind() -> impl Strategy<Value = LineKind> {
        prop_oneof![
            Just(LineKind::Context),
            Just(LineKind::Add),
            Just(LineKind::Delete),
        ]
    }

    /// Hunk bodies with arbitrary kinds; line numbers are irrelevant to addressing
    fn arb_diff() -> impl Strategy<Value = Diff> {
        prop::collection::vec(prop::collection::vec(arb_kind(), 0..8), 0..6).prop_map(|bodies| {
            Diff::new(
                "prop.txt",
                bodies.into_iter().enumerate().map(|(i, kinds)| {
                    let start = i as u32 * 100 + 1;
                    let body = kinds
                        .into_iter()
                        .map(|kind| Line::new("x", kind, Some(start), Some(start)))
                        .collect();
                    (HunkHeader::new(start, 1, start, 1), body)
                }),
            )
        })
    }

    proptest! {
        /// Hunk ranges are ordered, non-overlapping and cover [0, len-1] without gaps
        #[test]
        fn ranges_are_contiguous(diff in arb_diff()) {
            let mut expected_start = 0;
            for hunk in diff.hunks() {
                prop_assert_eq!(hunk.global_start(), expected_start);
                prop_assert_eq!(
                    hunk.global_end() - hunk.global_start() + 1,
                    hunk.lines().len()
                );
                expected_start = hunk.global_end() + 1;
            }
            prop_assert_eq!(expected_start, diff.len());
        }

        /// Every index in range resolves to exactly one hunk and a present line
        #[test]
        fn lookup_is_total_in_range(diff in arb_diff()) {
            for index in 0..diff.len() {
                let owners = diff.hunks().iter().filter(|h| h.contains(index)).count();
                prop_assert_eq!(owners, 1);

                let hunk = diff.hunk_at(index);
                prop_assert!(hunk.is_some());
                let hunk = hunk.unwrap();
                prop_assert!(hunk.contains(index));

                let relative = index - hunk.global_start();
                prop_assert!(relative < hunk.lines().len());
                prop_assert!(diff.line_at(index).is_some());
            }
            prop_assert!(diff.hunk_at(diff.len()).is_none());
        }
    }
}
