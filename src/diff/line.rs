/// What a diff line represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Unchanged line shown for hunk coherence
    Context,
    /// Line present only in the new revision
    Add,
    /// Line present only in the old revision
    Delete,
    /// Synthetic `@@ ... @@` header line, not file content
    Hunk,
}

impl LineKind {
    /// Whether lines of this kind can be included or excluded from a stage.
    pub fn is_selectable(self) -> bool {
        matches!(self, LineKind::Add | LineKind::Delete)
    }

    /// The unified-diff prefix character for this kind.
    pub fn marker(self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Add => '+',
            LineKind::Delete => '-',
            LineKind::Hunk => '@',
        }
    }
}

/// A single line of a file diff.
///
/// Everything except `included` is fixed at construction. `included` is the
/// display flag; the authoritative selection lives in
/// [`SelectionState`](crate::SelectionState) and is projected onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    kind: LineKind,
    old_line_number: Option<u32>,
    new_line_number: Option<u32>,
    has_trailing_newline: bool,
    pub included: bool,
}

impl Line {
    pub fn new(
        text: impl Into<String>,
        kind: LineKind,
        old_line_number: Option<u32>,
        new_line_number: Option<u32>,
    ) -> Self {
        Self {
            text: text.into(),
            kind,
            old_line_number,
            new_line_number,
            has_trailing_newline: true,
            included: false,
        }
    }

    /// Context line present at `old` in the old revision and `new` in the new one
    pub fn context(text: impl Into<String>, old: u32, new: u32) -> Self {
        Self::new(text, LineKind::Context, Some(old), Some(new))
    }

    /// Added line at `new` in the new revision
    pub fn add(text: impl Into<String>, new: u32) -> Self {
        Self::new(text, LineKind::Add, None, Some(new))
    }

    /// Deleted line at `old` in the old revision
    pub fn delete(text: impl Into<String>, old: u32) -> Self {
        Self::new(text, LineKind::Delete, Some(old), None)
    }

    /// Mark the line as the last one of its revision without a trailing `\n`.
    #[must_use]
    pub fn without_trailing_newline(mut self) -> Self {
        self.has_trailing_newline = false;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn old_line_number(&self) -> Option<u32> {
        self.old_line_number
    }

    pub fn new_line_number(&self) -> Option<u32> {
        self.new_line_number
    }

    pub fn has_trailing_newline(&self) -> bool {
        self.has_trailing_newline
    }

    pub fn is_selectable(&self) -> bool {
        self.kind.is_selectable()
    }

    pub(crate) fn set_trailing_newline(&mut self, value: bool) {
        self.has_trailing_newline = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_changes_are_selectable() {
        assert!(LineKind::Add.is_selectable());
        assert!(LineKind::Delete.is_selectable());
        assert!(!LineKind::Context.is_selectable());
        assert!(!LineKind::Hunk.is_selectable());
    }

    #[test]
    fn constructors_fill_line_numbers() {
        let add = Line::add("new", 7);
        assert_eq!(add.old_line_number(), None);
        assert_eq!(add.new_line_number(), Some(7));

        let delete = Line::delete("old", 4);
        assert_eq!(delete.old_line_number(), Some(4));
        assert_eq!(delete.new_line_number(), None);

        let context = Line::context("same", 3, 5);
        assert_eq!(context.old_line_number(), Some(3));
        assert_eq!(context.new_line_number(), Some(5));
        assert!(context.has_trailing_newline());
        assert!(!context.included);
    }

    #[test]
    fn trailing_newline_can_be_cleared() {
        let line = Line::add("last", 10).without_trailing_newline();
        assert!(!line.has_trailing_newline());
        assert_eq!(line.text(), "last");
    }
}
