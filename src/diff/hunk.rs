use super::line::{Line, LineKind};
use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, u32 as number},
    combinator::opt,
    sequence::preceded,
};
use std::fmt;

/// Position and extent of a hunk in both file revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

impl HunkHeader {
    pub fn new(old_start: u32, old_count: u32, new_start: u32, new_count: u32) -> Self {
        Self {
            old_start,
            old_count,
            new_start,
            new_count,
        }
    }

    /// Parse a `@@ -a,b +c,d @@ heading` line.
    ///
    /// Returns the header and whatever follows the closing `@@` (the section
    /// heading git appends, possibly empty).
    pub fn parse(line: &str) -> Option<(Self, &str)> {
        header(line).ok().map(|(rest, header)| (header, rest))
    }
}

/// `start[,count]`, a missing count means 1
fn range(input: &str) -> IResult<&str, (u32, u32)> {
    (number, opt(preceded(char(','), number)))
        .map(|(start, count)| (start, count.unwrap_or(1)))
        .parse(input)
}

fn header(input: &str) -> IResult<&str, HunkHeader> {
    (tag("@@ -"), range, tag(" +"), range, tag(" @@"))
        .map(|(_, (old_start, old_count), _, (new_start, new_count), _)| {
            HunkHeader::new(old_start, old_count, new_start, new_count)
        })
        .parse(input)
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old_part = match self.old_count {
            1 => format!("-{}", self.old_start),
            n => format!("-{},{}", self.old_start, n),
        };
        let new_part = match self.new_count {
            1 => format!("+{}", self.new_start),
            n => format!("+{},{}", self.new_start, n),
        };
        write!(f, "@@ {} {} @@", old_part, new_part)
    }
}

/// A hunk of a file diff, addressed by a range of global indices.
///
/// `lines[0]` is always the synthetic [`LineKind::Hunk`] header line, so a hunk
/// occupies `body.len() + 1` global slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    header: HunkHeader,
    lines: Vec<Line>,
    global_start: usize,
    global_end: usize,
}

impl Hunk {
    pub(crate) fn new(
        header: HunkHeader,
        header_text: String,
        body: Vec<Line>,
        global_start: usize,
    ) -> Self {
        let mut lines = Vec::with_capacity(body.len() + 1);
        lines.push(Line::new(header_text, LineKind::Hunk, None, None));
        lines.extend(body);

        let global_end = global_start + lines.len() - 1;
        Hunk {
            header,
            lines,
            global_start,
            global_end,
        }
    }

    pub fn header(&self) -> &HunkHeader {
        &self.header
    }

    /// All lines, header line first
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [Line] {
        &mut self.lines
    }

    pub fn global_start(&self) -> usize {
        self.global_start
    }

    pub fn global_end(&self) -> usize {
        self.global_end
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.global_start..=self.global_end).contains(&index)
    }

    /// Position of a global index within this hunk's lines.
    pub fn relative_index(&self, index: usize) -> Option<usize> {
        self.contains(index).then(|| index - self.global_start)
    }

    /// Global indices of the `Add`/`Delete` lines in this hunk, ascending.
    pub fn selectable_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.is_selectable())
            .map(move |(offset, _)| self.global_start + offset)
    }
}
