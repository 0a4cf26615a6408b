use error_set::error_set;
use log::warn;
use std::path::PathBuf;

pub mod diff;
pub mod parse;
pub mod patch;
pub mod selection;
pub mod session;
pub mod source;

pub use diff::{Diff, Hunk, HunkHeader, Line, LineKind, format_diff};
pub use parse::ParseError;
pub use patch::{PatchError, build_patch};
pub use selection::{SelectionError, SelectionState, SelectionSummary, summarize};
pub use session::{DiffTicket, FileSession};
pub use source::{DiffRequest, DiffSource, GitDiffSource, SourceError};

use parse::{Action, Selector};

error_set! {
    /// Top-level error for partial-stage operations
    PartialStageError := {
        #[display("No changes found in {file}")]
        NoChanges { file: String },
        #[display("{file} is a binary file")]
        BinaryFile { file: String },
        ParseError(ParseError),
        PatchError(PatchError),
        SelectionError(SelectionError),
        SourceError(SourceError),
    }
}

/// Result of a stage operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    /// How much of the file ended up selected
    pub summary: SelectionSummary,
    /// The patch that was (or would be) applied to the index
    pub patch: String,
}

/// Main interface: select lines of a file's diff by global index and stage them
pub struct PartialStager {
    source: GitDiffSource,
}

impl PartialStager {
    /// Create a new PartialStager for the given repository path
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            source: GitDiffSource::new(repo_path),
        }
    }

    /// Number of context lines requested from git
    #[must_use]
    pub fn with_context_lines(mut self, context_lines: u32) -> Self {
        self.source = self.source.with_context_lines(context_lines);
        self
    }

    /// Load the diff for `request` into a fresh session
    pub fn session(
        &self,
        request: DiffRequest,
        default: SelectionSummary,
    ) -> Result<FileSession, PartialStageError> {
        let default_include = SelectionState::with_default(default)?.default_include();
        let mut session = FileSession::new(default_include);
        session.load(&self.source, request);
        Ok(session)
    }

    /// Diff of a file with global indices, as accepted by [`PartialStager::stage`]
    ///
    /// # Examples
    /// ```no_run
    /// # use partial_stage::{PartialStager, SelectionSummary};
    /// let stager = PartialStager::new(".");
    /// print!("{}", stager.show("flake.nix", None, SelectionSummary::All).unwrap());
    /// ```
    pub fn show(
        &self,
        file: &str,
        commit: Option<String>,
        default: SelectionSummary,
    ) -> Result<String, PartialStageError> {
        let request = DiffRequest {
            file: file.to_string(),
            commit,
        };
        Ok(format_diff(self.session(request, default)?.diff()))
    }

    /// Stage the lines of `file` picked by a selection expression
    ///
    /// Selectors are applied in order to a selection starting from `default`.
    /// With `apply` false the patch is only built.
    ///
    /// # Examples
    /// ```no_run
    /// # use partial_stage::{PartialStager, SelectionSummary};
    /// let stager = PartialStager::new(".");
    /// stager.stage("flake.nix", "2", SelectionSummary::None, true).unwrap();
    /// stager.stage("flake.nix", "3..7:on,5", SelectionSummary::None, true).unwrap();
    /// ```
    pub fn stage(
        &self,
        file: &str,
        expression: &str,
        default: SelectionSummary,
        apply: bool,
    ) -> Result<StageOutcome, PartialStageError> {
        let selectors = parse::parse_selectors(expression)?;
        let mut session = self.session(DiffRequest::working_tree(file), default)?;

        if session.diff().is_binary() {
            return Err(PartialStageError::BinaryFile {
                file: file.to_string(),
            });
        }
        if session.diff().is_empty() {
            return Err(PartialStageError::NoChanges {
                file: file.to_string(),
            });
        }

        for selector in &selectors {
            apply_selector(&mut session, selector);
        }

        let patch = session.patch()?;
        if apply {
            self.source.apply_cached(&patch)?;
        }

        Ok(StageOutcome {
            summary: session.summary(),
            patch,
        })
    }
}

/// Feed one selector into a session as toggle/set events
pub fn apply_selector(session: &mut FileSession, selector: &Selector) -> usize {
    let Selector { start, end, action } = *selector;
    let written = match action {
        Action::Toggle if start == end => usize::from(session.toggle(start)),
        Action::Toggle => session.toggle_range(start, end),
        Action::Include => session.set_range(start, end, true),
        Action::Exclude => session.set_range(start, end, false),
    };

    if written == 0 {
        warn!("{}..={} does not cover any added or deleted line", start, end);
    }
    written
}
