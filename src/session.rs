//! One working-file-change entity: the current diff, its selection, and the
//! bookkeeping that keeps late diff results from overwriting newer ones.

use crate::diff::Diff;
use crate::patch::{self, PatchError};
use crate::selection::{SelectionState, SelectionSummary};
use crate::source::{DiffRequest, DiffSource, SourceError};
use log::{debug, warn};

/// Handle for an in-flight diff request.
///
/// Only the ticket from the most recent [`FileSession::begin`] is accepted by
/// [`FileSession::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffTicket {
    generation: u64,
    request: DiffRequest,
}

impl DiffTicket {
    pub fn request(&self) -> &DiffRequest {
        &self.request
    }
}

/// Selection state for one changed file.
///
/// Owns exactly one [`Diff`] and one [`SelectionState`]. The selection
/// survives reloads of the same file and is reset when the file changes.
/// All mutation goes through `&mut self`, so there is a single writer.
#[derive(Debug)]
pub struct FileSession {
    request: Option<DiffRequest>,
    generation: u64,
    /// The last completed load of `request` failed
    failed: bool,
    default_include: bool,
    diff: Diff,
    selection: SelectionState,
}

impl FileSession {
    /// A session whose fresh selections start from `default_include`.
    pub fn new(default_include: bool) -> Self {
        Self {
            request: None,
            generation: 0,
            failed: false,
            default_include,
            diff: Diff::empty(""),
            selection: SelectionState::new(default_include),
        }
    }

    /// Start loading `request`.
    ///
    /// Returns `None` if `request` is already the active one, unless its last
    /// load failed. Any ticket handed out earlier becomes stale.
    pub fn begin(&mut self, request: DiffRequest) -> Option<DiffTicket> {
        if self.request.as_ref() == Some(&request) && !self.failed {
            debug!("diff for {:?} already requested", request);
            return None;
        }

        let same_file = self
            .request
            .as_ref()
            .is_some_and(|active| active.file == request.file);
        if !same_file {
            self.selection.reset(self.default_include);
            self.diff = Diff::empty(&request.file);
        }

        self.request = Some(request.clone());
        Some(self.next_ticket(request))
    }

    /// Request the active diff again, e.g. after the file changed on disk.
    pub fn refresh(&mut self) -> Option<DiffTicket> {
        let request = self.request.clone()?;
        Some(self.next_ticket(request))
    }

    fn next_ticket(&mut self, request: DiffRequest) -> DiffTicket {
        self.generation += 1;
        self.failed = false;
        DiffTicket {
            generation: self.generation,
            request,
        }
    }

    /// Accept the result for `ticket`.
    ///
    /// Returns `false` and discards the result if a newer request was issued
    /// since. A failed load becomes an empty diff: nothing is selectable until
    /// the request is issued again, which [`FileSession::begin`] then allows.
    pub fn complete(&mut self, ticket: DiffTicket, result: Result<Diff, SourceError>) -> bool {
        if ticket.generation != self.generation || self.request.as_ref() != Some(&ticket.request) {
            debug!("dropping superseded diff for {:?}", ticket.request);
            return false;
        }

        let mut diff = match result {
            Ok(diff) => diff,
            Err(e) => {
                warn!("no diff available for {}: {}", ticket.request.file, e);
                self.failed = true;
                Diff::empty(&ticket.request.file)
            }
        };

        self.selection.reconcile(&diff);
        self.selection.apply_to(&mut diff);
        self.diff = diff;
        true
    }

    /// Load `request` from `source` synchronously.
    ///
    /// Returns whether a new diff was installed.
    pub fn load<S: DiffSource + ?Sized>(&mut self, source: &S, request: DiffRequest) -> bool {
        match self.begin(request) {
            Some(ticket) => {
                let result = source.load(ticket.request());
                self.complete(ticket, result)
            }
            None => false,
        }
    }

    pub fn request(&self) -> Option<&DiffRequest> {
        self.request.as_ref()
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn summary(&self) -> SelectionSummary {
        self.selection.summary()
    }

    pub fn toggle(&mut self, index: usize) -> bool {
        let changed = self.selection.toggle(&self.diff, index);
        self.sync(changed)
    }

    pub fn set(&mut self, index: usize, included: bool) -> bool {
        let changed = self.selection.set(&self.diff, index, included);
        self.sync(changed)
    }

    pub fn toggle_range(&mut self, start: usize, end: usize) -> usize {
        let written = self.selection.toggle_range(&self.diff, start, end);
        self.sync(written > 0);
        written
    }

    pub fn set_range(&mut self, start: usize, end: usize, included: bool) -> usize {
        let written = self.selection.set_range(&self.diff, start, end, included);
        self.sync(written > 0);
        written
    }

    /// Include or exclude everything, keeping flags and selection in step.
    pub fn select_all(&mut self, included: bool) {
        self.diff.set_all(included);
        self.selection.reset(included);
    }

    /// Patch staging exactly the included lines.
    pub fn patch(&self) -> Result<String, PatchError> {
        patch::build_patch(&self.diff, &self.selection)
    }

    fn sync(&mut self, changed: bool) -> bool {
        if changed {
            self.selection.apply_to(&mut self.diff);
        }
        changed
    }
}

impl Default for FileSession {
    fn default() -> Self {
        Self::new(false)
    }
}
