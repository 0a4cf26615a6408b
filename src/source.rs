//! Where diffs come from and where patches go.

use crate::diff::Diff;
use error_set::error_set;
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

error_set! {
    /// Errors from running git
    SourceError := {
        #[display("Failed to run git {command}: {message}")]
        SpawnFailed { command: String, message: String },
        #[display("git {command} failed: {stderr}")]
        ExitError { command: String, stderr: String },
        #[display("Invalid UTF-8 in git output: {message}")]
        InvalidUtf8 { message: String },
        #[display("Failed to get stdin handle for git apply")]
        ApplyStdinFailed,
        #[display("Failed to write patch to git apply: {message}")]
        ApplyWriteFailed { message: String },
        #[display("Could not read the diff git produced for {file}")]
        UnreadableDiff { file: String },
    }
}

/// Identity of a diff: one file, at a commit or in the working tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffRequest {
    pub file: String,
    /// `None` for the working tree against the index
    pub commit: Option<String>,
}

impl DiffRequest {
    /// Unstaged changes of `file`
    pub fn working_tree(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            commit: None,
        }
    }

    /// Changes `commit` made to `file`
    pub fn at_commit(file: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            commit: Some(commit.into()),
        }
    }
}

/// Produces the diff for a request.
///
/// Implementations may be slow (they read file and object content); callers
/// that issue overlapping requests should go through
/// [`FileSession`](crate::FileSession), which drops superseded results.
pub trait DiffSource {
    fn load(&self, request: &DiffRequest) -> Result<Diff, SourceError>;
}

/// Diffs and index updates through the `git` command line
#[derive(Debug, Clone)]
pub struct GitDiffSource {
    repo_path: PathBuf,
    context_lines: u32,
}

impl GitDiffSource {
    /// Use the repository at `repo_path`, with git's default 3 context lines
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            context_lines: 3,
        }
    }

    #[must_use]
    pub fn with_context_lines(mut self, context_lines: u32) -> Self {
        self.context_lines = context_lines;
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Raw unified diff text for a request
    pub fn raw_diff(&self, request: &DiffRequest) -> Result<String, SourceError> {
        let unified = format!("-U{}", self.context_lines);
        let mut args = match &request.commit {
            None => vec!["diff".to_string(), "--no-ext-diff".to_string()],
            Some(commit) => vec![
                "show".to_string(),
                "--format=".to_string(),
                "--no-ext-diff".to_string(),
                commit.clone(),
            ],
        };
        args.extend([
            unified,
            "--no-color".to_string(),
            "--".to_string(),
            request.file.clone(),
        ]);

        let output = self
            .git()
            .args(&args)
            .output()
            .map_err(|e| SourceError::SpawnFailed {
                command: args[0].clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SourceError::ExitError {
                command: args[0].clone(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| SourceError::InvalidUtf8 {
            message: e.to_string(),
        })
    }

    /// Apply a patch to the index
    pub fn apply_cached(&self, patch: &str) -> Result<(), SourceError> {
        let command = "apply".to_string();
        let mut child = self
            .git()
            .args(["apply", "--cached", "--unidiff-zero", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SourceError::SpawnFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        child
            .stdin
            .take()
            .ok_or(SourceError::ApplyStdinFailed)?
            .write_all(patch.as_bytes())
            .map_err(|e| SourceError::ApplyWriteFailed {
                message: e.to_string(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| SourceError::SpawnFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SourceError::ExitError {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }

    fn git(&self) -> Command {
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(&self.repo_path)
            .args(["-c", "core.quotepath=false"]);
        command
    }
}

impl DiffSource for GitDiffSource {
    fn load(&self, request: &DiffRequest) -> Result<Diff, SourceError> {
        let text = self.raw_diff(request)?;
        debug!(
            "git produced {} bytes of diff for {}",
            text.len(),
            request.file
        );

        read_diff(request, &text)
    }
}

/// Turn git's output for `request` into a [`Diff`].
///
/// No output means no changes. Output without a recognisable file header is
/// an error rather than an empty diff.
fn read_diff(request: &DiffRequest, text: &str) -> Result<Diff, SourceError> {
    if text.trim().is_empty() {
        return Ok(Diff::empty(&request.file));
    }

    Diff::parse(text).ok_or_else(|| SourceError::UnreadableDiff {
        file: request.file.clone(),
    })
}
