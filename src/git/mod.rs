//! Git command gateway and repository handle
//!
//! All repository state lives in git itself. This module only knows how to
//! run git subcommands and turn their text output into typed values.
//!
//! # Overview
//!
//! The primary abstraction is the [GitBackend] trait, the single seam through
//! which every git process is started. The concrete implementations are:
//!
//! - [command::SystemGit]: runs the `git` binary found on `PATH`
//! - [mock::MockGit]: replays scripted output for tests
//!
//! On top of a backend sits [repository::Git], the repository handle, which
//! offers one method per operation the navigator and rebase coordinator need.
//!
//! ```rust,no_run
//! # use git_graft::git::Git;
//! # fn example() -> git_graft::Result<()> {
//! let git = Git::open(".");
//! let branch = git.topic_branch(false)?;
//! let upstream = git.upstream_branch(Some(&branch))?;
//! println!("{} tracks {}", branch, upstream);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod mock;
pub mod repository;

pub use command::SystemGit;
pub use mock::MockGit;
pub use repository::{git_directory, update_gitattributes, Git};

use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// Git subcommands the handle is allowed to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subcommand {
    Branch,
    CatFile,
    Clone,
    Commit,
    Config,
    Describe,
    Diff,
    Fetch,
    FilterBranch,
    ForEachRef,
    Gc,
    Log,
    LsRemote,
    Merge,
    MergeBase,
    Push,
    Rebase,
    Reflog,
    Repack,
    RevList,
    RevParse,
    ShowBranch,
    ShowRef,
    Tag,
    UpdateRef,
}

impl Subcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subcommand::Branch => "branch",
            Subcommand::CatFile => "cat-file",
            Subcommand::Clone => "clone",
            Subcommand::Commit => "commit",
            Subcommand::Config => "config",
            Subcommand::Describe => "describe",
            Subcommand::Diff => "diff",
            Subcommand::Fetch => "fetch",
            Subcommand::FilterBranch => "filter-branch",
            Subcommand::ForEachRef => "for-each-ref",
            Subcommand::Gc => "gc",
            Subcommand::Log => "log",
            Subcommand::LsRemote => "ls-remote",
            Subcommand::Merge => "merge",
            Subcommand::MergeBase => "merge-base",
            Subcommand::Push => "push",
            Subcommand::Rebase => "rebase",
            Subcommand::Reflog => "reflog",
            Subcommand::Repack => "repack",
            Subcommand::RevList => "rev-list",
            Subcommand::RevParse => "rev-parse",
            Subcommand::ShowBranch => "show-branch",
            Subcommand::ShowRef => "show-ref",
            Subcommand::Tag => "tag",
            Subcommand::UpdateRef => "update-ref",
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One git process to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub subcommand: Subcommand,
    pub args: Vec<String>,
    /// Directory the process starts in
    pub cwd: PathBuf,
    /// Extra environment for the process
    pub envs: Vec<(String, String)>,
    /// Log the command line at info level instead of debug
    pub verbose: bool,
}

impl Invocation {
    pub fn new<I, S>(subcommand: Subcommand, args: I, cwd: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            subcommand,
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.as_ref().to_path_buf(),
            envs: Vec::new(),
            verbose: false,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// `subcommand arg1 arg2 ...`, as shown in errors and logs
    pub fn command_line(&self) -> String {
        let mut line = self.subcommand.as_str().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a finished git process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    /// Standard output with trailing whitespace removed
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        CommandOutput {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        CommandOutput {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Everything git printed, for error reports
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Command gateway: starts git processes and captures their output
///
/// Implementations must not interpret exit codes; a non-zero status is
/// returned as a [CommandOutput] so the handle can decide whether it is an
/// error or an expected "nothing found".
///
/// ## Thread Safety
///
/// Implementors are `Send + Sync` so the parallel runner can own one handle
/// per worker. A single working copy must still never be driven from two
/// workers at once.
pub trait GitBackend: Send + Sync {
    /// Run one git process to completion
    ///
    /// # Returns
    /// * `Ok(CommandOutput)` - The process ran, whatever its exit code
    /// * `Err` - git could not be started at all
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

impl<B: GitBackend + ?Sized> GitBackend for &B {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        (**self).execute(invocation)
    }
}

impl<B: GitBackend + ?Sized> GitBackend for std::sync::Arc<B> {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        (**self).execute(invocation)
    }
}
