use crate::error::Result;
use crate::git::{CommandOutput, GitBackend, Invocation};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Exit code returned for commands nobody scripted
pub const UNSCRIPTED_EXIT: i32 = 128;

/// Mock backend for testing without running git
///
/// Replies are keyed by the command line without the `git` prefix, e.g.
/// `"rev-parse --abbrev-ref HEAD"`. Several replies for one command are
/// consumed in order and the last one repeats. Every invocation is recorded.
#[derive(Default)]
pub struct MockGit {
    replies: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    calls: Mutex<Vec<String>>,
}

impl MockGit {
    /// Create a new mock with no scripted replies
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful reply
    pub fn ok(self, command: &str, stdout: &str) -> Self {
        self.reply(command, CommandOutput::success(stdout))
    }

    /// Script a failing reply
    pub fn fail(self, command: &str, code: i32, output: &str) -> Self {
        self.reply(command, CommandOutput::failure(code, output))
    }

    /// Script an arbitrary reply
    pub fn reply(self, command: &str, output: CommandOutput) -> Self {
        self.lock_replies()
            .entry(command.to_string())
            .or_default()
            .push_back(output);
        self
    }

    /// Command lines run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// True if a command line starting with `prefix` was run
    pub fn ran(&self, prefix: &str) -> bool {
        self.calls().iter().any(|call| call.starts_with(prefix))
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<CommandOutput>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GitBackend for MockGit {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let line = invocation.command_line();
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.clone());

        let mut replies = self.lock_replies();
        let output = match replies.get_mut(&line) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        Ok(output.unwrap_or_else(|| {
            CommandOutput::failure(
                UNSCRIPTED_EXIT,
                format!("fatal: mock has no reply for 'git {}'", line),
            )
        }))
    }
}
