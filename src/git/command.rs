use crate::error::{GraftError, Result};
use crate::git::{CommandOutput, GitBackend, Invocation};
use std::process::Command;
use tracing::{debug, info};

/// Git backend that runs the system `git` binary
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: String,
}

impl SystemGit {
    pub fn new() -> Self {
        SystemGit {
            program: "git".to_string(),
        }
    }

    /// Use a specific git executable instead of the one on `PATH`
    pub fn with_program(program: impl Into<String>) -> Self {
        SystemGit {
            program: program.into(),
        }
    }

    /// Build the process for an invocation
    ///
    /// - Runs in the invocation's working directory
    /// - Keeps ref names unescaped in output
    /// - Never opens an editor or pager
    fn git_cmd(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&invocation.cwd);

        cmd.arg("-c").arg("core.quotePath=false");
        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd.arg("--no-pager");

        cmd.env("GIT_EDITOR", "true");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        for (key, value) in &invocation.envs {
            cmd.env(key, value);
        }

        cmd.arg(invocation.subcommand.as_str());
        cmd.args(&invocation.args);
        cmd
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

impl GitBackend for SystemGit {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let command_line = invocation.command_line();
        if invocation.verbose {
            info!(
                "Running command 'git {}', cwd '{}'",
                command_line,
                invocation.cwd.display()
            );
        } else {
            debug!(cwd = %invocation.cwd.display(), "git {}", command_line);
        }

        let output = self
            .git_cmd(invocation)
            .output()
            .map_err(|source| GraftError::Spawn {
                command: command_line,
                source,
            })?;

        // Killed by a signal when there is no code
        let code = output.status.code().unwrap_or(-1);

        Ok(CommandOutput {
            code,
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        })
    }
}
