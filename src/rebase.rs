//! Graft-point rebase of a topic branch onto a new upstream point
//!
//! Say `topic` tracks `master` and forked from it at `A`, and should now
//! live on top of `K` on `DEV_BRANCH`:
//!
//! ```text
//! A -- B -- C        master               A -- B -- C        master
//!  \
//!   D -- E -- F      topic       =>                 D -- E -- F   topic
//!                                                  /
//! H -- K -- L        DEV_BRANCH           H -- K -- L        DEV_BRANCH
//! ```
//!
//! The coordinator plans `git rebase --onto K A topic`, runs it, and then
//! records `DEV_BRANCH` as the topic's upstream. Recording the new upstream
//! happens whether or not the rebase went through.

use crate::domain::Revision;
use crate::error::{GraftError, Result};
use crate::git::{Git, GitBackend};
use std::fmt;
use tracing::{debug, info, warn};

/// What the caller asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseRequest {
    /// Upstream branch to move to; the current one when `None`
    pub upstream_branch: Option<String>,
    /// Graft onto this revision instead of the new upstream's tip
    pub revision: Option<String>,
    /// Fetch heads and tags before planning
    pub fetch: bool,
    pub preserve_merges: bool,
    /// Log progress at debug instead of info
    pub silent: bool,
}

impl Default for RebaseRequest {
    fn default() -> Self {
        RebaseRequest {
            upstream_branch: None,
            revision: None,
            fetch: true,
            preserve_merges: true,
            silent: false,
        }
    }
}

/// Resolved inputs of one rebase; computed, executed, discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebasePlan {
    pub topic_branch: String,
    pub old_upstream: String,
    pub new_upstream: String,
    /// Where the topic currently forks from `old_upstream`
    pub old_graft: Revision,
    /// Where the topic should fork from `new_upstream`
    pub new_graft: Revision,
    pub topic_head: Revision,
}

impl RebasePlan {
    /// True when the topic already sits on the new graft point
    pub fn is_noop(&self) -> bool {
        self.topic_head == self.new_graft
    }

    /// True when the topic has commits of its own to replay
    pub fn has_private_commits(&self) -> bool {
        self.topic_head != self.old_graft
    }

    pub fn switches_upstream(&self) -> bool {
        self.new_upstream != self.old_upstream
    }
}

impl fmt::Display for RebasePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}..{} onto {} ({} -> {})",
            self.topic_branch,
            self.old_graft,
            self.topic_head,
            self.new_graft,
            self.old_upstream,
            self.new_upstream
        )
    }
}

/// Result of a finished rebase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseReport {
    pub plan: RebasePlan,
    /// History was rewritten
    pub rewritten: bool,
    /// Tracking configuration now names the new upstream
    pub retargeted: bool,
}

/// Plans and runs graft-point rebases on one repository handle
pub struct Coordinator<'a, B: GitBackend> {
    git: &'a Git<B>,
}

impl<'a, B: GitBackend> Coordinator<'a, B> {
    pub fn new(git: &'a Git<B>) -> Self {
        Coordinator { git }
    }

    fn log(&self, silent: bool, message: fmt::Arguments<'_>) {
        if silent {
            debug!("{}", message);
        } else {
            info!("{}", message);
        }
    }

    fn repo_name(&self) -> String {
        self.git
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.git.path().display().to_string())
    }

    /// Resolve every input of the rebase without touching history
    ///
    /// # Errors
    /// * [GraftError::UnknownTarget] - The new graft point does not resolve
    /// * [GraftError::NoUpstream] - The topic branch tracks nothing
    pub fn plan(&self, request: &RebaseRequest) -> Result<RebasePlan> {
        if request.fetch {
            self.git.fetch(&[])?;
            self.git.fetch_tags()?;
        }

        let old_upstream = self.git.upstream_branch(None)?;
        let new_upstream = request
            .upstream_branch
            .clone()
            .unwrap_or_else(|| old_upstream.clone());

        let target = request.revision.as_deref().unwrap_or("HEAD");
        let Some(new_graft) = self
            .git
            .remote_revision(target, Some(&new_upstream), false)?
        else {
            let unknown = match (&request.revision, &request.upstream_branch) {
                (Some(revision), _) => format!("revision {}", revision),
                (None, Some(branch)) => format!("branch {}", branch),
                (None, None) => format!("branch {}", new_upstream),
            };
            return Err(GraftError::UnknownTarget(unknown));
        };

        let topic_branch = self.git.topic_branch(false)?;
        let topic_head = self.git.resolve_revision(&topic_branch)?;

        let base = self
            .git
            .get_parent(Some(&old_upstream), Some(topic_head.as_str()), false)?
            .ok_or_else(|| {
                GraftError::unknown_revision(format!(
                    "merge-base of {} and {}",
                    topic_head, old_upstream
                ))
            })?;
        let old_graft = self.git.resolve_revision(base.as_str())?;

        Ok(RebasePlan {
            topic_branch,
            old_upstream,
            new_upstream,
            old_graft,
            new_graft,
            topic_head,
        })
    }

    /// Replay the topic's private commits onto the new graft point
    ///
    /// Returns `false` without running git when there is nothing to move.
    pub fn execute(&self, plan: &RebasePlan, request: &RebaseRequest) -> Result<bool> {
        if plan.is_noop() {
            debug!("{} already at {}", plan.topic_branch, plan.new_graft);
            return Ok(false);
        }

        let target = self
            .git
            .dump_revision(plan.new_graft.as_str(), false)
            .unwrap_or_else(|_| plan.new_graft.to_string());
        self.log(
            request.silent,
            format_args!("Rebase {} onto {}", self.repo_name(), target),
        );
        if plan.has_private_commits() {
            self.log(
                request.silent,
                format_args!("Replay commits: <{}>..<{}>", plan.old_graft, plan.topic_head),
            );
        }

        self.git
            .rebase_onto(
                plan.new_graft.as_str(),
                plan.old_graft.as_str(),
                &plan.topic_branch,
                request.preserve_merges,
            )
            .map_err(GraftError::rebase)?;
        Ok(true)
    }

    /// Record the new upstream if it changed; returns whether it did
    pub fn retarget(&self, plan: &RebasePlan, silent: bool) -> Result<bool> {
        if !plan.switches_upstream() {
            return Ok(false);
        }
        self.log(silent, format_args!("Switch to branch {}", plan.new_upstream));
        self.git
            .set_upstream_branch(&plan.topic_branch, &plan.new_upstream)?;
        Ok(true)
    }

    /// Plan, execute and retarget.
    ///
    /// Retargeting runs even when the rebase fails, so the tracked upstream
    /// matches the attempted one; the rebase failure is returned afterwards.
    pub fn rebase(&self, request: &RebaseRequest) -> Result<RebaseReport> {
        let plan = self.plan(request)?;

        let executed = self.execute(&plan, request);
        let retargeted = self.retarget(&plan, request.silent);

        let rewritten = match executed {
            Ok(rewritten) => rewritten,
            Err(e) => {
                if let Err(retarget_error) = retargeted {
                    warn!(
                        "Could not switch {} to {}: {}",
                        plan.topic_branch, plan.new_upstream, retarget_error
                    );
                }
                return Err(e);
            }
        };

        Ok(RebaseReport {
            rewritten,
            retargeted: retargeted?,
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockGit;

    /// topic tracks master, forked at aaa, head at fff; origin/DEV_BRANCH is at kkk
    fn scripted() -> MockGit {
        MockGit::new()
            .ok("rev-parse --abbrev-ref HEAD", "topic")
            .ok("config --get-all branch.topic.remote", "origin")
            .ok("config branch.topic.merge", "refs/heads/master")
            .ok("rev-parse --short --verify --quiet origin/DEV_BRANCH^{commit}", "kkk")
            .ok("rev-parse --short --verify --quiet origin/master^{commit}", "ccc")
            .ok("rev-parse --short --verify --quiet topic^{commit}", "fff")
            .ok("merge-base fff origin/master", "aaa0000000000000")
            .ok("rev-parse --short --verify --quiet aaa0000000000000^{commit}", "aaa")
            .ok("config --replace-all branch.topic.merge DEV_BRANCH", "")
    }

    fn request(upstream: Option<&str>) -> RebaseRequest {
        RebaseRequest {
            upstream_branch: upstream.map(str::to_string),
            fetch: false,
            ..RebaseRequest::default()
        }
    }

    #[test]
    fn test_plan_resolves_graft_points() {
        let git = Git::with_backend("/work/repo", scripted());
        let plan = Coordinator::new(&git)
            .plan(&request(Some("DEV_BRANCH")))
            .unwrap();

        assert_eq!(plan.topic_branch, "topic");
        assert_eq!(plan.old_upstream, "master");
        assert_eq!(plan.new_upstream, "DEV_BRANCH");
        assert_eq!(plan.old_graft, Revision::new("aaa"));
        assert_eq!(plan.new_graft, Revision::new("kkk"));
        assert_eq!(plan.topic_head, Revision::new("fff"));
        assert!(!plan.is_noop());
        assert!(plan.has_private_commits());
        assert!(plan.switches_upstream());
    }

    #[test]
    fn test_plan_fetches_heads_and_tags() {
        let git = Git::with_backend(
            "/work/repo",
            scripted().ok("fetch", "").ok("fetch --tags", ""),
        );
        let req = RebaseRequest {
            upstream_branch: Some("DEV_BRANCH".to_string()),
            ..RebaseRequest::default()
        };
        Coordinator::new(&git).plan(&req).unwrap();

        let calls = git.backend().calls();
        assert_eq!(calls[0], "fetch");
        assert_eq!(calls[1], "fetch --tags");
    }

    #[test]
    fn test_plan_unknown_revision_is_fatal() {
        let git = Git::with_backend("/work/repo", scripted());
        let req = RebaseRequest {
            revision: Some("does-not-exist".to_string()),
            ..request(Some("DEV_BRANCH"))
        };

        let err = Coordinator::new(&git).rebase(&req).unwrap_err();
        assert!(matches!(err, GraftError::UnknownTarget(ref what) if what == "revision does-not-exist"));
        assert!(!git.backend().ran("rebase"));
        assert!(!git.backend().ran("config --replace-all"));
    }

    #[test]
    fn test_plan_unknown_branch_is_fatal() {
        let git = Git::with_backend("/work/repo", scripted());

        let err = Coordinator::new(&git)
            .plan(&request(Some("NO_SUCH_BRANCH")))
            .unwrap_err();
        assert!(matches!(err, GraftError::UnknownTarget(ref what) if what == "branch NO_SUCH_BRANCH"));
    }

    #[test]
    fn test_rebase_runs_and_retargets() {
        let git = Git::with_backend(
            "/work/repo",
            scripted().ok("rebase --rebase-merges --onto kkk aaa topic", ""),
        );

        let report = Coordinator::new(&git)
            .rebase(&request(Some("DEV_BRANCH")))
            .unwrap();
        assert!(report.rewritten);
        assert!(report.retargeted);

        let calls = git.backend().calls();
        let rebase_at = calls.iter().position(|c| c.starts_with("rebase")).unwrap();
        let config_at = calls
            .iter()
            .position(|c| c.starts_with("config --replace-all"))
            .unwrap();
        assert!(rebase_at < config_at);
    }

    #[test]
    fn test_rebase_linear_when_merges_not_preserved() {
        let git = Git::with_backend(
            "/work/repo",
            scripted().ok("rebase --onto kkk aaa topic", ""),
        );
        let req = RebaseRequest {
            preserve_merges: false,
            ..request(Some("DEV_BRANCH"))
        };

        assert!(Coordinator::new(&git).rebase(&req).unwrap().rewritten);
    }

    #[test]
    fn test_noop_still_retargets() {
        // origin/DEV_BRANCH already is the topic head
        let git = Git::with_backend(
            "/work/repo",
            MockGit::new()
                .ok("rev-parse --abbrev-ref HEAD", "topic")
                .ok("config --get-all branch.topic.remote", "origin")
                .ok("config branch.topic.merge", "refs/heads/master")
                .ok("rev-parse --short --verify --quiet origin/DEV_BRANCH^{commit}", "kkk")
                .ok("rev-parse --short --verify --quiet topic^{commit}", "kkk")
                .ok("merge-base kkk origin/master", "aaa0000000000000")
                .ok("rev-parse --short --verify --quiet aaa0000000000000^{commit}", "aaa")
                .ok("config --replace-all branch.topic.merge DEV_BRANCH", ""),
        );

        let report = Coordinator::new(&git)
            .rebase(&request(Some("DEV_BRANCH")))
            .unwrap();
        assert!(report.plan.is_noop());
        assert!(!report.rewritten);
        assert!(report.retargeted);
        assert!(!git.backend().ran("rebase"));
        assert!(git
            .backend()
            .ran("config --replace-all branch.topic.merge DEV_BRANCH"));
    }

    #[test]
    fn test_failed_rebase_still_retargets() {
        let git = Git::with_backend(
            "/work/repo",
            scripted().fail(
                "rebase --rebase-merges --onto kkk aaa topic",
                1,
                "CONFLICT (content): Merge conflict in src/lib.rs",
            ),
        );

        let err = Coordinator::new(&git)
            .rebase(&request(Some("DEV_BRANCH")))
            .unwrap_err();
        assert!(matches!(err, GraftError::Rebase(_)));
        assert_eq!(err.exit_code(), Some(1));
        assert!(git
            .backend()
            .ran("config --replace-all branch.topic.merge DEV_BRANCH"));
    }

    #[test]
    fn test_same_upstream_is_not_retargeted() {
        let git = Git::with_backend(
            "/work/repo",
            MockGit::new()
                .ok("rev-parse --abbrev-ref HEAD", "topic")
                .ok("config --get-all branch.topic.remote", "origin")
                .ok("config branch.topic.merge", "refs/heads/master")
                .ok("rev-parse --short --verify --quiet origin/master^{commit}", "ccc")
                .ok("rev-parse --short --verify --quiet topic^{commit}", "fff")
                .ok("merge-base fff origin/master", "aaa0000000000000")
                .ok("rev-parse --short --verify --quiet aaa0000000000000^{commit}", "aaa")
                .ok("rebase --rebase-merges --onto ccc aaa topic", ""),
        );

        let report = Coordinator::new(&git).rebase(&request(None)).unwrap();
        assert!(report.rewritten);
        assert!(!report.retargeted);
        assert!(!git.backend().ran("config --replace-all"));
    }
}
