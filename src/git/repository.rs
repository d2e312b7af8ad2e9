use crate::domain::branch::{self, parse_remote_branch_line, short_branch_name};
use crate::domain::revision::parse_revisions;
use crate::domain::{CommitMessage, Revision};
use crate::error::{GraftError, Result};
use crate::git::{CommandOutput, GitBackend, Invocation, Subcommand, SystemGit};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const GITATTRIBUTES: &str = ".gitattributes";

/// `ls-remote --exit-code` status when no ref matched
const LS_REMOTE_NO_MATCH: i32 = 2;

/// `merge-base` status when the commits share no history
const MERGE_BASE_NONE: i32 = 1;

/// Handle on one working copy
///
/// Binds a path and an optional remote repository location to a command
/// backend. Holds no repository state of its own: every query runs git, so
/// results are as fresh as the last explicit fetch.
///
/// One handle drives one working copy. Handles for different paths may run
/// on different threads.
pub struct Git<B: GitBackend = SystemGit> {
    path: PathBuf,
    remote_repo: Option<String>,
    verbose: bool,
    backend: B,
}

impl Git<SystemGit> {
    /// Open a handle on `path` using the system git binary
    pub fn open(path: impl AsRef<Path>) -> Self {
        Git::with_backend(path, SystemGit::new())
    }
}

impl<B: GitBackend> Git<B> {
    pub fn with_backend(path: impl AsRef<Path>, backend: B) -> Self {
        Git {
            path: path.as_ref().to_path_buf(),
            remote_repo: None,
            verbose: false,
            backend,
        }
    }

    /// Query this repository location instead of the working copy in `ls-remote`
    pub fn with_remote_repo(mut self, remote_repo: impl Into<String>) -> Self {
        self.remote_repo = Some(remote_repo.into());
        self
    }

    /// Log mutating commands at info level
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn invocation(&self, subcommand: Subcommand, args: &[&str]) -> Invocation {
        Invocation::new(subcommand, args.iter().copied(), &self.path)
    }

    fn execute(&self, invocation: Invocation) -> Result<CommandOutput> {
        self.backend.execute(&invocation)
    }

    fn check(invocation: &Invocation, output: CommandOutput) -> Result<String> {
        if output.is_success() {
            Ok(output.stdout)
        } else {
            Err(GraftError::CommandFailed {
                code: output.code,
                command: invocation.command_line(),
                output: output.combined(),
            })
        }
    }

    /// Run a subcommand, failing on a non-zero exit
    pub fn run(&self, subcommand: Subcommand, args: &[&str]) -> Result<String> {
        let invocation = self.invocation(subcommand, args);
        let output = self.execute(invocation.clone())?;
        Self::check(&invocation, output)
    }

    /// Like [Git::run] but logs the command line at info level when verbose
    fn run_loud(&self, subcommand: Subcommand, args: &[&str]) -> Result<String> {
        let mut invocation = self.invocation(subcommand, args);
        invocation.verbose = self.verbose;
        let output = self.execute(invocation.clone())?;
        Self::check(&invocation, output)
    }

    /// Run a subcommand, mapping a non-zero exit to `None`
    ///
    /// Only failure to start git is an error here; best-effort probes use
    /// this instead of matching on [GraftError::CommandFailed].
    pub fn probe(&self, subcommand: Subcommand, args: &[&str]) -> Result<Option<String>> {
        let output = self.execute(self.invocation(subcommand, args))?;
        Ok(output.is_success().then_some(output.stdout))
    }

    fn config_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .probe(Subcommand::Config, &[key])?
            .filter(|value| !value.is_empty()))
    }

    /// Clone `repository` into this handle's path
    pub fn clone_from(
        &self,
        repository: &str,
        bare: bool,
        upstream_branch: Option<&str>,
    ) -> Result<String> {
        let path = self.path.to_string_lossy().into_owned();
        let mut args = vec![repository, path.as_str()];
        if bare {
            args.push("--bare");
        }
        if let Some(branch) = upstream_branch {
            args.push("--branch");
            args.push(branch);
        }

        let mut invocation = Invocation::new(Subcommand::Clone, args, ".");
        invocation.verbose = self.verbose;
        let output = self.execute(invocation.clone())?;
        Self::check(&invocation, output)
    }

    /// True if the path is a working copy or a bare repository
    pub fn is_repo(&self, rev_parse: bool) -> Result<bool> {
        if !self.path.is_dir() {
            return Ok(false);
        }
        if !rev_parse {
            return Ok(true);
        }

        for flag in ["--is-inside-work-tree", "--is-bare-repository"] {
            if self.probe(Subcommand::RevParse, &[flag])?.as_deref() == Some("true") {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// One-line description used by `status`
    pub fn summary(&self) -> String {
        match self.is_repo(true) {
            Ok(true) => {
                let branch = self
                    .topic_branch(false)
                    .unwrap_or_else(|_| "HEAD".to_string());
                let revision = self
                    .rev("HEAD")
                    .ok()
                    .flatten()
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                format!(
                    "git repo: path: {} topic branch: {} revision: {}",
                    self.path.display(),
                    branch,
                    revision
                )
            }
            _ => format!("Not a git repo: path: {}", self.path.display()),
        }
    }

    /// Location of a file inside the git directory (handles worktrees)
    pub fn git_path(&self, name: &str) -> Result<PathBuf> {
        let relative = self.run(Subcommand::RevParse, &["--git-path", name])?;
        Ok(self.path.join(relative))
    }

    /// `git fetch <args>`; a network round-trip
    pub fn fetch(&self, args: &[&str]) -> Result<()> {
        self.run_loud(Subcommand::Fetch, args)?;
        Ok(())
    }

    pub fn fetch_tags(&self) -> Result<()> {
        self.fetch(&["--tags"])
    }

    /// The checked-out branch.
    ///
    /// With `try_rebase_merge_dir`, a detached HEAD in the middle of a
    /// rebase reports the branch being rebased.
    pub fn topic_branch(&self, try_rebase_merge_dir: bool) -> Result<String> {
        let branch = self.run(Subcommand::RevParse, &["--abbrev-ref", "HEAD"])?;
        if branch != "HEAD" {
            return Ok(branch);
        }

        if try_rebase_merge_dir {
            if let Some(name) = self.rebase_head_name()? {
                return Ok(name);
            }
        }

        Err(GraftError::DetachedHead(self.path.clone()))
    }

    fn rebase_head_name(&self) -> Result<Option<String>> {
        let Some(relative) = self.probe(Subcommand::RevParse, &["--git-path", "rebase-merge"])?
        else {
            return Ok(None);
        };
        let head_name = self.path.join(relative).join("head-name");
        match fs::read_to_string(&head_name) {
            Ok(content) => Ok(Some(short_branch_name(content.trim_end()).to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No rebase in progress: {} is missing", head_name.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full hash of `reference`
    pub fn current_revision(&self, reference: &str) -> Result<String> {
        self.run(Subcommand::RevParse, &[reference])
    }

    /// Upstream branch recorded in `branch.<name>.merge`, without `refs/heads/`
    pub fn upstream_branch(&self, branch: Option<&str>) -> Result<String> {
        let topic = match branch {
            Some(branch) => branch.to_string(),
            None => self.topic_branch(false)?,
        };

        match self.config_get(&format!("branch.{}.merge", topic))? {
            Some(upstream) => Ok(short_branch_name(&upstream).to_string()),
            None => {
                error!(
                    "No upstream branch for topic {}, are you in the middle of rebase?",
                    topic
                );
                Err(GraftError::NoUpstream(topic))
            }
        }
    }

    /// Record `name` as the upstream of `branch`
    pub fn set_upstream_branch(&self, branch: &str, name: &str) -> Result<()> {
        let key = format!("branch.{}.merge", branch);
        self.run_loud(Subcommand::Config, &["--replace-all", &key, name])?;
        Ok(())
    }

    /// First remote configured for the topic branch
    pub fn remote(&self) -> Result<String> {
        let topic = self.topic_branch(false)?;
        let key = format!("branch.{}.remote", topic);
        self.probe(Subcommand::Config, &["--get-all", &key])?
            .and_then(|all| all.split_whitespace().next().map(str::to_string))
            .ok_or(GraftError::NoRemote(topic))
    }

    /// True if the branch exists, locally or under `remotes/<remote>/`
    pub fn branch_exists(&self, branch_name: &str, remote: Option<&str>) -> Result<bool> {
        let name = match remote {
            Some(remote) => format!("remotes/{}/{}", remote, branch_name),
            None => branch_name.to_string(),
        };
        Ok(self.probe(Subcommand::ShowBranch, &[&name])?.is_some())
    }

    /// Delete a branch locally or on the remote; missing branches are ignored
    pub fn delete_branch(&self, branch_name: &str, remote: Option<&str>) -> Result<()> {
        if !self.branch_exists(branch_name, remote)? {
            return Ok(());
        }

        match remote {
            Some(remote) => {
                let refspec = format!(":refs/heads/{}", branch_name);
                self.run_loud(Subcommand::Push, &[remote, &refspec])?;
            }
            None => {
                self.run_loud(Subcommand::Branch, &["-d", branch_name])?;
            }
        }
        Ok(())
    }

    /// Create a branch at HEAD, optionally push it and track it
    pub fn create_branch(
        &self,
        branch: &str,
        force: bool,
        push: bool,
        set_as_upstream: bool,
    ) -> Result<()> {
        let remote = self.remote()?;

        let mut args = Vec::new();
        if force {
            args.push("-f");
        }
        args.push(branch);
        self.run_loud(Subcommand::Branch, &args)?;

        if push {
            debug!("Creating branch {} in {}", branch, remote);
            let refspec = format!("{}:{}", branch, branch);
            self.run_loud(Subcommand::Push, &[&remote, &refspec])?;
        } else {
            debug!("Skip pushing branch {} to {}", branch, remote);
        }

        if set_as_upstream {
            let topic = self.topic_branch(false)?;
            self.set_upstream_branch(&topic, branch)?;
        }
        Ok(())
    }

    /// Tag HEAD and optionally push the tag
    pub fn tag_repo(&self, tag: &str, push: bool) -> Result<()> {
        self.run_loud(Subcommand::Tag, &[tag])?;
        if push {
            let remote = self.remote()?;
            self.run_loud(Subcommand::Push, &[&remote, tag])?;
        }
        Ok(())
    }

    /// Branch name the manifest tool records under `refs/remotes/m/`
    pub fn manifest_branch(&self) -> Result<Option<String>> {
        let output = self.probe(Subcommand::LsRemote, &[".", "refs/remotes/m/*"])?;
        Ok(output.and_then(|out| {
            out.lines()
                .next()
                .and_then(|line| line.split('\t').nth(1))
                .and_then(|refname| refname.strip_prefix("refs/remotes/m/"))
                .map(str::to_string)
        }))
    }

    /// Tag names from `ls-remote`, distinguishing "none" from failure.
    ///
    /// An empty list means the remote has no tags; an error means git
    /// itself failed.
    pub fn query_remote_tags(&self, fetch: bool) -> Result<Vec<String>> {
        if fetch {
            self.fetch(&[])?;
        }

        let repository = self.remote_repo.as_deref().unwrap_or(".");
        let invocation = self.invocation(
            Subcommand::LsRemote,
            &["--exit-code", repository, "refs/tags/*"],
        );
        let output = self.execute(invocation.clone())?;
        if output.code == LS_REMOTE_NO_MATCH {
            return Ok(Vec::new());
        }
        let stdout = Self::check(&invocation, output)?;

        let mut tags: Vec<String> = stdout
            .lines()
            .filter_map(|line| line.split('\t').nth(1))
            .filter_map(|refname| refname.strip_prefix("refs/tags/"))
            .map(|tag| tag.trim_end_matches("^{}").to_string())
            .collect();
        tags.dedup();
        Ok(tags)
    }

    /// Remote tag names matching `pattern`; any failure reads as "no tags"
    pub fn remote_tags(&self, pattern: Option<&Regex>, fetch: bool) -> Vec<String> {
        match self.query_remote_tags(fetch) {
            Ok(tags) => tags
                .into_iter()
                .filter(|tag| pattern.map_or(true, |re| re.is_match(tag)))
                .collect(),
            Err(e) => {
                warn!("Listing remote tags in {} failed: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Most recent tag reachable from the upstream branch
    pub fn latest_tag(&self, fetch: bool) -> Result<String> {
        if fetch {
            self.fetch_tags()?;
        }
        let upstream = self.upstream_branch(None)?;
        self.run(Subcommand::Describe, &["--tags", "--abbrev=0", &upstream])
    }

    /// Branch names on the remote matching `pattern` (`ls-remote --heads`)
    pub fn remote_heads(
        &self,
        pattern: Option<&str>,
        remote: Option<&str>,
        fetch: bool,
    ) -> Result<Vec<String>> {
        let remote = match remote {
            Some(remote) => remote.to_string(),
            None => self.remote()?,
        };
        if fetch {
            self.fetch(&[&remote])?;
        }

        let repository = self.remote_repo.clone().unwrap_or_else(|| remote.clone());
        let mut args = vec!["--heads", repository.as_str()];
        if let Some(pattern) = pattern {
            args.push(pattern);
        }
        let output = self.run(Subcommand::LsRemote, &args)?;

        Ok(output
            .lines()
            .filter_map(|line| line.split('\t').nth(1))
            .filter_map(|refname| refname.strip_prefix("refs/heads/"))
            .map(str::to_string)
            .collect())
    }

    /// Structural branches of a remote: generated names removed, `master` kept
    pub fn real_branches(&self, remote: Option<&str>, fetch: bool) -> Result<Vec<String>> {
        let remote = match remote {
            Some(remote) => remote.to_string(),
            None => self.remote()?,
        };
        if fetch {
            self.fetch(&[&remote])?;
        }

        let list_pattern = format!("{}/*", remote);
        let output = self.run(
            Subcommand::Branch,
            &["--remote", "--list", &list_pattern, "--no-color"],
        )?;

        Ok(branch::real_branches(
            output
                .lines()
                .filter_map(|line| parse_remote_branch_line(line, &remote)),
        ))
    }

    /// Remote-tracking branches whose history contains `revision`
    ///
    /// `pattern` is a regular expression applied to the branch name.
    pub fn branches_with_revision(
        &self,
        revision: &str,
        pattern: &str,
        strip_remote: bool,
    ) -> Result<Vec<String>> {
        let Some(output) = self.probe(
            Subcommand::Branch,
            &["--contains", revision, "--all", "--list", "--no-color"],
        )?
        else {
            return Ok(Vec::new());
        };

        let remote_str = format!("remotes/{}/", self.remote()?);
        let regex = Regex::new(&format!(r"^{}{}\S*$", regex::escape(&remote_str), pattern))
            .map_err(|e| GraftError::config(format!("Invalid branch pattern '{}': {}", pattern, e)))?;

        Ok(output
            .lines()
            .map(|line| line.get(2..).unwrap_or_default())
            .filter(|name| regex.is_match(name))
            .map(|name| {
                if strip_remote {
                    name.replacen(&remote_str, "", 1)
                } else {
                    name.to_string()
                }
            })
            .collect())
    }

    /// True if any remote-tracking branch contains `revision`
    ///
    /// Commits that only live in review namespaces (`refs/changes/*`) are
    /// not under `refs/remotes` and therefore count as unmerged.
    pub fn commit_is_merged(&self, revision: &str) -> Result<bool> {
        let output = self.probe(
            Subcommand::Branch,
            &["--contains", revision, "--remote", "--list", "--no-color"],
        )?;
        Ok(output.is_some_and(|out| !out.trim().is_empty()))
    }

    /// Short hash of the commit `revision` names, or `None` if it names nothing
    pub fn rev(&self, revision: &str) -> Result<Option<Revision>> {
        let peeled = format!("{}^{{commit}}", revision);
        Ok(self
            .probe(
                Subcommand::RevParse,
                &["--short", "--verify", "--quiet", &peeled],
            )?
            .filter(|hash| !hash.is_empty())
            .map(Revision::new))
    }

    /// Like [Git::rev] but an unresolvable expression is an error
    pub fn resolve_revision(&self, revision: &str) -> Result<Revision> {
        self.rev(revision)?
            .ok_or_else(|| GraftError::unknown_revision(revision))
    }

    /// Resolve a revision on the upstream's remote-tracking branch.
    ///
    /// `HEAD`-relative expressions (`HEAD`, `HEAD~2`) are rewritten onto
    /// `<remote>/<upstream>`; anything else resolves as given.
    pub fn remote_revision(
        &self,
        revision: &str,
        upstream_branch: Option<&str>,
        fetch: bool,
    ) -> Result<Option<Revision>> {
        if fetch {
            self.fetch(&[])?;
        }

        let revision = if revision.starts_with("HEAD") {
            let upstream = match upstream_branch {
                Some(branch) => branch.to_string(),
                None => self.upstream_branch(None)?,
            };
            let remote_branch = format!("{}/{}", self.remote()?, upstream);
            revision.replacen("HEAD", &remote_branch, 1)
        } else {
            revision.to_string()
        };

        self.rev(&revision)
    }

    /// Full hash of `<remote>/<branch>`
    pub fn fast_remote_revision(&self, remote: &str, branch: &str, fetch: bool) -> Result<String> {
        if fetch {
            self.fetch(&[])?;
        }
        self.run(Subcommand::RevParse, &[&format!("{}/{}", remote, branch)])
    }

    /// Tip of the upstream's remote-tracking branch
    pub fn latest_revision(
        &self,
        upstream_branch: Option<&str>,
        fetch: bool,
    ) -> Result<Option<Revision>> {
        self.remote_revision("HEAD", upstream_branch, fetch)
    }

    /// Nearest common ancestor, or `None` if the histories are unrelated
    pub fn merge_base(&self, a: &str, b: &str) -> Result<Option<Revision>> {
        let invocation = self.invocation(Subcommand::MergeBase, &[a, b]);
        let output = self.execute(invocation.clone())?;
        if output.code == MERGE_BASE_NONE && output.stdout.is_empty() {
            return Ok(None);
        }
        Ok(Some(Revision::new(Self::check(&invocation, output)?)))
    }

    /// Commits in `range`, newest first
    pub fn rev_list(&self, range: &str, first_parent: bool) -> Result<Vec<Revision>> {
        let mut args = Vec::new();
        if first_parent {
            args.push("--first-parent");
        }
        args.push(range);
        Ok(parse_revisions(&self.run(Subcommand::RevList, &args)?))
    }

    /// Full names of refs matching `pattern` that point exactly at `revision`
    pub fn refs_pointing_at(&self, pattern: &str, revision: &str) -> Result<Vec<String>> {
        let output = self.run(
            Subcommand::ForEachRef,
            &["--points-at", revision, "--format=%(refname)", pattern],
        )?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Tags whose commit contains `revision`, filtered by a glob
    pub fn tags_containing(&self, revision: &str, glob: &str) -> Result<Vec<String>> {
        let output = self.run(Subcommand::Tag, &["-l", "--contains", revision, glob])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Where HEAD (or `revision`) forked from the upstream's remote branch
    pub fn get_parent(
        &self,
        upstream_branch: Option<&str>,
        revision: Option<&str>,
        fetch: bool,
    ) -> Result<Option<Revision>> {
        if fetch {
            self.fetch(&[])?;
        }

        let branch = match upstream_branch {
            Some(branch) => branch.to_string(),
            None => self.upstream_branch(None)?,
        };
        let remote_branch = format!("{}/{}", self.remote()?, branch);
        self.merge_base(revision.unwrap_or("HEAD"), &remote_branch)
    }

    /// Tags on `revision` followed by its hash, e.g. `v/master/pub-20160227.2 <7767d28>`
    pub fn dump_revision(&self, revision: &str, fetch: bool) -> Result<String> {
        if fetch {
            self.fetch(&[])?;
        }

        let abbrev = self.resolve_revision(revision)?;
        let tags = self.run(Subcommand::Tag, &["--points-at", abbrev.as_str()])?;

        let mut output = String::new();
        for tag in tags.lines().rev().filter(|t| !t.is_empty()) {
            output.push_str(tag);
            output.push(' ');
        }
        output.push_str(&format!("<{}>", abbrev));
        Ok(output)
    }

    /// Lines of `git diff HEAD`, or `None` if git could not produce a diff
    pub fn uncommitted_changes(&self) -> Result<Option<Vec<String>>> {
        Ok(self
            .probe(Subcommand::Diff, &["HEAD"])?
            .map(|out| out.lines().map(str::to_string).collect()))
    }

    /// First-parent commits on HEAD that the upstream does not have yet
    pub fn committed_changes(&self, reverse: bool, fetch: bool) -> Result<Vec<Revision>> {
        let latest = self
            .latest_revision(None, fetch)?
            .ok_or_else(|| GraftError::unknown_revision("upstream HEAD"))?;
        let range = format!("{}..HEAD", latest);

        let mut args = vec!["--first-parent"];
        if reverse {
            args.push("--reverse");
        }
        args.push(&range);
        Ok(parse_revisions(&self.run(Subcommand::RevList, &args)?))
    }

    /// True if `fname` has added, copied, modified or renamed content
    pub fn file_is_dirty(&self, fname: &str) -> Result<bool> {
        let unstaged = self.run(
            Subcommand::Diff,
            &["--diff-filter=ACMR", "--name-only", fname],
        )?;
        if unstaged == fname {
            return Ok(true);
        }
        let staged = self.run(
            Subcommand::Diff,
            &["--diff-filter=ACMR", "--name-only", "--cached", fname],
        )?;
        Ok(staged == fname)
    }

    /// Author emails of the commits conflicting on `fname` during a merge
    pub fn conflicting_commits_authors(&self, fname: &str) -> Result<Vec<String>> {
        let output = self.run(Subcommand::Log, &["--merge", "--pretty=%ae", fname])?;
        Ok(output.lines().map(str::to_string).collect())
    }

    /// Content of `MERGE_HEAD` while a merge is in progress
    pub fn merge_head(&self) -> Result<Option<String>> {
        let Some(relative) = self.probe(Subcommand::RevParse, &["--git-path", "MERGE_HEAD"])?
        else {
            return Ok(None);
        };
        match fs::read_to_string(self.path.join(relative)) {
            Ok(content) => Ok(Some(content.trim_end().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// `git rebase --onto <new_graft> <old_graft> <branch>`
    pub fn rebase_onto(
        &self,
        new_graft: &str,
        old_graft: &str,
        branch: &str,
        preserve_merges: bool,
    ) -> Result<()> {
        let mut args = Vec::new();
        if preserve_merges {
            args.push("--rebase-merges");
        }
        args.extend(["--onto", new_graft, old_graft, branch]);
        self.run_loud(Subcommand::Rebase, &args)?;
        Ok(())
    }

    /// `merge --no-ff` for review upload.
    ///
    /// When a merge commit was created without a `Change-Id:` trailer it is
    /// amended so the commit-msg hook can add one.
    pub fn merge_for_upload(&self, args: &[&str]) -> Result<()> {
        let current_head = self.current_revision("HEAD")?;

        let mut merge_args = vec!["--no-ff"];
        merge_args.extend_from_slice(args);
        self.run_loud(Subcommand::Merge, &merge_args)?;

        let new_head = self.current_revision("HEAD")?;
        if new_head == current_head {
            return Ok(());
        }

        let message = CommitMessage::parse(&self.run(Subcommand::Log, &["-1", "--format=%B", "HEAD"])?);
        if message.change_id.is_none() {
            debug!("Merge commit {} has no Change-Id, amending", new_head);
            let text = message.text();
            self.run_loud(
                Subcommand::Commit,
                &["--amend", "--reset-author", "-m", &text],
            )?;
        }
        Ok(())
    }

    /// Point the remote's push URL at the review server and reset fetch refspecs
    ///
    /// Without an explicit URL, `remote.<r>.review` and
    /// `remote.<r>.projectname` are combined when both are set. Besides
    /// heads and notes, refs under each of `extra_namespaces` are mirrored.
    pub fn configure_push_and_fetch(
        &self,
        push_url: Option<&str>,
        extra_namespaces: &[&str],
    ) -> Result<()> {
        let remote = self.remote()?;

        let push_url = match push_url {
            Some(url) => Some(url.to_string()),
            None => {
                let review = self.config_get(&format!("remote.{}.review", remote))?;
                let project = self.config_get(&format!("remote.{}.projectname", remote))?;
                review
                    .zip(project)
                    .map(|(review, project)| format!("{}/{}", review, project))
            }
        };

        let pushurl_key = format!("remote.{}.pushurl", remote);
        self.probe(Subcommand::Config, &["--unset", &pushurl_key])?;
        if let Some(url) = push_url.as_deref() {
            self.run(Subcommand::Config, &[&pushurl_key, url])?;
        }

        debug!("Setup refspec to fetch the notes and extra references ...");
        let fetch_key = format!("remote.{}.fetch", remote);
        self.probe(Subcommand::Config, &["--unset-all", &fetch_key])?;

        let mut refspecs = vec![
            format!("+refs/heads/*:refs/remotes/{}/*", remote),
            "+refs/notes/*:refs/notes/*".to_string(),
        ];
        refspecs.extend(
            extra_namespaces
                .iter()
                .map(|ns| format!("+refs/{ns}/*:refs/{ns}/*", ns = ns)),
        );
        for refspec in &refspecs {
            self.run(Subcommand::Config, &["--add", &fetch_key, refspec])?;
        }
        Ok(())
    }

    /// Rewrite history so `subdir` becomes the repository root, then compact
    ///
    /// Refs filter-branch left unchanged are deleted, except the one
    /// tracking the topic branch, which gc and repack still need.
    pub fn extract_path(&self, subdir: &str) -> Result<()> {
        info!("Extracting {}, this can take a while", subdir);

        let mut invocation = self.invocation(
            Subcommand::FilterBranch,
            &[
                "--tag-name-filter",
                "cat",
                "--subdirectory-filter",
                subdir,
                "--",
                "--all",
            ],
        );
        invocation = invocation.env("FILTER_BRANCH_SQUELCH_WARNING", "1");
        invocation.verbose = self.verbose;
        let output = self.execute(invocation.clone())?;
        let combined = output.combined();
        Self::check(&invocation, output)?;

        let remote_head_ref = format!(
            "refs/remotes/{}/{}",
            self.remote()?,
            self.topic_branch(false)?
        );
        for reference in unchanged_refs(&combined) {
            if reference == remote_head_ref {
                debug!("Will not remove {}", remote_head_ref);
                continue;
            }
            self.run(Subcommand::UpdateRef, &["-d", reference])?;
        }

        let original = self.git_path("refs/original")?;
        if let Err(e) = fs::remove_dir_all(&original) {
            debug!("Leaving {}: {}", original.display(), e);
        }

        self.run_loud(
            Subcommand::Reflog,
            &["expire", "--verbose", "--expire=0", "--all"],
        )?;
        self.run_loud(Subcommand::Gc, &["--prune=0"])?;
        self.run_loud(Subcommand::Repack, &["-ad"])?;
        Ok(())
    }

    /// True if `path` exists in the upstream's latest revision
    pub fn path_exists(&self, path: &str, branch: Option<&str>, fetch: bool) -> Result<bool> {
        let Some(revision) = self.latest_revision(branch, fetch)? else {
            return Ok(false);
        };
        let object = format!("{}:{}", revision, path);
        Ok(self.probe(Subcommand::CatFile, &["-e", &object])?.is_some())
    }
}

/// Refs reported as `WARNING: Ref '<ref>' is unchanged` by filter-branch
fn unchanged_refs(output: &str) -> Vec<&str> {
    const START: &str = "WARNING: Ref '";
    const END: &str = "' is unchanged";
    output
        .lines()
        .filter_map(|line| line.strip_prefix(START)?.strip_suffix(END))
        .collect()
}

/// Top level of the working copy containing `path`
pub fn git_directory(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let mut realpath = fs::canonicalize(path.as_ref())?;
    if realpath.is_file() {
        if let Some(parent) = realpath.parent() {
            realpath = parent.to_path_buf();
        }
    }

    let git = Git::open(&realpath);
    match git.run(Subcommand::RevParse, &["--show-toplevel"]) {
        Ok(toplevel) => Ok(Some(PathBuf::from(toplevel))),
        Err(e) if e.is_command_failure() => {
            warn!(
                "Failed git rev-parse --show-toplevel in {}: {}",
                realpath.display(),
                e
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Append `<pattern> <attribute>` to `.gitattributes` unless already present
///
/// # Returns
/// * `Ok(true)` - The line was added
/// * `Ok(false)` - An equivalent line already exists
pub fn update_gitattributes(path: impl AsRef<Path>, pattern: &str, attribute: &str) -> Result<bool> {
    let gitattributes = path.as_ref().join(GITATTRIBUTES);
    let existing = match fs::read_to_string(&gitattributes) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let line_regex = Regex::new(&format!(
        r"^{}\s+{}\s*$",
        regex::escape(pattern),
        regex::escape(attribute)
    ))
    .map_err(|e| GraftError::config(format!("Invalid attribute pattern: {}", e)))?;
    if existing.lines().any(|line| line_regex.is_match(line)) {
        return Ok(false);
    }

    debug!("Updating {}", gitattributes.display());
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&gitattributes)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{} {}", pattern, attribute)?;
    Ok(true)
}
