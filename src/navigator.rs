//! Structural queries over the revision graph
//!
//! Release markers are refs named `v/<branch>/<version>` that the release
//! tooling pushes to the remote; locally they appear under
//! `refs/remotes/<remote>/`. Git lists refs as opaque strings, so every
//! "first" or "last" marker query re-sorts the matches with [Version]
//! ordering.
//!
//! [Version]: crate::domain::Version

use crate::boundary::BoundaryWarning;
use crate::domain::tag::PUBLISH_GLOB;
use crate::domain::{ReleaseMarker, Revision};
use crate::error::Result;
use crate::git::{Git, GitBackend};
use tracing::{debug, warn};

/// Read-only graph queries on one repository handle
pub struct Navigator<'a, B: GitBackend> {
    git: &'a Git<B>,
}

impl<'a, B: GitBackend> Navigator<'a, B> {
    pub fn new(git: &'a Git<B>) -> Self {
        Navigator { git }
    }

    fn remote_namespace(&self) -> Result<String> {
        Ok(format!("refs/remotes/{}/", self.git.remote()?))
    }

    /// Markers among `refs`, skipping anything that does not parse
    fn parse_markers(refs: &[String], namespace: &str) -> Vec<ReleaseMarker> {
        refs.iter()
            .filter_map(|refname| match ReleaseMarker::from_ref(refname, namespace) {
                Ok(marker) => Some(marker),
                Err(e) => {
                    let warning = BoundaryWarning::UnparsableMarker {
                        marker: refname.clone(),
                        reason: e.to_string(),
                    };
                    debug!("{}", warning);
                    None
                }
            })
            .collect()
    }

    fn markers_at(&self, namespace: &str, branch: Option<&str>, revision: &str) -> Result<Vec<ReleaseMarker>> {
        let pattern = format!("{}{}", namespace, ReleaseMarker::scope(branch));
        let refs = self.git.refs_pointing_at(&pattern, revision)?;
        Ok(Self::parse_markers(&refs, namespace))
    }

    /// Lowest marker pointing exactly at `revision`
    ///
    /// With `branch`, only markers under `v/<branch>/` count; otherwise
    /// markers of every branch do. Answers "which release first shipped
    /// this exact commit".
    pub fn first_release_at_or_after(
        &self,
        revision: &str,
        branch: Option<&str>,
    ) -> Result<Option<ReleaseMarker>> {
        let namespace = self.remote_namespace()?;
        Ok(self
            .markers_at(&namespace, branch, revision)?
            .into_iter()
            .min())
    }

    /// Highest marker on the newest first-parent commit between the tip of
    /// `<remote>/<branch>` and its merge-base with HEAD.
    ///
    /// The walk is bounded: it never looks past the merge-base, so a branch
    /// whose last marker predates the fork point yields `None`. Without a
    /// `branch`, the manifest branch is used.
    pub fn last_release_up_to(
        &self,
        branch: Option<&str>,
        fetch: bool,
    ) -> Result<Option<ReleaseMarker>> {
        let branch = match branch {
            Some(branch) => branch.to_string(),
            None => match self.git.manifest_branch()? {
                Some(branch) => branch,
                None => {
                    debug!("{}", BoundaryWarning::NoManifestBranch);
                    return Ok(None);
                }
            },
        };

        if fetch {
            self.git.fetch(&[])?;
        }

        let remote = self.git.remote()?;
        let namespace = format!("refs/remotes/{}/", remote);
        let remote_branch = format!("{}/{}", remote, branch);

        if self.git.rev(&remote_branch)?.is_none() {
            debug!("{}", BoundaryWarning::MissingRemoteBranch { remote_branch });
            return Ok(None);
        }

        let Some(base) = self.git.merge_base("HEAD", &remote_branch)? else {
            warn!(
                "{}",
                BoundaryWarning::NoMergeBase {
                    head: "HEAD".to_string(),
                    remote_branch,
                }
            );
            return Ok(None);
        };

        let range = format!("{}..{}", base.parent_expr(), remote_branch);
        let candidates = match self.git.rev_list(&range, true) {
            Ok(revisions) if !revisions.is_empty() => revisions,
            Ok(_) => vec![base],
            Err(e) if e.is_command_failure() => {
                debug!(
                    "{}",
                    BoundaryWarning::RangeUnavailable {
                        base: base.to_string(),
                        remote_branch: remote_branch.clone(),
                    }
                );
                vec![base]
            }
            Err(e) => return Err(e),
        };

        for revision in &candidates {
            let markers = self.markers_at(&namespace, Some(&branch), revision.as_str())?;
            if let Some(latest) = markers.into_iter().max() {
                return Ok(Some(latest));
            }
        }
        Ok(None)
    }

    /// Commits on the remote's upstream branch that `base_revision` lacks
    ///
    /// `base_revision` other than `HEAD` names a branch on the same remote.
    /// A missing remote branch answers `None`.
    pub fn upstream_gain(
        &self,
        remote: Option<&str>,
        upstream_branch: Option<&str>,
        base_revision: &str,
        fetch: bool,
    ) -> Result<Option<Vec<Revision>>> {
        let remote = match remote {
            Some(remote) => remote.to_string(),
            None => self.git.remote()?,
        };
        let upstream_branch = match upstream_branch {
            Some(branch) => branch.to_string(),
            None => self.git.upstream_branch(None)?,
        };

        let base = if base_revision == "HEAD" {
            base_revision.to_string()
        } else {
            format!("{}/{}", remote, base_revision)
        };
        let remote_branch = format!("{}/{}", remote, upstream_branch);

        if fetch {
            self.git.fetch(&[])?;
        }

        let Some(upstream_commit) = self.git.rev(&remote_branch)? else {
            debug!("{}", BoundaryWarning::MissingRemoteBranch { remote_branch });
            return Ok(None);
        };

        match self
            .git
            .rev_list(&format!("{}..{}", base, upstream_commit), false)
        {
            Ok(revisions) => Ok(Some(revisions)),
            Err(e) if e.is_command_failure() => {
                debug!("No upstream gain for {}: {}", base, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// First publish marker whose commit contains `revision` (HEAD when `None`)
    pub fn tracks_published(
        &self,
        revision: Option<&str>,
        fetch: bool,
    ) -> Result<Option<ReleaseMarker>> {
        if fetch {
            self.git.fetch(&[])?;
        }

        let revision = self.git.resolve_revision(revision.unwrap_or("HEAD"))?;
        let tags = self.git.tags_containing(revision.as_str(), PUBLISH_GLOB)?;
        Ok(Self::parse_markers(&tags, "").into_iter().next())
    }

    /// True if some remote-tracking branch already contains `revision`
    pub fn is_merged_upstream(&self, revision: &str) -> Result<bool> {
        self.git.commit_is_merged(revision)
    }

    /// Remote branches (without the remote prefix) containing `revision`
    pub fn branches_containing(&self, revision: &str, pattern: &str) -> Result<Vec<String>> {
        self.git.branches_with_revision(revision, pattern, true)
    }
}
