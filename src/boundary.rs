use std::fmt;

/// Non-fatal conditions met while walking the revision graph.
/// These end a query with an empty answer and are reported, not raised.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// A ref under the marker namespace that is not a valid marker
    UnparsableMarker { marker: String, reason: String },
    /// HEAD and the remote branch share no history
    NoMergeBase { head: String, remote_branch: String },
    /// The range from the merge-base to the tip could not be listed
    RangeUnavailable { base: String, remote_branch: String },
    /// The remote-tracking branch does not exist
    MissingRemoteBranch { remote_branch: String },
    /// No manifest branch to default to
    NoManifestBranch,
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::UnparsableMarker { marker, reason } => {
                write!(f, "Skipping marker '{}': {}", marker, reason)
            }
            BoundaryWarning::NoMergeBase {
                head,
                remote_branch,
            } => {
                let short_head = head.get(..7).unwrap_or(head);
                write!(
                    f,
                    "No common ancestor between {} and {}",
                    short_head, remote_branch
                )
            }
            BoundaryWarning::RangeUnavailable {
                base,
                remote_branch,
            } => {
                write!(
                    f,
                    "Cannot list {}~..{}, only the merge-base is checked",
                    base, remote_branch
                )
            }
            BoundaryWarning::MissingRemoteBranch { remote_branch } => {
                write!(f, "Remote branch '{}' does not exist", remote_branch)
            }
            BoundaryWarning::NoManifestBranch => {
                write!(f, "No branch given and no manifest branch under refs/remotes/m")
            }
        }
    }
}
