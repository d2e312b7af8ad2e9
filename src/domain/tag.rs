use crate::domain::version::Version;
use crate::error::{GraftError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Namespace every release and publish marker lives under
pub const MARKER_PREFIX: &str = "v/";

/// Glob matching publish markers of any branch
pub const PUBLISH_GLOB: &str = "v/*/pub-*";

const PUBLISH_LABEL: &str = "pub-";

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^v/(?P<branch>.+)/(?P<label>pub-)?(?P<version>[^/]+)$")
            .expect("marker regex is valid")
    })
}

/// What a marker records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKind {
    /// `v/<branch>/<major>.<minor>`
    Release,
    /// `v/<branch>/pub-<YYYYMMDD>.<seq>`
    Publish,
}

/// A branch-scoped release marker (e.g., "v/master/0.0.10")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseMarker {
    pub branch: String,
    pub kind: MarkerKind,
    pub version: Version,
}

impl ReleaseMarker {
    pub fn release(branch: impl Into<String>, version: Version) -> Self {
        ReleaseMarker {
            branch: branch.into(),
            kind: MarkerKind::Release,
            version,
        }
    }

    pub fn publish(branch: impl Into<String>, version: Version) -> Self {
        ReleaseMarker {
            branch: branch.into(),
            kind: MarkerKind::Publish,
            version,
        }
    }

    /// Parse a marker name without any `refs/...` prefix
    pub fn parse(name: &str) -> Result<Self> {
        let captures = marker_regex().captures(name).ok_or_else(|| {
            GraftError::parse(format!(
                "'{}' is not a v/<branch>/<version> marker",
                name
            ))
        })?;

        let kind = if captures.name("label").is_some() {
            MarkerKind::Publish
        } else {
            MarkerKind::Release
        };

        Ok(ReleaseMarker {
            branch: captures["branch"].to_string(),
            kind,
            version: Version::parse(&captures["version"])?,
        })
    }

    /// Parse a full ref name, dropping the given namespace (e.g., "refs/remotes/origin/")
    pub fn from_ref(refname: &str, namespace: &str) -> Result<Self> {
        let name = refname.strip_prefix(namespace).unwrap_or(refname);
        Self::parse(name)
    }

    /// The marker name as used in git commands
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Ref prefix covering one branch's markers, or all branches when `None`
    pub fn scope(branch: Option<&str>) -> String {
        match branch {
            Some(branch) => format!("{}{}/", MARKER_PREFIX, branch),
            None => MARKER_PREFIX.to_string(),
        }
    }
}

impl Ord for ReleaseMarker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.branch.cmp(&other.branch))
    }
}

impl PartialOrd for ReleaseMarker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            MarkerKind::Release => "",
            MarkerKind::Publish => PUBLISH_LABEL,
        };
        write!(
            f,
            "{}{}/{}{}",
            MARKER_PREFIX, self.branch, label, self.version
        )
    }
}
