use std::fmt;

/// A resolved commit, held as git's abbreviated hash.
///
/// Symbolic spellings (`HEAD`, branch or tag names) are resolved by the
/// repository handle before they become a `Revision`, so equality here is
/// equality of commits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(String);

impl Revision {
    pub fn new(hash: impl Into<String>) -> Self {
        Revision(hash.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<rev>~`, the first parent expression
    pub fn parent_expr(&self) -> String {
        format!("{}~", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Revision {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split whitespace-separated git output into revisions
pub fn parse_revisions(output: &str) -> Vec<Revision> {
    output.split_whitespace().map(Revision::new).collect()
}
