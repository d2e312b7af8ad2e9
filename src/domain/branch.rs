use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Branch every remote is assumed to carry
pub const MAINLINE: &str = "master";

/// Generated branches: release markers, publish and build snapshots
fn reserved_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^v/.*|^pub-\d+\.\d+$|^build-\d+\.\d+$").expect("reserved regex is valid")
    })
}

/// True for branch names produced by release tooling rather than people
pub fn is_reserved(name: &str) -> bool {
    reserved_regex().is_match(name)
}

/// Reduce a list of branch names to the structural ones.
///
/// Reserved names are dropped, duplicates collapse and `master` is always
/// part of the result. The output is sorted.
pub fn real_branches<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set: BTreeSet<String> = names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .filter(|name| !name.is_empty() && !is_reserved(name))
        .collect();
    set.insert(MAINLINE.to_string());
    set.into_iter().collect()
}

/// Strip `refs/heads/` from a configured merge target
pub fn short_branch_name(name: &str) -> &str {
    name.strip_prefix("refs/heads/").unwrap_or(name)
}

/// Parse one line of `git branch --remote --list` output into a branch name.
///
/// Lines look like `  origin/master` or `  origin/HEAD -> origin/master`;
/// symbolic entries resolve to their target.
pub fn parse_remote_branch_line<'a>(line: &'a str, remote: &str) -> Option<&'a str> {
    let entry = line.trim_start_matches(['*', ' ']).trim_end();
    let entry = match entry.rsplit_once(" -> ") {
        Some((_, target)) => target,
        None => entry,
    };
    entry
        .strip_prefix(remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|name| !name.is_empty())
}
