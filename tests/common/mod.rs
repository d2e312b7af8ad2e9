//! Fixture repositories built with git2 and driven with the real git binary

#![allow(dead_code)]

use git2::{Commit, Oid, Repository, Signature};
use git_graft::Git;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub const PUBLISH_TAG: &str = "v/master/pub-20160227.2";

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// ```text
/// A -- B -- C            origin/master      A: v/master/0.0.9
///       \                                   B: v/master/0.0.10, tag v/master/pub-20160227.2
///        D               topic (local)
///
/// H -- K -- L            origin/DEV_BRANCH
/// ```
pub struct Fixture {
    _dir: TempDir,
    pub origin: PathBuf,
    pub work: PathBuf,
    pub a: Oid,
    pub b: Oid,
    pub c: Oid,
    pub d: Oid,
    pub h: Oid,
    pub k: Oid,
    pub l: Oid,
}

impl Fixture {
    pub fn git(&self) -> Git {
        Git::open(&self.work)
    }
}

fn signature() -> Signature<'static> {
    Signature::now("Graft Test", "graft@example.com").unwrap()
}

/// Commit `parent`'s tree plus one file, moving `reference` if given
fn commit_file(
    repo: &Repository,
    reference: Option<&str>,
    parent: Option<&Commit>,
    file: &str,
    content: &str,
) -> Oid {
    let base = parent.map(|p| p.tree().unwrap());
    let mut builder = repo.treebuilder(base.as_ref()).unwrap();
    let blob = repo.blob(content.as_bytes()).unwrap();
    builder.insert(file, blob, 0o100644).unwrap();
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let sig = signature();
    let parents: Vec<&Commit> = parent.into_iter().collect();
    repo.commit(reference, &sig, &sig, &format!("Add {}", file), &tree, &parents)
        .unwrap()
}

fn build_origin(path: &Path) -> (Oid, Oid, Oid, Oid, Oid, Oid) {
    let repo = Repository::init_bare(path).unwrap();

    let a = commit_file(&repo, Some("refs/heads/master"), None, "README.md", "a\n");
    let a_commit = repo.find_commit(a).unwrap();
    let b = commit_file(&repo, Some("refs/heads/master"), Some(&a_commit), "b.txt", "b\n");
    let b_commit = repo.find_commit(b).unwrap();
    let c = commit_file(&repo, Some("refs/heads/master"), Some(&b_commit), "c.txt", "c\n");

    let h = commit_file(&repo, Some("refs/heads/DEV_BRANCH"), None, "dev.txt", "h\n");
    let h_commit = repo.find_commit(h).unwrap();
    let k = commit_file(&repo, Some("refs/heads/DEV_BRANCH"), Some(&h_commit), "shared.txt", "dev\n");
    let k_commit = repo.find_commit(k).unwrap();
    let l = commit_file(&repo, Some("refs/heads/DEV_BRANCH"), Some(&k_commit), "l.txt", "l\n");

    repo.reference("refs/heads/v/master/0.0.9", a, true, "release")
        .unwrap();
    repo.reference("refs/heads/v/master/0.0.10", b, true, "release")
        .unwrap();
    repo.tag_lightweight(PUBLISH_TAG, b_commit.as_object(), false)
        .unwrap();
    repo.set_head("refs/heads/master").unwrap();

    (a, b, c, h, k, l)
}

/// Clone the origin and check out `topic` = B + one commit adding `topic_file`
pub fn fixture(topic_file: (&str, &str)) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let origin = dir.path().join("origin.git");
    let work = dir.path().join("work");
    let (a, b, c, h, k, l) = build_origin(&origin);

    Git::open(&work)
        .clone_from(origin.to_str().unwrap(), false, None)
        .unwrap();

    let repo = Repository::open(&work).unwrap();
    let b_commit = repo.find_commit(b).unwrap();
    let d = commit_file(
        &repo,
        Some("refs/heads/topic"),
        Some(&b_commit),
        topic_file.0,
        topic_file.1,
    );

    let d_commit = repo.find_commit(d).unwrap();
    let mut checkout = git2::build::CheckoutBuilder::new();
    checkout.force();
    repo.checkout_tree(d_commit.as_object(), Some(&mut checkout))
        .unwrap();
    repo.set_head("refs/heads/topic").unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("branch.topic.remote", "origin").unwrap();
    config.set_str("branch.topic.merge", "refs/heads/master").unwrap();
    config.set_str("user.name", "Graft Test").unwrap();
    config.set_str("user.email", "graft@example.com").unwrap();

    Fixture {
        _dir: dir,
        origin,
        work,
        a,
        b,
        c,
        d,
        h,
        k,
        l,
    }
}
