// tests/graph_test.rs
mod common;

use common::{fixture, git_available, PUBLISH_TAG};
use git_graft::domain::Revision;
use git_graft::git::git_directory;
use git_graft::{Coordinator, GraftError, Navigator, RebaseRequest};

macro_rules! require_git {
    () => {
        if !git_available() {
            eprintln!("git binary not found, skipping");
            return;
        }
    };
}

fn short(git: &git_graft::Git, oid: git2::Oid) -> Revision {
    git.resolve_revision(&oid.to_string()).unwrap()
}

#[test]
fn test_handle_reads_tracking_configuration() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();

    assert!(git.is_repo(true).unwrap());
    assert_eq!(git.topic_branch(false).unwrap(), "topic");
    assert_eq!(git.remote().unwrap(), "origin");
    assert_eq!(git.upstream_branch(None).unwrap(), "master");
    assert_eq!(git.current_revision("HEAD").unwrap(), fx.d.to_string());
    assert!(git.summary().contains("topic branch: topic"));
}

#[test]
fn test_merge_base_and_rev_list() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();

    assert_eq!(
        git.merge_base("HEAD", "origin/master").unwrap(),
        Some(Revision::new(fx.b.to_string()))
    );
    assert_eq!(git.merge_base("HEAD", "origin/DEV_BRANCH").unwrap(), None);

    let range = format!("{}..origin/master", fx.a);
    assert_eq!(
        git.rev_list(&range, true).unwrap(),
        vec![Revision::new(fx.c.to_string()), Revision::new(fx.b.to_string())]
    );
}

#[test]
fn test_unknown_revision() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();

    assert_eq!(git.rev("no-such-thing").unwrap(), None);
    assert!(matches!(
        git.resolve_revision("no-such-thing"),
        Err(GraftError::UnknownRevision(_))
    ));
}

#[test]
fn test_last_release_up_to_merge_base() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();
    let navigator = Navigator::new(&git);

    let marker = navigator
        .last_release_up_to(Some("master"), false)
        .unwrap()
        .unwrap();
    assert_eq!(marker.name(), "v/master/0.0.10");

    assert_eq!(
        navigator
            .last_release_up_to(Some("no-such-branch"), false)
            .unwrap(),
        None
    );

    // no branch given and no manifest checkout
    assert_eq!(navigator.last_release_up_to(None, false).unwrap(), None);
}

#[test]
fn test_first_release_at_exact_revision() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();
    let navigator = Navigator::new(&git);

    let marker = navigator
        .first_release_at_or_after(&fx.a.to_string(), Some("master"))
        .unwrap()
        .unwrap();
    assert_eq!(marker.name(), "v/master/0.0.9");

    assert_eq!(
        navigator
            .first_release_at_or_after(&fx.c.to_string(), None)
            .unwrap(),
        None
    );
}

#[test]
fn test_upstream_gain() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();
    let navigator = Navigator::new(&git);

    assert_eq!(
        navigator.upstream_gain(None, None, "HEAD", false).unwrap(),
        Some(vec![Revision::new(fx.c.to_string())])
    );
    assert_eq!(
        navigator
            .upstream_gain(Some("origin"), Some("no-such-branch"), "HEAD", false)
            .unwrap(),
        None
    );
}

#[test]
fn test_tracks_published() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();
    let navigator = Navigator::new(&git);

    let marker = navigator
        .tracks_published(Some(&fx.a.to_string()), false)
        .unwrap()
        .unwrap();
    assert_eq!(marker.name(), PUBLISH_TAG);

    assert_eq!(
        navigator
            .tracks_published(Some(&fx.c.to_string()), false)
            .unwrap(),
        None
    );
}

#[test]
fn test_merged_upstream() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();
    let navigator = Navigator::new(&git);

    assert!(navigator.is_merged_upstream(&fx.b.to_string()).unwrap());
    assert!(!navigator.is_merged_upstream(&fx.d.to_string()).unwrap());

    let branches = navigator
        .branches_containing(&fx.b.to_string(), "")
        .unwrap();
    assert!(branches.contains(&"master".to_string()));
    assert!(!branches.contains(&"DEV_BRANCH".to_string()));
}

#[test]
fn test_remote_listings() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();

    assert_eq!(
        git.real_branches(Some("origin"), false).unwrap(),
        vec!["DEV_BRANCH", "master"]
    );
    assert_eq!(git.query_remote_tags(false).unwrap(), vec![PUBLISH_TAG]);

    let described = git.dump_revision(&fx.b.to_string(), false).unwrap();
    assert_eq!(described, format!("{} <{}>", PUBLISH_TAG, short(&git, fx.b)));
}

#[test]
fn test_rebase_onto_new_upstream() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();

    let request = RebaseRequest {
        upstream_branch: Some("DEV_BRANCH".to_string()),
        revision: Some(fx.k.to_string()),
        fetch: false,
        ..RebaseRequest::default()
    };
    let report = Coordinator::new(&git).rebase(&request).unwrap();

    assert_eq!(report.plan.old_graft, short(&git, fx.b));
    assert_eq!(report.plan.new_graft, short(&git, fx.k));
    assert!(report.rewritten);
    assert!(report.retargeted);

    assert_eq!(git.rev("topic~").unwrap(), Some(short(&git, fx.k)));
    assert_eq!(git.upstream_branch(Some("topic")).unwrap(), "DEV_BRANCH");
}

#[test]
fn test_failed_rebase_still_switches_upstream() {
    require_git!();
    // shared.txt also exists on DEV_BRANCH with other content
    let fx = fixture(("shared.txt", "topic\n"));
    let git = fx.git();

    let request = RebaseRequest {
        upstream_branch: Some("DEV_BRANCH".to_string()),
        revision: Some(fx.k.to_string()),
        fetch: false,
        ..RebaseRequest::default()
    };
    let err = Coordinator::new(&git).rebase(&request).unwrap_err();

    assert!(matches!(err, GraftError::Rebase(_)));
    assert!(err.exit_code().is_some_and(|code| code != 0));
    assert_eq!(git.upstream_branch(Some("topic")).unwrap(), "DEV_BRANCH");
}

#[test]
fn test_unknown_rebase_target() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();

    let request = RebaseRequest {
        upstream_branch: Some("NO_SUCH_BRANCH".to_string()),
        fetch: false,
        ..RebaseRequest::default()
    };
    let err = Coordinator::new(&git).rebase(&request).unwrap_err();

    assert!(matches!(err, GraftError::UnknownTarget(_)));
    assert_eq!(git.upstream_branch(Some("topic")).unwrap(), "master");
    assert_eq!(git.current_revision("HEAD").unwrap(), fx.d.to_string());
}

#[test]
fn test_rebase_on_current_upstream_tip() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));
    let git = fx.git();

    let request = RebaseRequest {
        fetch: false,
        ..RebaseRequest::default()
    };
    let report = Coordinator::new(&git).rebase(&request).unwrap();

    assert!(report.rewritten);
    assert!(!report.retargeted);
    assert_eq!(git.rev("topic~").unwrap(), Some(short(&git, fx.c)));
}

#[test]
fn test_git_directory_of_file() {
    require_git!();
    let fx = fixture(("d.txt", "d\n"));

    let toplevel = git_directory(fx.work.join("d.txt")).unwrap().unwrap();
    assert_eq!(
        std::fs::canonicalize(toplevel).unwrap(),
        std::fs::canonicalize(&fx.work).unwrap()
    );
}
