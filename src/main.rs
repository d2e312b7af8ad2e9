use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use git_graft::config::{self, Config};
use git_graft::runner::{self, Outcome};
use git_graft::{logging, ui, Coordinator, Git, Navigator, RebaseRequest};

#[derive(Parser)]
#[command(
    name = "git-graft",
    version,
    about = "Track published releases and re-graft topic branches onto new upstreams"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(
        short = 'C',
        long = "repo",
        global = true,
        help = "Working copy to operate on (repeatable, default: current directory)"
    )]
    repos: Vec<PathBuf>,

    #[arg(short, long, global = true, help = "Worker count when several repositories are given")]
    jobs: Option<usize>,

    #[arg(long, global = true, help = "Use already fetched state")]
    no_fetch: bool,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "More logging")]
    verbose: u8,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "Less logging")]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Re-graft the topic branch onto its (new) upstream
    Rebase {
        #[arg(short, long, help = "Upstream branch to move to")]
        upstream: Option<String>,

        #[arg(short, long, help = "Graft onto this revision instead of the upstream tip")]
        revision: Option<String>,

        #[arg(long, help = "Linearize merges instead of preserving them")]
        linear: bool,

        #[arg(long, help = "Report progress at debug level only")]
        silent: bool,

        #[arg(short, long, help = "Skip confirmation prompts")]
        yes: bool,
    },
    /// Last release marker between the remote branch tip and HEAD's fork point
    LastRelease {
        /// Branch whose markers count (default: manifest branch)
        branch: Option<String>,
    },
    /// Lowest release marker on exactly this revision
    FirstRelease {
        revision: String,

        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Upstream commits not yet in the base revision
    Gain {
        #[arg(long)]
        remote: Option<String>,

        #[arg(short, long)]
        upstream: Option<String>,

        #[arg(long, default_value = "HEAD")]
        base: String,
    },
    /// First publish marker containing the revision
    Published { revision: Option<String> },
    /// Structural branches of the remote
    Branches {
        #[arg(long)]
        remote: Option<String>,
    },
    /// Whether a revision already reached a remote branch
    Merged {
        revision: String,

        #[arg(long, default_value = "", help = "Regex the branch names must match")]
        pattern: String,
    },
    /// Markers on a revision followed by its hash
    Describe {
        #[arg(default_value = "HEAD")]
        revision: String,
    },
    /// Topic branch and revision of each working copy
    Status,
    /// Point pushes at the review server and reset fetch refspecs
    Configure {
        #[arg(long)]
        push_url: Option<String>,
    },
}

/// Per-run settings merged from config and command line
struct Settings {
    fetch: bool,
    preserve_merges: bool,
    silent: bool,
    show_commands: bool,
    namespaces: Vec<String>,
}

impl Settings {
    fn new(config: &Config, args: &Args) -> Self {
        Settings {
            fetch: config.fetch.enabled && !args.no_fetch,
            preserve_merges: config.rebase.preserve_merges,
            silent: config.rebase.silent,
            show_commands: config.log.show_commands,
            namespaces: config.fetch.namespaces.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    let verbosity = args.verbose as i8 - args.quiet as i8;
    logging::init(&config.log, verbosity);

    let repos = if args.repos.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.repos.clone()
    };

    if let Command::Rebase {
        upstream: Some(upstream),
        yes: false,
        ..
    } = &args.command
    {
        if console::Term::stdout().is_term()
            && !ui::confirm_action(&format!(
                "Re-graft {} repositories onto {}?",
                repos.len(),
                upstream
            ))?
        {
            println!("Operation cancelled by user.");
            return Ok(());
        }
    }

    let settings = Settings::new(&config, &args);
    let jobs = args
        .jobs
        .or(config.runner.jobs)
        .unwrap_or_else(runner::default_jobs);
    let progress = config.runner.progress && repos.len() > 1;

    let report = runner::for_all(jobs, &repos, progress, |path| {
        run_command(&args.command, path, &settings)
    });

    let several = repos.len() > 1;
    for (path, outcome) in repos.iter().zip(&report.outcomes) {
        let label = several.then_some(path.as_path());
        match outcome {
            Outcome::Done(text) => println!("{}", ui::with_repo(label, text)),
            Outcome::Failed(e) => ui::display_error(&ui::with_repo(label, &e.to_string())),
            Outcome::Skipped => {}
        }
    }

    if several {
        let summary =
            ui::format_run_summary(report.completed(), report.failures().len(), report.skipped());
        if report.is_success() {
            ui::display_success(&summary);
        } else {
            ui::display_status(&summary);
        }
    }

    if !report.is_success() {
        std::process::exit(report.exit_code());
    }
    Ok(())
}

fn run_command(command: &Command, path: &Path, settings: &Settings) -> git_graft::Result<String> {
    let git = Git::open(path).verbose(settings.show_commands);
    let navigator = Navigator::new(&git);

    match command {
        Command::Rebase {
            upstream,
            revision,
            linear,
            silent,
            ..
        } => {
            let request = RebaseRequest {
                upstream_branch: upstream.clone(),
                revision: revision.clone(),
                fetch: settings.fetch,
                preserve_merges: settings.preserve_merges && !linear,
                silent: settings.silent || *silent,
            };
            let report = Coordinator::new(&git).rebase(&request)?;
            Ok(ui::format_rebase_report(&report))
        }
        Command::LastRelease { branch } => {
            let marker = navigator.last_release_up_to(branch.as_deref(), settings.fetch)?;
            Ok(ui::format_marker(marker.as_ref()))
        }
        Command::FirstRelease { revision, branch } => {
            let revision = git.resolve_revision(revision)?;
            let marker = navigator.first_release_at_or_after(revision.as_str(), branch.as_deref())?;
            Ok(ui::format_marker(marker.as_ref()))
        }
        Command::Gain {
            remote,
            upstream,
            base,
        } => {
            let gain = navigator.upstream_gain(
                remote.as_deref(),
                upstream.as_deref(),
                base,
                settings.fetch,
            )?;
            Ok(ui::format_revisions(gain.as_deref()))
        }
        Command::Published { revision } => {
            let marker = navigator.tracks_published(revision.as_deref(), settings.fetch)?;
            Ok(ui::format_marker(marker.as_ref()))
        }
        Command::Branches { remote } => {
            let branches = git.real_branches(remote.as_deref(), settings.fetch)?;
            Ok(ui::format_branches(&branches))
        }
        Command::Merged { revision, pattern } => {
            if !navigator.is_merged_upstream(revision)? {
                return Ok(format!("{} is not merged", revision));
            }
            let branches = navigator.branches_containing(revision, pattern)?;
            Ok(format!(
                "{} is merged into:\n{}",
                revision,
                ui::format_branches(&branches)
            ))
        }
        Command::Describe { revision } => git.dump_revision(revision, settings.fetch),
        Command::Status => Ok(git.summary()),
        Command::Configure { push_url } => {
            let namespaces: Vec<&str> = settings.namespaces.iter().map(String::as_str).collect();
            git.configure_push_and_fetch(push_url.as_deref(), &namespaces)?;
            Ok(format!("{} configured", path.display()))
        }
    }
}
