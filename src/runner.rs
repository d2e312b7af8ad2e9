//! Fan one operation out over many working copies
//!
//! Each entry gets its own repository handle; no handle is shared between
//! workers. The first failure raises a shared flag and entries that have not
//! started yet are skipped.

use crate::error::GraftError;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

/// Worker count used when neither config nor command line set one
pub fn default_jobs() -> usize {
    num_cpus::get()
}

/// What happened to one entry
#[derive(Debug)]
pub enum Outcome<T> {
    Done(T),
    Failed(GraftError),
    /// Not started because an earlier entry failed
    Skipped,
}

/// Per-entry outcomes, in input order
#[derive(Debug)]
pub struct RunReport<T> {
    pub outcomes: Vec<Outcome<T>>,
}

impl<T> RunReport<T> {
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Done(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Skipped))
            .count()
    }

    /// Index and error of every failed entry
    pub fn failures(&self) -> Vec<(usize, &GraftError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, o)| match o {
                Outcome::Failed(e) => Some((i, e)),
                _ => None,
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o, Outcome::Done(_)))
    }

    /// Process exit status: 0, the first failed git exit code, or 1
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            return 0;
        }
        self.failures()
            .first()
            .and_then(|(_, e)| e.exit_code())
            .filter(|code| *code > 0)
            .unwrap_or(1)
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Run `f` on every entry with `jobs` workers.
///
/// `jobs == 0` runs in the calling thread. A failed entry stops new entries
/// from starting; entries already running finish.
pub fn for_all<E, T, F>(jobs: usize, entries: &[E], progress: bool, f: F) -> RunReport<T>
where
    E: Sync,
    T: Send,
    F: Fn(&E) -> crate::Result<T> + Sync,
{
    let bar = progress.then(|| {
        let pb = ProgressBar::new(entries.len() as u64);
        pb.set_style(bar_style());
        pb
    });
    let cancelled = AtomicBool::new(false);

    let run_one = |entry: &E| -> Outcome<T> {
        if cancelled.load(Ordering::SeqCst) {
            return Outcome::Skipped;
        }

        let outcome = match f(entry) {
            Ok(value) => Outcome::Done(value),
            Err(e) => {
                cancelled.store(true, Ordering::SeqCst);
                error!("{}", e);
                Outcome::Failed(e)
            }
        };
        if let Some(pb) = &bar {
            pb.inc(1);
        }
        outcome
    };

    let outcomes: Vec<Outcome<T>> = if jobs == 0 {
        entries.iter().map(&run_one).collect()
    } else {
        match ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => {
                debug!("Running {} entries on {} workers", entries.len(), jobs);
                pool.install(|| entries.par_iter().map(&run_one).collect())
            }
            Err(e) => {
                warn!("Cannot start {} workers ({}), running sequentially", jobs, e);
                entries.iter().map(&run_one).collect()
            }
        }
    };

    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
    RunReport { outcomes }
}
