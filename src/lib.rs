pub mod boundary;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod logging;
pub mod navigator;
pub mod rebase;
pub mod runner;
pub mod ui;

pub use error::{GraftError, Result};
pub use git::Git;
pub use navigator::Navigator;
pub use rebase::{Coordinator, RebasePlan, RebaseReport, RebaseRequest};
