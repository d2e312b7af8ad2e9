//! Domain logic - pure value types independent of git process execution

pub mod branch;
pub mod commit;
pub mod revision;
pub mod tag;
pub mod version;

pub use commit::CommitMessage;
pub use revision::Revision;
pub use tag::{MarkerKind, ReleaseMarker};
pub use version::Version;
