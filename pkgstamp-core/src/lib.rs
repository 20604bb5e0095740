//! pkgstamp Core - Build manifests from git checkouts
//!
//! This library opens a repository, resolves its HEAD commit and remote,
//! redacts credentials from the remote URL and writes a JSON manifest that
//! a later packaging step can name its artifact after.

pub mod config;
pub mod error;
pub mod git;
pub mod manifest;
pub mod remote;

pub use config::{Config, FieldSet, ManifestSettings, Naming, Profile, Redaction, StampConfig};
pub use error::{ErrorEnvelope, StampError};
pub use git::{GitRepo, RemoteSource, RepoIdentity};
pub use manifest::{stamp, Manifest, RemoteKind, StampOutcome, Timestamp};
pub use remote::{redact, RemoteLocation};

/// Result type alias for pkgstamp operations
pub type Result<T> = std::result::Result<T, StampError>;
