//! Manifest building and persistence
//!
//! A [`Manifest`] is gathered in full before anything touches the disk, so a
//! failed run never leaves a partial file behind.

use crate::config::{FieldSet, Naming, StampConfig};
use crate::git::{GitRepo, RemoteSource, RepoIdentity};
use crate::{remote, StampError};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info};

/// Length of the abbreviated commit id
pub const SHORT_SHA_LEN: usize = 7;

/// Prefix used by [`Naming::Archive`]
pub const ARCHIVE_PREFIX: &str = "archive";

/// One wall-clock reading in every rendering the manifest needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub epoch_time: i64,
    /// `2006-01-02 15:04:05 -0700` style, local offset
    pub time_with_zone: String,
    /// RFC 3339, whole seconds
    pub rfc3339: String,
}

impl Timestamp {
    /// Read the clock once, in the local offset (UTC if it cannot be found).
    pub fn now() -> crate::Result<Self> {
        let now = OffsetDateTime::now_utc();
        let offset = UtcOffset::local_offset_at(now).unwrap_or(UtcOffset::UTC);
        Self::from_datetime(now.to_offset(offset))
    }

    pub fn from_datetime(at: OffsetDateTime) -> crate::Result<Self> {
        let at = at.replace_nanosecond(0).unwrap_or(at);
        let time_with_zone = at.format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
        ))?;
        Ok(Self {
            epoch_time: at.unix_timestamp(),
            time_with_zone,
            rfc3339: at.format(&Rfc3339)?,
        })
    }
}

/// First [`SHORT_SHA_LEN`] characters of `sha`.
pub fn short_sha(sha: &str) -> crate::Result<&str> {
    sha.get(..SHORT_SHA_LEN)
        .ok_or_else(|| StampError::ShortSha(sha.to_string()))
}

/// `{prefix}_{epoch}` with an optional `.{extension}`.
///
/// `archive` naming always ends in its fixed extension.
pub fn file_name(naming: Naming, dir_name: &str, epoch: i64, extension: Option<&str>) -> String {
    let prefix = match naming {
        Naming::Dir => dir_name,
        Naming::Archive => ARCHIVE_PREFIX,
    };
    match naming.fixed_extension().or(extension) {
        Some(ext) => format!("{}_{}.{}", prefix, epoch, ext),
        None => format!("{}_{}", prefix, epoch),
    }
}

/// Name of the manifest file written for `epoch`.
pub fn manifest_file_name(epoch: i64) -> String {
    format!("manifest_{}.json", epoch)
}

/// Provenance record for one packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub timestamp: Timestamp,
    pub sha: String,
    pub short_sha: String,
    pub file_name: String,
    /// Redacted remote, `None` for field sets without `Repo`.
    pub repo: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct MinimalView<'a> {
    #[serde(rename = "SHA")]
    sha: &'a str,
    #[serde(rename = "ShortSHA")]
    short_sha: &'a str,
    file_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StandardView<'a> {
    epoch_time: i64,
    time_with_zone: &'a str,
    #[serde(rename = "SHA")]
    sha: &'a str,
    #[serde(rename = "ShortSHA")]
    short_sha: &'a str,
    file_name: &'a str,
    repo: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Rfc3339View<'a> {
    epoch_time: i64,
    time: &'a str,
    #[serde(rename = "SHA")]
    sha: &'a str,
    #[serde(rename = "ShortSHA")]
    short_sha: &'a str,
    file_name: &'a str,
    repo: &'a str,
}

impl Manifest {
    /// Assemble a manifest from already-resolved parts.
    pub fn new(
        timestamp: Timestamp,
        sha: String,
        naming: Naming,
        dir_name: &str,
        extension: Option<&str>,
        repo: Option<String>,
    ) -> crate::Result<Self> {
        let short_sha = short_sha(&sha)?.to_string();
        let file_name = file_name(naming, dir_name, timestamp.epoch_time, extension);
        Ok(Self {
            timestamp,
            sha,
            short_sha,
            file_name,
            repo,
        })
    }

    /// Serialize `fields` with four-space indentation, no trailing newline.
    pub fn to_json(&self, fields: FieldSet) -> crate::Result<String> {
        let repo = self.repo.as_deref().unwrap_or_default();
        match fields {
            FieldSet::Minimal => to_json_indented(&MinimalView {
                sha: &self.sha,
                short_sha: &self.short_sha,
                file_name: &self.file_name,
            }),
            FieldSet::Standard => to_json_indented(&StandardView {
                epoch_time: self.timestamp.epoch_time,
                time_with_zone: &self.timestamp.time_with_zone,
                sha: &self.sha,
                short_sha: &self.short_sha,
                file_name: &self.file_name,
                repo,
            }),
            FieldSet::Rfc3339 => to_json_indented(&Rfc3339View {
                epoch_time: self.timestamp.epoch_time,
                time: &self.timestamp.rfc3339,
                sha: &self.sha,
                short_sha: &self.short_sha,
                file_name: &self.file_name,
                repo,
            }),
        }
    }

    /// Write `manifest_{epoch}.json` into `dir` and return its absolute path.
    ///
    /// The body is followed by exactly one newline. An existing file with
    /// the same name is replaced.
    pub fn write(&self, fields: FieldSet, dir: &Path) -> crate::Result<PathBuf> {
        let body = self.to_json(fields)?;
        let path = std::path::absolute(dir.join(manifest_file_name(self.timestamp.epoch_time)))?;

        let mut file = std::fs::File::create(&path)?;
        file.write_all(body.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;

        info!(path = %path.display(), "wrote manifest");
        Ok(path)
    }
}

fn to_json_indented<T: Serialize>(value: &T) -> crate::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| StampError::Io(std::io::Error::other(e)))
}

/// Everything a run resolved, for echoing back to the user.
#[derive(Debug, Clone)]
pub struct StampOutcome {
    pub identity: RepoIdentity,
    /// Rule that picked the remote, `None` when no remote was resolved.
    pub remote_kind: Option<RemoteKind>,
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
}

/// Which rule chose the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteKind {
    Origin,
    Fallback(String),
    Synthetic,
}

impl From<&RemoteSource> for RemoteKind {
    fn from(source: &RemoteSource) -> Self {
        match source {
            RemoteSource::Origin(_) => Self::Origin,
            RemoteSource::Fallback { name, .. } => Self::Fallback(name.clone()),
            RemoteSource::Synthetic(_) => Self::Synthetic,
        }
    }
}

/// Gather metadata from the repository and build the manifest.
///
/// Nothing is written. `timestamp` is taken by the caller so tests can pin
/// the clock.
pub fn build(
    config: &StampConfig,
    repo: &GitRepo,
    timestamp: Timestamp,
) -> crate::Result<(Manifest, Option<RemoteKind>)> {
    let identity = repo.identity();

    let (redacted, kind) = if config.fields.includes_repo() {
        let source = repo.remote()?;
        let redacted = remote::redact(source.url(), config.redaction)?;
        debug!(remote = %redacted, "resolved remote");
        (Some(redacted), Some(RemoteKind::from(&source)))
    } else {
        (None, None)
    };

    let sha = repo.head_sha()?;
    let manifest = Manifest::new(
        timestamp,
        sha,
        config.naming,
        &identity.dir_name,
        config.extension.as_deref(),
        redacted,
    )?;
    Ok((manifest, kind))
}

/// Open the configured repository, build its manifest and write it.
pub fn stamp(config: &StampConfig) -> crate::Result<StampOutcome> {
    let repo = GitRepo::open(&config.repo_path)?;
    let (manifest, remote_kind) = build(config, &repo, Timestamp::now()?)?;
    let manifest_path = manifest.write(config.fields, &config.output_dir)?;

    Ok(StampOutcome {
        identity: repo.identity().clone(),
        remote_kind,
        manifest,
        manifest_path,
    })
}
