//! Read-only repository queries: identity, remote and HEAD.

use crate::StampError;
use git2::{ErrorCode, Repository};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Absolute location and directory name of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    /// Absolute path, symlinks left unresolved.
    pub abs_path: PathBuf,
    /// Last component of `abs_path`.
    pub dir_name: String,
}

impl RepoIdentity {
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let abs_path = std::path::absolute(path)?;
        let dir_name = match abs_path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            // `..` and `/` have no file name of their own
            None => std::fs::canonicalize(&abs_path)?
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    StampError::Configuration(format!(
                        "cannot derive a directory name from {}",
                        abs_path.display()
                    ))
                })?,
        };
        Ok(Self { abs_path, dir_name })
    }
}

/// Where the remote string for the manifest came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSource {
    /// First URL of the remote named `origin`.
    Origin(String),
    /// No `origin`; first URL of the first listed remote.
    Fallback { name: String, url: String },
    /// No remotes at all; the repository directory name.
    Synthetic(String),
}

impl RemoteSource {
    pub fn url(&self) -> &str {
        match self {
            Self::Origin(url) | Self::Synthetic(url) => url,
            Self::Fallback { url, .. } => url,
        }
    }
}

/// Pick the manifest remote from `(name, url)` pairs in listing order.
///
/// `origin` wins. Otherwise the first remote is used. With no remotes the
/// `synthetic` name stands in.
pub fn select_remote(
    remotes: &[(String, Option<String>)],
    synthetic: &str,
) -> crate::Result<RemoteSource> {
    let chosen = remotes
        .iter()
        .find(|(name, _)| name == "origin")
        .or_else(|| remotes.first());

    let Some((name, url)) = chosen else {
        return Ok(RemoteSource::Synthetic(synthetic.to_string()));
    };

    let url = url.clone().ok_or_else(|| {
        StampError::RemoteEnumeration(format!("remote '{}' has no readable URL", name))
    })?;

    if name == "origin" {
        Ok(RemoteSource::Origin(url))
    } else {
        warn!(remote = %name, "no 'origin' remote; using first configured remote");
        Ok(RemoteSource::Fallback {
            name: name.clone(),
            url,
        })
    }
}

/// Stand-in remote for a repository without remotes: the basename of the
/// path as given, with separators normalized to `/`.
pub fn synthetic_remote(repo_path: &Path, identity: &RepoIdentity) -> String {
    let base = repo_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| identity.dir_name.clone());
    base.replace(std::path::MAIN_SEPARATOR, "/")
}

/// First `remote.<name>.url` value in config order.
///
/// `git2::Remote::url` reports the last value when a remote lists several.
fn first_url(config: &git2::Config, name: &str) -> crate::Result<Option<String>> {
    let key = format!("remote.{}.url", name);
    let mut entries = config
        .multivar(&key, None)
        .map_err(|e| StampError::RemoteEnumeration(e.message().to_string()))?;
    match entries.next() {
        Some(Ok(entry)) => Ok(entry.value().map(str::to_string)),
        Some(Err(e)) => Err(StampError::RemoteEnumeration(e.message().to_string())),
        None => Ok(None),
    }
}

/// An opened repository plus the path it was opened from.
pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
    identity: RepoIdentity,
}

impl GitRepo {
    /// Open the repository rooted at `path`. No upward discovery is done.
    pub fn open(path: &Path) -> crate::Result<Self> {
        let repo = Repository::open(path).map_err(|source| StampError::RepositoryNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let identity = RepoIdentity::from_path(path)?;
        debug!(path = %identity.abs_path.display(), dir = %identity.dir_name, "opened repository");
        Ok(Self {
            repo,
            path: path.to_path_buf(),
            identity,
        })
    }

    pub fn identity(&self) -> &RepoIdentity {
        &self.identity
    }

    /// Configured remotes as `(name, first URL)` in listing order.
    pub fn remotes(&self) -> crate::Result<Vec<(String, Option<String>)>> {
        let names = self
            .repo
            .remotes()
            .map_err(|e| StampError::RemoteEnumeration(e.message().to_string()))?;

        let config = self
            .repo
            .config()
            .map_err(|e| StampError::RemoteEnumeration(e.message().to_string()))?;

        let mut remotes = Vec::with_capacity(names.len());
        for name in names.iter() {
            let Some(name) = name else {
                return Err(StampError::RemoteEnumeration(
                    "remote name is not valid UTF-8".to_string(),
                ));
            };
            let url = first_url(&config, name)?;
            remotes.push((name.to_string(), url));
        }
        Ok(remotes)
    }

    /// Resolve the remote string recorded in the manifest (unredacted).
    pub fn remote(&self) -> crate::Result<RemoteSource> {
        let synthetic = synthetic_remote(&self.path, &self.identity);
        select_remote(&self.remotes()?, &synthetic)
    }

    /// Full hex id of the commit HEAD points at.
    pub fn head_sha(&self) -> crate::Result<String> {
        let head = self.repo.head().map_err(|e| match e.code() {
            ErrorCode::UnbornBranch | ErrorCode::NotFound => {
                StampError::NoCommits(self.identity.abs_path.clone())
            }
            _ => StampError::Git(e),
        })?;
        let commit = head.peel_to_commit()?;
        let sha = commit.id().to_string();
        debug!(sha = %sha, "resolved HEAD");
        Ok(sha)
    }
}
