//! Configuration for pkgstamp
//!
//! Settings come from three layers: the profile preset, the optional TOML
//! config file, and command-line overrides. [`StampConfig::resolve`] merges
//! them once at startup into the value passed to [`crate::stamp`].

use crate::StampError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Named preset covering naming, extension, redaction and field set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// `{dir}_{epoch}`, strip-userinfo remote, `TimeWithZone`
    #[default]
    Standard,
    /// `{dir}_{epoch}.tar.xz`, host:path remote, RFC 3339 `Time`
    Rfc3339,
    /// `archive_{epoch}.tgz`, no remote, no timestamps
    Minimal,
}

/// How the artifact file name prefix is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Naming {
    /// Repository directory basename
    Dir,
    /// Literal `archive`, always with a `.tgz` extension
    Archive,
}

impl Naming {
    /// Extension the mode pins regardless of `--ext` or config.
    pub fn fixed_extension(self) -> Option<&'static str> {
        match self {
            Self::Dir => None,
            Self::Archive => Some("tgz"),
        }
    }
}

/// Strategy used to remove credentials from the remote URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Redaction {
    /// Drop `user[:pass]@`, keep the rest of the string untouched
    StripUserinfo,
    /// Re-render as `host:path`
    HostPath,
}

/// Key set of the manifest JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldSet {
    /// `SHA`, `ShortSHA`, `FileName`
    Minimal,
    /// `EpochTime`, `TimeWithZone`, `SHA`, `ShortSHA`, `FileName`, `Repo`
    Standard,
    /// `EpochTime`, `Time`, `SHA`, `ShortSHA`, `FileName`, `Repo`
    Rfc3339,
}

impl FieldSet {
    /// Whether this shape carries the `Repo` field.
    pub fn includes_repo(self) -> bool {
        !matches!(self, Self::Minimal)
    }
}

impl Profile {
    pub fn naming(self) -> Naming {
        match self {
            Self::Standard | Self::Rfc3339 => Naming::Dir,
            Self::Minimal => Naming::Archive,
        }
    }

    pub fn default_extension(self) -> Option<&'static str> {
        match self {
            Self::Standard => None,
            Self::Rfc3339 => Some("tar.xz"),
            Self::Minimal => self.naming().fixed_extension(),
        }
    }

    pub fn redaction(self) -> Redaction {
        match self {
            Self::Standard | Self::Minimal => Redaction::StripUserinfo,
            Self::Rfc3339 => Redaction::HostPath,
        }
    }

    pub fn fields(self) -> FieldSet {
        match self {
            Self::Standard => FieldSet::Standard,
            Self::Rfc3339 => FieldSet::Rfc3339,
            Self::Minimal => FieldSet::Minimal,
        }
    }
}

fn unknown(kind: &str, value: &str, expected: &str) -> StampError {
    StampError::Configuration(format!(
        "unknown {} '{}' (expected one of: {})",
        kind, value, expected
    ))
}

impl FromStr for Profile {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "rfc3339" => Ok(Self::Rfc3339),
            "minimal" => Ok(Self::Minimal),
            other => Err(unknown("profile", other, "standard, rfc3339, minimal")),
        }
    }
}

impl FromStr for Naming {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dir" => Ok(Self::Dir),
            "archive" => Ok(Self::Archive),
            other => Err(unknown("naming mode", other, "dir, archive")),
        }
    }
}

impl FromStr for Redaction {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strip-userinfo" => Ok(Self::StripUserinfo),
            "host-path" => Ok(Self::HostPath),
            other => Err(unknown(
                "redaction strategy",
                other,
                "strip-userinfo, host-path",
            )),
        }
    }
}

impl FromStr for FieldSet {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "rfc3339" => Ok(Self::Rfc3339),
            other => Err(unknown("field set", other, "minimal, standard, rfc3339")),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Standard => "standard",
            Self::Rfc3339 => "rfc3339",
            Self::Minimal => "minimal",
        })
    }
}

/// Optional settings shared by the config file and the command line.
///
/// Every field left as `None` falls through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestSettings {
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub naming: Option<Naming>,
    #[serde(default)]
    pub redaction: Option<Redaction>,
    #[serde(default)]
    pub fields: Option<FieldSet>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl ManifestSettings {
    /// Fill unset fields from `fallback`.
    pub fn or(self, fallback: ManifestSettings) -> ManifestSettings {
        ManifestSettings {
            profile: self.profile.or(fallback.profile),
            extension: self.extension.or(fallback.extension),
            naming: self.naming.or(fallback.naming),
            redaction: self.redaction.or(fallback.redaction),
            fields: self.fields.or(fallback.fields),
            output_dir: self.output_dir.or(fallback.output_dir),
        }
    }
}

/// Contents of a pkgstamp TOML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub manifest: ManifestSettings,
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| StampError::ConfigParse(e.to_string()))
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct StampConfig {
    pub repo_path: PathBuf,
    pub profile: Profile,
    pub naming: Naming,
    pub extension: Option<String>,
    pub redaction: Redaction,
    pub fields: FieldSet,
    pub output_dir: PathBuf,
}

impl StampConfig {
    /// Profile defaults for `repo_path`, written to the current directory.
    pub fn new(repo_path: impl Into<PathBuf>) -> crate::Result<Self> {
        Self::resolve(Some(repo_path.into()), ManifestSettings::default())
    }

    /// Merge `settings` over the preset of the selected profile.
    ///
    /// A missing or empty `repo_path` and an empty extension are
    /// configuration errors. `archive` naming keeps its own extension; a
    /// supplied one is still validated, then ignored.
    pub fn resolve(repo_path: Option<PathBuf>, settings: ManifestSettings) -> crate::Result<Self> {
        let repo_path = match repo_path {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => {
                return Err(StampError::Configuration(
                    "please provide a valid path to the Git repository using the --path flag"
                        .to_string(),
                ))
            }
        };

        let profile = settings.profile.unwrap_or_default();
        let naming = settings.naming.unwrap_or(profile.naming());
        let requested = settings
            .extension
            .as_deref()
            .map(normalize_extension)
            .transpose()?;
        let extension = match (naming.fixed_extension(), requested) {
            (Some(fixed), requested) => {
                if let Some(ext) = requested.filter(|ext| ext != fixed) {
                    warn!(extension = %ext, "archive naming always uses .{}; extension ignored", fixed);
                }
                Some(fixed.to_string())
            }
            (None, Some(ext)) => Some(ext),
            (None, None) => profile.default_extension().map(str::to_string),
        };

        Ok(Self {
            repo_path,
            profile,
            naming,
            extension,
            redaction: settings.redaction.unwrap_or(profile.redaction()),
            fields: settings.fields.unwrap_or(profile.fields()),
            output_dir: settings.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn normalize_extension(ext: &str) -> crate::Result<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return Err(StampError::Configuration(
            "the --ext flag must not be empty".to_string(),
        ));
    }
    if trimmed.contains(|c| c == '/' || c == '\\') {
        return Err(StampError::Configuration(format!(
            "extension '{}' must not contain path separators",
            ext
        )));
    }
    Ok(trimmed.to_string())
}
