//! Build metadata types for the per-device OTA manifests
//!
//! Each (codename, variant) pair has its own manifest:
//! `{base}/{VARIANT}/{codename}.json`, shaped as `{"response": [...]}` with
//! releases ordered newest-first.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::format::{format_timestamp, human_readable_size};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to parse build manifest: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Build timestamp out of range: {0}")]
    InvalidTimestamp(i64),
}

/// A build flavor published for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Vanilla,
    Gms,
}

impl Variant {
    /// Every variant, in display order
    pub const ALL: [Variant; 2] = [Variant::Vanilla, Variant::Gms];

    /// Upstream directory name (e.g. "VANILLA")
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vanilla => "VANILLA",
            Self::Gms => "GMS",
        }
    }

    /// Lowercase form used in control tokens
    pub fn token(self) -> &'static str {
        match self {
            Self::Vanilla => "vanilla",
            Self::Gms => "gms",
        }
    }

    /// Button and list label
    pub fn label(self) -> &'static str {
        match self {
            Self::Vanilla => "Vanilla",
            Self::Gms => "GMS",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown build variant: {0}")]
pub struct UnknownVariant(pub String);

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Cache and lookup key for one build manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildKey {
    pub codename: String,
    pub variant: Variant,
}

impl BuildKey {
    pub fn new(codename: impl Into<String>, variant: Variant) -> Self {
        Self {
            codename: codename.into(),
            variant,
        }
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.codename, self.variant)
    }
}

/// Latest published build for one (codename, variant), ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub filename: String,
    pub version: String,
    /// Human-readable size (e.g. "1.52 GB")
    pub size: String,
    /// UTC build date, `YYYY-MM-DD HH:MM:SS`
    pub date: String,
    /// Download URL
    pub url: String,
    /// MD5 checksum, when the manifest publishes one
    pub checksum: Option<String>,
}

/// Build manifest as published upstream
#[derive(Debug, Deserialize)]
pub struct OtaManifest {
    #[serde(default)]
    pub response: Vec<OtaRelease>,
}

/// A single release entry in the manifest
#[derive(Debug, Clone, Deserialize)]
pub struct OtaRelease {
    pub filename: String,
    pub version: String,
    /// Size in bytes
    pub size: u64,
    /// Build time, seconds since the Unix epoch
    pub datetime: i64,
    pub url: String,
    #[serde(default)]
    pub md5sum: Option<String>,
}

impl BuildRecord {
    /// Normalize a manifest release for display
    pub fn from_release(release: &OtaRelease) -> Result<Self, BuildError> {
        let date = format_timestamp(release.datetime)
            .ok_or(BuildError::InvalidTimestamp(release.datetime))?;

        Ok(Self {
            filename: release.filename.clone(),
            version: release.version.clone(),
            size: human_readable_size(release.size),
            date,
            url: release.url.clone(),
            checksum: release.md5sum.clone().filter(|sum| !sum.is_empty()),
        })
    }

    /// First 16 characters of the checksum, for compact display
    pub fn short_checksum(&self) -> Option<&str> {
        self.checksum
            .as_deref()
            .map(|sum| sum.char_indices().nth(16).map_or(sum, |(i, _)| &sum[..i]))
    }
}

/// Parse a manifest body and normalize its newest release
///
/// Returns `Ok(None)` when the manifest lists no releases. The first entry is
/// taken as the newest; the list is not re-sorted.
pub fn parse_latest_build(body: &str) -> Result<Option<BuildRecord>, BuildError> {
    let manifest: OtaManifest = serde_json::from_str(body)?;
    manifest
        .response
        .first()
        .map(BuildRecord::from_release)
        .transpose()
}
