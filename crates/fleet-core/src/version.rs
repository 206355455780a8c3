//! Package version templates.
//!
//! A package declares a version such as `1.4.0.NEXT`: a semver
//! `major.minor.patch` base followed by an optional build segment. `NEXT` is
//! replaced with the run's build number when the package is built.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal build segment replaced by the build number.
pub const NEXT: &str = "NEXT";

/// Errors raised while parsing a version template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid base version '{input}': {reason}")]
    InvalidBase { input: String, reason: String },

    #[error("invalid build segment '{segment}' (expected NEXT or a number)")]
    InvalidBuildSegment { segment: String },
}

/// Trailing build segment of a version template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildSegment {
    /// No fourth segment (`1.4.0`).
    None,
    /// Substituted with the build number (`1.4.0.NEXT`).
    Next,
    /// Pinned build number (`1.4.0.12`).
    Fixed(u64),
}

/// A parsed `major.minor.patch[.build]` version template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTemplate {
    base: Version,
    build: BuildSegment,
}

impl VersionTemplate {
    pub fn new(base: Version, build: BuildSegment) -> Self {
        Self { base, build }
    }

    pub fn base(&self) -> &Version {
        &self.base
    }

    pub fn build(&self) -> BuildSegment {
        self.build
    }

    /// Produce the concrete version for a run with the given build number.
    pub fn resolve(&self, build_number: u64) -> String {
        match self.build {
            BuildSegment::None => self.base.to_string(),
            BuildSegment::Next => format!("{}.{build_number}", self.base),
            BuildSegment::Fixed(n) => format!("{}.{n}", self.base),
        }
    }
}

impl FromStr for VersionTemplate {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts: Vec<&str> = trimmed.split('.').collect();
        let build = if parts.len() == 4 {
            let segment = parts.pop().unwrap_or_default();
            if segment.eq_ignore_ascii_case(NEXT) {
                BuildSegment::Next
            } else {
                segment
                    .parse::<u64>()
                    .map(BuildSegment::Fixed)
                    .map_err(|_| VersionError::InvalidBuildSegment {
                        segment: segment.to_string(),
                    })?
            }
        } else {
            BuildSegment::None
        };

        let base_str = parts.join(".");
        let base = Version::parse(&base_str).map_err(|e| VersionError::InvalidBase {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { base, build })
    }
}

impl TryFrom<String> for VersionTemplate {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionTemplate> for String {
    fn from(v: VersionTemplate) -> Self {
        v.to_string()
    }
}

impl Default for VersionTemplate {
    fn default() -> Self {
        Self {
            base: Version::new(0, 1, 0),
            build: BuildSegment::Next,
        }
    }
}

impl fmt::Display for VersionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.build {
            BuildSegment::None => write!(f, "{}", self.base),
            BuildSegment::Next => write!(f, "{}.{NEXT}", self.base),
            BuildSegment::Fixed(n) => write!(f, "{}.{n}", self.base),
        }
    }
}
