//! Version parsing and ordering.
//!
//! Versions are dotted sequences of non-negative integers with an
//! arbitrary segment count. Comparison is segment-wise and numeric, with
//! the shorter sequence padded with zeros, so `1.10.0 > 1.9.0` and
//! `2.0 == 2.0.0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::UpgradeConfig;
use crate::errors::RollupError;
use crate::executor::{CommandSpec, RemoteExecutor};

/// A parsed version: an ordered tuple of numeric segments.
///
/// Immutable once parsed. Equality follows the padded comparison, so
/// `2.0` and `2.0.0` are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parses a dot-separated version string.
    ///
    /// # Errors
    ///
    /// Returns [`RollupError::MalformedVersion`] if the string is empty or
    /// any segment is empty or non-numeric.
    pub fn parse(s: &str) -> Result<Self, RollupError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RollupError::malformed_version(s, "empty string"));
        }

        let segments = trimmed
            .split('.')
            .map(|seg| {
                seg.parse::<u64>().map_err(|_| {
                    RollupError::malformed_version(s, format!("non-numeric segment '{seg}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    /// The version's numeric segments.
    #[must_use]
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .segments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{rendered}")
    }
}

impl FromStr for Version {
    type Err = RollupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = RollupError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

/// The version a run upgrades towards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionTarget {
    /// Resolve the highest version available in the repository at run start.
    Latest,
    /// Upgrade to this exact version.
    Pinned(Version),
}

impl VersionTarget {
    /// Parses a target string, treating the literal `latest` as the sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`RollupError::MalformedVersion`] for anything that is
    /// neither `latest` nor a valid version string.
    pub fn parse(s: &str) -> Result<Self, RollupError> {
        if s.trim().eq_ignore_ascii_case("latest") {
            Ok(Self::Latest)
        } else {
            Ok(Self::Pinned(Version::parse(s)?))
        }
    }
}

impl Default for VersionTarget {
    fn default() -> Self {
        Self::Latest
    }
}

impl fmt::Display for VersionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Pinned(v) => write!(f, "{v}"),
        }
    }
}

/// Resolves the configured target to a concrete version.
///
/// A pinned target is returned as-is. `latest` runs the configured
/// repository query on the given node and parses its trimmed single-line
/// stdout.
///
/// # Errors
///
/// Returns [`RollupError::ResolveTarget`] if the query exits non-zero, and
/// [`RollupError::MalformedVersion`] if its output does not parse.
pub async fn resolve_target(
    config: &UpgradeConfig,
    host: &str,
    executor: &dyn RemoteExecutor,
) -> Result<Version, RollupError> {
    match &config.target {
        VersionTarget::Pinned(version) => Ok(version.clone()),
        VersionTarget::Latest => {
            tracing::info!(host, "determining the latest available version");
            let output = executor
                .execute(host, &CommandSpec::new(&config.latest_version_command))
                .await?;

            if !output.success() {
                return Err(RollupError::ResolveTarget {
                    host: host.to_string(),
                    detail: output.failure_detail(),
                });
            }

            let line = output.stdout.trim();
            let version = Version::parse(line)?;
            tracing::info!(host, %version, "resolved latest version");
            Ok(version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic() {
        let v = Version::parse("2.1.0").unwrap();
        assert_eq!(v.segments(), &[2, 1, 0]);
    }

    #[test]
    fn test_parse_arbitrary_segment_count() {
        assert!(Version::parse("1").is_ok());
        assert!(Version::parse("1.2.3.4.5").is_ok());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(matches!(
            Version::parse("2.x.0"),
            Err(RollupError::MalformedVersion { .. })
        ));
        assert!(matches!(
            Version::parse(""),
            Err(RollupError::MalformedVersion { .. })
        ));
        assert!(matches!(
            Version::parse("2..0"),
            Err(RollupError::MalformedVersion { .. })
        ));
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        let a = Version::parse("1.9.0").unwrap();
        let b = Version::parse("1.10.0").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_shorter_padded_with_zeros() {
        let a = Version::parse("2.0").unwrap();
        let b = Version::parse("2.0.0").unwrap();
        let c = Version::parse("2.0.1").unwrap();
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert!(a < c);
    }

    #[test]
    fn test_ordering_antisymmetric_and_transitive() {
        let low = Version::parse("1.2.3").unwrap();
        let mid = Version::parse("1.3.0").unwrap();
        let high = Version::parse("2.0.0").unwrap();

        assert!(low < mid && mid > low);
        assert!(low < mid && mid < high && low < high);
    }

    #[test]
    fn test_display_round_trip() {
        let v = Version::parse("10.2.33").unwrap();
        assert_eq!(v.to_string(), "10.2.33");
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(VersionTarget::parse("latest").unwrap(), VersionTarget::Latest);
        assert_eq!(VersionTarget::parse("Latest").unwrap(), VersionTarget::Latest);
        assert_eq!(
            VersionTarget::parse("2.1.0").unwrap(),
            VersionTarget::Pinned(Version::parse("2.1.0").unwrap())
        );
        assert!(VersionTarget::parse("newest").is_err());
    }
}
