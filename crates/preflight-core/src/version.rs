//! Version parsing and upgrade compatibility gating

use semver::Version;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Where release migration guides are published
const MIGRATION_GUIDE_BASE: &str = "https://github.com/kyma-project/kyma/blob";

/// A major.minor.patch version
///
/// Parsing accepts the forms release tags are usually written in: a leading
/// `v` and missing minor or patch components (`v1.2` is `1.2.0`). Build
/// metadata is ignored for equality and ordering.
#[derive(Debug, Clone)]
pub struct SemVersion(Version);

impl SemVersion {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |message: String| CoreError::InvalidVersion {
            version: input.to_string(),
            message,
        };

        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(invalid("version is empty".to_string()));
        }

        // Split off pre-release/build suffix before padding the numeric core
        let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
        let (core, suffix) = trimmed.split_at(split);

        let parts = core.split('.').count();
        let padded = match parts {
            1 => format!("{}.0.0{}", core, suffix),
            2 => format!("{}.0{}", core, suffix),
            _ => trimmed.to_string(),
        };

        Version::parse(&padded)
            .map(Self)
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// The underlying semver version
    pub fn inner(&self) -> &Version {
        &self.0
    }
}

impl FromStr for SemVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SemVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for SemVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemVersion {}

impl PartialOrd for SemVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }
}

/// Why an upgrade was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenyReason {
    Downgrade,
    AlreadyAtTarget,
    MajorGap,
    MinorGap,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::Downgrade => "downgrade unsupported",
            DenyReason::AlreadyAtTarget => "already at target version",
            DenyReason::MajorGap => "major version gap too large",
            DenyReason::MinorGap => "minor version gap too large",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of the compatibility gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeDecision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    /// The version the upgrade should install from, set on allow
    pub resolved_version: Option<String>,
    pub installed: String,
    pub target: String,
}

impl UpgradeDecision {
    /// Human readable reason, empty on allow
    pub fn reason_message(&self) -> &'static str {
        self.reason.map(|r| r.message()).unwrap_or("")
    }

    /// Turn a deny into an error; yields the resolved version on allow
    pub fn into_result(self) -> Result<String> {
        match (self.reason, self.resolved_version) {
            (None, Some(resolved)) => Ok(resolved),
            (reason, _) => Err(CoreError::UpgradeDenied {
                installed: self.installed,
                target: self.target,
                reason: reason.map(|r| r.message()).unwrap_or_default().to_string(),
            }),
        }
    }
}

impl fmt::Display for UpgradeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            None => write!(f, "upgrade from {} to {} allowed", self.installed, self.target),
            Some(reason) => write!(
                f,
                "upgrade from {} to {} denied: {}",
                self.installed, self.target, reason
            ),
        }
    }
}

/// Decide whether `installed` may be upgraded to `target`
///
/// Only the next minor release of the same major line (or a patch release of
/// the current minor) is allowed.
pub fn check_upgrade(installed: &str, target: &str) -> Result<UpgradeDecision> {
    let from = SemVersion::parse(installed)?;
    let to = SemVersion::parse(target)?;
    Ok(decide(&from, &to))
}

/// Apply the decision table to parsed versions
pub fn decide(installed: &SemVersion, target: &SemVersion) -> UpgradeDecision {
    let reason = if installed > target {
        Some(DenyReason::Downgrade)
    } else if installed == target {
        Some(DenyReason::AlreadyAtTarget)
    } else if installed.major() != target.major() {
        Some(DenyReason::MajorGap)
    } else if installed.minor() != target.minor() && installed.minor() + 1 != target.minor() {
        Some(DenyReason::MinorGap)
    } else {
        None
    };

    UpgradeDecision {
        allowed: reason.is_none(),
        reason,
        resolved_version: reason.is_none().then(|| target.to_string()),
        installed: installed.to_string(),
        target: target.to_string(),
    }
}

/// Link to the migration guide between two releases
pub fn migration_guide_url(installed: &SemVersion, target: &SemVersion) -> String {
    format!(
        "{}/release-{}.{}/docs/migration-guides/{}.{}-{}.{}.md",
        MIGRATION_GUIDE_BASE,
        target.major(),
        target.minor(),
        installed.major(),
        installed.minor(),
        target.major(),
        target.minor(),
    )
}
