//! Catalog compatibility checks.
//!
//! A config may pin the kind catalog it was written for, e.g. `catalog = "^1"`,
//! so that a fixer whose rules changed output refuses to run it silently.

use crate::violation::CATALOG_VERSION;
use semver::{Version, VersionReq};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Check if a version matches a requirement string
///
/// # Examples
///
/// ```
/// use stylefix::config::version::matches_requirement;
///
/// assert!(matches_requirement("1.0.0", Some("^1")).unwrap());
/// assert!(!matches_requirement("1.0.0", Some(">=2.0.0")).unwrap());
///
/// // None requirement means "any catalog"
/// assert!(matches_requirement("1.0.0", None).unwrap());
/// ```
pub fn matches_requirement(version: &str, requirement: Option<&str>) -> Result<bool, VersionError> {
    let Some(req_str) = requirement else {
        return Ok(true);
    };

    let req_str = req_str.trim();
    if req_str.is_empty() {
        return Ok(true);
    }

    let version = Version::parse(version).map_err(|e| VersionError::InvalidVersion {
        value: version.to_string(),
        source: e.to_string(),
    })?;

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}

/// Whether this build's catalog satisfies `requirement`.
pub fn catalog_satisfies(requirement: Option<&str>) -> Result<bool, VersionError> {
    matches_requirement(CATALOG_VERSION, requirement)
}
