//! Semantic version parsing and host/plugin compatibility predicates.
//!
//! Grammar: `[v]MAJOR.MINOR.PATCH[-PRE][+BUILD]`, plus the literal sentinel
//! `dev`, which parses to `{0,0,0,pre=Some("dev")}` and is compatible with
//! every other version (used by in-development plugins that haven't cut a
//! release yet).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version string {input:?}: {reason}")]
    Format { input: String, reason: String },
}

impl VersionError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        VersionError::Format {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed `MAJOR.MINOR.PATCH[-PRE][+BUILD]` version, or the `dev` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
    pub build: Option<String>,
}

const DEV_SENTINEL: &str = "dev";

impl Version {
    /// Parse `major.minor.patch[-pre][+build]`, or the literal `dev` sentinel.
    pub fn parse(s: &str) -> Result<Version, VersionError> {
        let trimmed = s.trim();
        if trimmed == DEV_SENTINEL {
            return Ok(Version {
                major: 0,
                minor: 0,
                patch: 0,
                pre: Some(DEV_SENTINEL.to_string()),
                build: None,
            });
        }

        let without_v = trimmed.strip_prefix('v').unwrap_or(trimmed);

        // Split off build metadata first (+BUILD), then pre-release (-PRE).
        let (rest, build) = match without_v.split_once('+') {
            Some((rest, build)) => (rest, Some(build.to_string())),
            None => (without_v, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (rest, None),
        };

        let mut parts = core.split('.');
        let major = parse_component(trimmed, parts.next())?;
        let minor = parse_component(trimmed, parts.next())?;
        let patch = parse_component(trimmed, parts.next())?;
        if parts.next().is_some() {
            return Err(VersionError::new(
                trimmed,
                "expected exactly MAJOR.MINOR.PATCH",
            ));
        }

        if let Some(pre) = &pre {
            if pre.is_empty() {
                return Err(VersionError::new(trimmed, "empty pre-release identifier"));
            }
        }
        if let Some(build) = &build {
            if build.is_empty() {
                return Err(VersionError::new(trimmed, "empty build identifier"));
            }
        }

        Ok(Version {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }

    /// True if this version is the `dev` sentinel.
    pub fn is_dev(&self) -> bool {
        self.pre.as_deref() == Some(DEV_SENTINEL) && self.major == 0 && self.minor == 0 && self.patch == 0
    }

    /// Lexicographic ordering over (major, minor, patch); pre/build ignored.
    pub fn compare(&self, other: &Version) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }

    /// Two versions are compatible iff `major == major && minor == minor`,
    /// or either side is the `dev` sentinel.
    pub fn compatible(&self, other: &Version) -> bool {
        if self.is_dev() || other.is_dev() {
            return true;
        }
        self.major == other.major && self.minor == other.minor
    }
}

fn parse_component(input: &str, part: Option<&str>) -> Result<u64, VersionError> {
    let part = part.ok_or_else(|| VersionError::new(input, "missing MAJOR.MINOR.PATCH component"))?;
    part.parse::<u64>()
        .map_err(|_| VersionError::new(input, format!("{part:?} is not a valid numeric component")))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dev() {
            return write!(f, "dev");
        }
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_plain_version() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v, Version { major: 1, minor: 2, patch: 3, pre: None, build: None });
    }

    #[test]
    fn parses_v_prefix() {
        let v = Version::parse("v2.0.0").unwrap();
        assert_eq!(v.major, 2);
    }

    #[test]
    fn parses_pre_and_build() {
        let v = Version::parse("1.2.3-rc.1+build.7").unwrap();
        assert_eq!(v.pre.as_deref(), Some("rc.1"));
        assert_eq!(v.build.as_deref(), Some("build.7"));
    }

    #[test]
    fn dev_sentinel() {
        let v = Version::parse("dev").unwrap();
        assert!(v.is_dev());
        assert_eq!(v.to_string(), "dev");
    }

    #[test]
    fn rejects_malformed() {
        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("a.b.c").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
    }

    #[test]
    fn compare_ignores_pre_and_build() {
        let a = Version::parse("1.2.3+buildA").unwrap();
        let b = Version::parse("1.2.3+buildB").unwrap();
        assert_eq!(a.compare(&b), Ordering::Equal);

        let c = Version::parse("1.3.0").unwrap();
        assert_eq!(a.compare(&c), Ordering::Less);
    }

    #[test]
    fn compatibility_matrix() {
        let a = Version::parse("1.2.3").unwrap();
        let b = Version::parse("1.3.0").unwrap();
        let c = Version::parse("1.2.9").unwrap();
        let dev = Version::parse("dev").unwrap();

        assert!(a.compatible(&a));
        assert!(!a.compatible(&b));
        assert!(a.compatible(&c));
        assert!(dev.compatible(&a));
        assert!(a.compatible(&dev));
        assert_eq!(a.compatible(&b), b.compatible(&a));
    }

    #[test]
    fn roundtrips_through_serde() {
        let v = Version::parse("1.2.3-rc.1").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.2.3-rc.1\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    proptest! {
        #[test]
        fn parse_accepts_any_major_minor_patch_triple(major in any::<u64>(), minor in any::<u64>(), patch in any::<u64>()) {
            let input = format!("{major}.{minor}.{patch}");
            let v = Version::parse(&input).unwrap();
            prop_assert_eq!(v, Version { major, minor, patch, pre: None, build: None });
        }

        #[test]
        fn display_output_reparses_to_the_same_version(major in any::<u64>(), minor in any::<u64>(), patch in any::<u64>()) {
            let v = Version { major, minor, patch, pre: None, build: None };
            let reparsed = Version::parse(&v.to_string()).unwrap();
            prop_assert_eq!(v, reparsed);
        }

        #[test]
        fn compatible_is_symmetric(
            a_major in any::<u64>(), a_minor in any::<u64>(), a_patch in any::<u64>(),
            b_major in any::<u64>(), b_minor in any::<u64>(), b_patch in any::<u64>(),
        ) {
            let a = Version { major: a_major, minor: a_minor, patch: a_patch, pre: None, build: None };
            let b = Version { major: b_major, minor: b_minor, patch: b_patch, pre: None, build: None };
            prop_assert_eq!(a.compatible(&b), b.compatible(&a));
        }

        #[test]
        fn compatible_requires_matching_major_and_minor(
            major in any::<u64>(), minor in any::<u64>(), a_patch in any::<u64>(), b_patch in any::<u64>(),
        ) {
            let a = Version { major, minor, patch: a_patch, pre: None, build: None };
            let b = Version { major, minor, patch: b_patch, pre: None, build: None };
            prop_assert!(a.compatible(&b));
        }
    }
}
