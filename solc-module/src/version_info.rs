use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use semver::{BuildMetadata, Version};
use std::fmt;

/// A rewrite applied to a raw compiler version string when `pattern` matches it.
///
/// `template` is expanded against the match with `$N` capture references.
struct VersionRule {
    pattern: Regex,
    template: &'static str,
}

impl VersionRule {
    fn new(pattern: &str, template: &'static str) -> Self {
        VersionRule {
            pattern: Regex::new(pattern).unwrap(),
            template,
        }
    }

    fn apply(&self, version: &str) -> Option<String> {
        self.pattern.captures(version).map(|caps| {
            let mut out = String::new();
            caps.expand(self.template, &mut out);
            out
        })
    }
}

lazy_static! {
    /// Evaluated in order; the first matching rule wins, and a version no rule matches is taken
    /// to be semver already.
    static ref VERSION_RULES: Vec<VersionRule> = vec![
        // 0.3.6-3fc68da5/Release-Emscripten/clang
        VersionRule::new(
            r"^([0-9]+\.[0-9]+\.[0-9]+)-([0-9a-f]{8})[/*].*$",
            "${1}+commit.${2}",
        ),
        // 0.1.3-0/.-/clang/int linked to libethereum-1.1.1-bbb80ab0/.-/clang/int
        VersionRule::new(r"0\.1\.3-0", "0.1.3"),
        // 0.3.5-371690f0/Release-Emscripten/clang/Interpreter
        VersionRule::new(r"0\.3\.5-0", "0.3.5"),
    ];
}

/// Normalize a version string reported by any historical compiler into semver form.
pub fn version_to_semver(version: &str) -> String {
    VERSION_RULES
        .iter()
        .find_map(|rule| rule.apply(version))
        .unwrap_or_else(|| version.to_owned())
}

/// The version reported by a loaded compiler module, in both its raw and normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    raw: String,
    semver: String,
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.raw)
    }
}

impl VersionInfo {
    pub fn new<S: Into<String>>(raw: S) -> VersionInfo {
        let raw = raw.into();
        let semver = version_to_semver(&raw);
        VersionInfo { raw, semver }
    }

    /// The version string exactly as the module reported it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized version string.
    pub fn semver(&self) -> &str {
        &self.semver
    }

    /// Parse the normalized version. Build metadata is dropped, as it takes no part in ordering.
    pub fn parse(&self) -> Result<Version, Error> {
        parse_version(&self.semver)
    }

    /// Whether this version is strictly newer than `major.minor.patch`.
    ///
    /// A version that cannot be parsed is newer than nothing.
    pub fn newer_than(&self, major: u64, minor: u64, patch: u64) -> bool {
        self.parse()
            .map(|v| v > Version::new(major, minor, patch))
            .unwrap_or(false)
    }

    /// Whether this version is strictly older than `major.minor.patch`.
    ///
    /// A version that cannot be parsed is older than nothing.
    pub fn older_than(&self, major: u64, minor: u64, patch: u64) -> bool {
        self.parse()
            .map(|v| v < Version::new(major, minor, patch))
            .unwrap_or(false)
    }
}

pub(crate) fn parse_version(version: &str) -> Result<Version, Error> {
    let mut parsed = Version::parse(version).map_err(|source| Error::InvalidVersion {
        version: version.to_owned(),
        source,
    })?;
    parsed.build = BuildMetadata::EMPTY;
    Ok(parsed)
}
