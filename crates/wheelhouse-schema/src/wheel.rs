//! Binary distribution filename grammar.
//!
//! `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`, where each of
//! the three trailing tag fields may be a `.`-joined set of tags for wheels
//! that are compatible with several interpreters or platforms.

use crate::name::PackageName;
use regex::Regex;
use std::sync::LazyLock;

/// File extension of a binary distribution.
pub const WHEEL_EXTENSION: &str = ".whl";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("static regex")
});

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^v?(?:[0-9]+!)?[0-9]+(?:\.[0-9]+)*",
        r"(?:[_.]?(?:a|b|c|rc|alpha|beta|pre|preview)[_.]?[0-9]*)?",
        r"(?:[_.]?(?:post|rev|r)[_.]?[0-9]*)?",
        r"(?:[_.]?dev[_.]?[0-9]*)?",
        r"(?:\+[a-z0-9]+(?:[_.][a-z0-9]+)*)?$",
    ))
    .expect("static regex")
});

static BUILD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9][A-Za-z0-9_.]*$").expect("static regex"));

static TAG_SET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*$").expect("static regex"));

/// A filename that does not follow the wheel grammar.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid wheel filename '{filename}': {reason}")]
pub struct NameError {
    /// The offending filename, verbatim.
    pub filename: String,
    /// What part of the grammar it violates.
    pub reason: String,
}

impl NameError {
    fn new(filename: &str, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed wheel filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelFilename {
    raw: String,
    distribution: String,
    name: PackageName,
    version: String,
    build_tag: Option<String>,
    python_tags: Vec<String>,
    abi_tags: Vec<String>,
    platform_tags: Vec<String>,
}

impl WheelFilename {
    /// Parse a bare filename (no directory components).
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the name lacks the `.whl` extension, has the
    /// wrong number of components, or any component is malformed.
    pub fn parse(filename: &str) -> Result<Self, NameError> {
        let Some(stem) = filename.strip_suffix(WHEEL_EXTENSION) else {
            return Err(NameError::new(filename, "missing .whl extension"));
        };

        let parts: Vec<&str> = stem.split('-').collect();
        if parts.len() < 5 {
            return Err(NameError::new(
                filename,
                format!(
                    "expected at least 5 dash-separated components, found {}",
                    parts.len()
                ),
            ));
        }
        let (head, tags) = parts.split_at(parts.len() - 3);
        let (python, abi, platform) = (tags[0], tags[1], tags[2]);
        let (distribution, version, build) = split_head(filename, head)?;

        if !NAME_RE.is_match(&distribution) {
            return Err(NameError::new(
                filename,
                format!("invalid distribution name '{distribution}'"),
            ));
        }

        Ok(Self {
            raw: filename.to_string(),
            name: PackageName::new(&distribution),
            distribution,
            version,
            build_tag: build,
            python_tags: tag_set(filename, "python", python)?,
            abi_tags: tag_set(filename, "abi", abi)?,
            platform_tags: tag_set(filename, "platform", platform)?,
        })
    }

    /// The filename exactly as given.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Distribution name as spelled in the filename.
    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    /// Normalized package identity.
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// Version string as spelled in the filename.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Optional build tag.
    pub fn build_tag(&self) -> Option<&str> {
        self.build_tag.as_deref()
    }

    /// Interpreter tags, expanded from their `.`-joined form.
    pub fn python_tags(&self) -> &[String] {
        &self.python_tags
    }

    /// ABI tags, expanded from their `.`-joined form.
    pub fn abi_tags(&self) -> &[String] {
        &self.abi_tags
    }

    /// Platform tags, expanded from their `.`-joined form.
    pub fn platform_tags(&self) -> &[String] {
        &self.platform_tags
    }
}

impl std::str::FromStr for WheelFilename {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for WheelFilename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split the components before the tag triplet into name, version and build.
///
/// Well-formed wheels escape `-` in the name, so the head is normally
/// `[name, version]` or `[name, version, build]`. Names that kept their
/// dashes (`foo-bar-1.0-...`) are accepted by letting the name absorb every
/// leading component that is not the version.
fn split_head(
    filename: &str,
    head: &[&str],
) -> Result<(String, String, Option<String>), NameError> {
    if let [name @ .., version, build] = head {
        if !name.is_empty() && VERSION_RE.is_match(version) && BUILD_RE.is_match(build) {
            return Ok((name.join("-"), (*version).to_string(), Some((*build).to_string())));
        }
    }

    let [name @ .., version] = head else {
        return Err(NameError::new(filename, "missing version component"));
    };
    if !VERSION_RE.is_match(version) {
        return Err(NameError::new(filename, format!("invalid version '{version}'")));
    }
    Ok((name.join("-"), (*version).to_string(), None))
}

fn tag_set(filename: &str, field: &str, value: &str) -> Result<Vec<String>, NameError> {
    if !TAG_SET_RE.is_match(value) {
        return Err(NameError::new(
            filename,
            format!("invalid {field} tag '{value}'"),
        ));
    }
    let mut tags: Vec<String> = Vec::new();
    for tag in value.split('.') {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    Ok(tags)
}
