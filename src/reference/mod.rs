//! Image reference parsing and registry host resolution.
//!
//! References follow the familiar `[registry/]repository[:tag][@digest]`
//! shape. The registry host is the first path component when it looks like a
//! host name (contains `.` or `:`, or is `localhost`); otherwise the image
//! lives on Docker Hub.

use std::fmt;
use std::str::FromStr;

use crate::error::ReferenceError;

/// Registry host assumed when a reference does not name one.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed when a reference carries neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

const MAX_TAG_LEN: usize = 128;
const MIN_DIGEST_HEX_LEN: usize = 32;

/// A parsed, immutable image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    raw: String,
    registry: String,
    explicit_registry: bool,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference string.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::Empty` for blank input and
    /// `ReferenceError::InvalidReference` when any component is malformed.
    pub fn parse(reference: &str) -> Result<Self, ReferenceError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid(trimmed, "contains whitespace"));
        }

        let (without_digest, digest) = match trimmed.split_once('@') {
            Some((name, digest)) => {
                validate_digest(trimmed, digest)?;
                (name, Some(String::from(digest)))
            }
            None => (trimmed, None),
        };

        let (name, tag) = split_tag(without_digest);
        if let Some(tag_value) = tag {
            validate_tag(trimmed, tag_value)?;
        }

        let (registry, repository, explicit_registry) = match name.split_once('/') {
            Some((first, rest)) if looks_like_host(first) => {
                validate_host(trimmed, first)?;
                (first, rest, true)
            }
            _ => (DEFAULT_REGISTRY, name, false),
        };
        validate_repository(trimmed, repository)?;

        Ok(Self {
            raw: String::from(trimmed),
            registry: String::from(registry),
            explicit_registry,
            repository: String::from(repository),
            tag: tag.map(String::from),
            digest,
        })
    }

    /// Return the registry host, including any port.
    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Return whether the registry host was written in the reference.
    #[must_use]
    pub const fn has_explicit_registry(&self) -> bool {
        self.explicit_registry
    }

    /// Return the repository path without the registry host.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Return the tag, if one was given.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Return the digest, if one was given.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Return the image name as written, without tag or digest.
    #[must_use]
    pub fn name(&self) -> String {
        if self.explicit_registry {
            format!("{}/{}", self.registry, self.repository)
        } else {
            self.repository.clone()
        }
    }

    /// Return the tag, falling back to [`DEFAULT_TAG`].
    #[must_use]
    pub fn tag_or_default(&self) -> &str {
        self.tag().unwrap_or(DEFAULT_TAG)
    }

    /// Return the value the engine expects in a pull's `tag` parameter.
    ///
    /// The engine accepts either a tag or a digest there; a digest wins
    /// because it pins the content.
    #[must_use]
    pub fn pull_selector(&self) -> &str {
        self.digest().unwrap_or_else(|| self.tag_or_default())
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ImageReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Extract the registry host from an image reference.
///
/// # Errors
///
/// Propagates any parse failure from [`ImageReference::parse`].
pub fn registry_host(reference: &str) -> Result<String, ReferenceError> {
    ImageReference::parse(reference).map(|parsed| parsed.registry)
}

fn invalid(reference: &str, reason: impl Into<String>) -> ReferenceError {
    ReferenceError::InvalidReference {
        reference: String::from(reference),
        reason: reason.into(),
    }
}

/// Split `name:tag`, ignoring a colon that belongs to a `host:port` prefix.
fn split_tag(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once(':') {
        Some((head, tail)) if !tail.contains('/') => (head, Some(tail)),
        _ => (name, None),
    }
}

fn looks_like_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn validate_host(reference: &str, host: &str) -> Result<(), ReferenceError> {
    let (hostname, port, bracketed) = if let Some(rest) = host.strip_prefix('[') {
        let Some((address, after)) = rest.split_once(']') else {
            return Err(invalid(reference, format!("unterminated IPv6 host '{host}'")));
        };
        let port = match after {
            "" => None,
            other => Some(other.strip_prefix(':').unwrap_or(other)),
        };
        (address, port, true)
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) => (name, Some(port), false),
            None => (host, None, false),
        }
    };

    let hostname_ok = !hostname.is_empty()
        && hostname.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '.' | '-') || (bracketed && c == ':')
        });
    if !hostname_ok {
        return Err(invalid(reference, format!("invalid registry host '{host}'")));
    }

    if let Some(port_value) = port {
        if port_value.is_empty() || !port_value.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(reference, format!("invalid registry port in '{host}'")));
        }
    }

    Ok(())
}

fn validate_repository(reference: &str, repository: &str) -> Result<(), ReferenceError> {
    if repository.is_empty() {
        return Err(invalid(reference, "repository name is empty"));
    }

    for component in repository.split('/') {
        if !is_path_component(component) {
            return Err(invalid(
                reference,
                format!("invalid repository path component '{component}'"),
            ));
        }
    }

    Ok(())
}

/// A path component is lowercase alphanumerics joined by `.`, `_`, `__`, or
/// runs of `-`.
fn is_path_component(component: &str) -> bool {
    let starts_ok = component
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let ends_ok = component
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !starts_ok || !ends_ok {
        return false;
    }

    let mut separator = String::new();
    for c in component.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if !is_valid_separator(&separator) {
                return false;
            }
            separator.clear();
        } else if matches!(c, '.' | '_' | '-') {
            separator.push(c);
        } else {
            return false;
        }
    }

    true
}

fn is_valid_separator(separator: &str) -> bool {
    matches!(separator, "" | "." | "_" | "__") || separator.chars().all(|c| c == '-')
}

fn validate_tag(reference: &str, tag: &str) -> Result<(), ReferenceError> {
    let first_ok = tag
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let rest_ok = tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if !first_ok || !rest_ok || tag.len() > MAX_TAG_LEN {
        return Err(invalid(reference, format!("invalid tag '{tag}'")));
    }

    Ok(())
}

fn validate_digest(reference: &str, digest: &str) -> Result<(), ReferenceError> {
    let Some((algorithm, hex)) = digest.split_once(':') else {
        return Err(invalid(reference, format!("invalid digest '{digest}'")));
    };

    let algorithm_ok = !algorithm.is_empty()
        && algorithm.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-')
        });
    let hex_ok = hex.len() >= MIN_DIGEST_HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit());

    if !algorithm_ok || !hex_ok {
        return Err(invalid(reference, format!("invalid digest '{digest}'")));
    }

    Ok(())
}
