//! Container image references: `[registry/]repository[:tag][@digest]`.
//!
//! Parsing follows the distribution reference grammar:
//!
//! ```text
//! reference        := name [ ":" tag ] [ "@" digest ]
//! name             := [ domain "/" ] path-component { "/" path-component }
//! domain           := domain-component { "." domain-component } [ ":" port ]
//! domain-component := [a-zA-Z0-9] | [a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]
//! path-component   := alnum { separator alnum }
//! separator        := "." | "_" | "__" | "-"+
//! tag              := [A-Za-z0-9_][A-Za-z0-9_.-]{0,127}
//! digest           := algorithm ":" hex
//! ```
//!
//! The first name component is a registry host when it contains a `.` or a `:`,
//! or is `localhost`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::constants::DEFAULT_TAG;
use crate::errors::ProviderError;

const NAME_TOTAL_LENGTH_MAX: usize = 255;
const TAG_LENGTH_MAX: usize = 128;
const DIGEST_HEX_LENGTH_MIN: usize = 32;

/// What the user wrote after the repository name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    NameOnly,
    NameTag(String),
    NameDigest(String),
    NameTagDigest(String, String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageReference {
    registry_host: Option<String>,
    repository_path: String,
    kind: ReferenceKind,
}

// (position, reason), position relative to the parsed fragment
type GrammarError = (usize, String);

impl ImageReference {
    pub fn new(registry_host: Option<String>, repository_path: String, kind: ReferenceKind) -> Self {
        ImageReference {
            registry_host,
            repository_path,
            kind,
        }
    }

    pub fn parse(reference: &str) -> Result<Self, ProviderError> {
        let invalid = |position: usize, reason: String| ProviderError::InvalidReferenceFormat {
            reference: reference.to_string(),
            position,
            reason,
        };

        if reference.is_empty() {
            return Err(invalid(0, "reference is empty".to_string()));
        }

        let (name_and_tag, digest) = match reference.find('@') {
            Some(at) => {
                let digest = &reference[at + 1..];
                parse_digest(digest).map_err(|(pos, reason)| invalid(at + 1 + pos, reason))?;
                (&reference[..at], Some(digest.to_string()))
            }
            None => (reference, None),
        };

        let last_slash = name_and_tag.rfind('/');
        let (name, tag) = match name_and_tag.rfind(':') {
            Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
                let tag = &name_and_tag[colon + 1..];
                parse_tag(tag).map_err(|(pos, reason)| invalid(colon + 1 + pos, reason))?;
                (&name_and_tag[..colon], Some(tag.to_string()))
            }
            _ => (name_and_tag, None),
        };

        if name.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(invalid(
                NAME_TOTAL_LENGTH_MAX,
                format!("repository name must not be more than {NAME_TOTAL_LENGTH_MAX} characters"),
            ));
        }

        let (registry_host, repository_path) = parse_name(name).map_err(|(pos, reason)| invalid(pos, reason))?;

        let kind = match (tag, digest) {
            (None, None) => ReferenceKind::NameOnly,
            (Some(tag), None) => ReferenceKind::NameTag(tag),
            (None, Some(digest)) => ReferenceKind::NameDigest(digest),
            (Some(tag), Some(digest)) => ReferenceKind::NameTagDigest(tag, digest),
        };

        Ok(ImageReference {
            registry_host,
            repository_path,
            kind,
        })
    }

    pub fn registry_host(&self) -> Option<&str> {
        self.registry_host.as_deref()
    }

    pub fn repository_path(&self) -> &str {
        &self.repository_path
    }

    pub fn kind(&self) -> &ReferenceKind {
        &self.kind
    }

    /// Repository name as written: host (if any) and path.
    pub fn name(&self) -> String {
        match &self.registry_host {
            Some(host) => format!("{}/{}", host, self.repository_path),
            None => self.repository_path.to_string(),
        }
    }

    /// Resolved tag, `latest` when neither a tag nor a digest was given.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            ReferenceKind::NameOnly => Some(DEFAULT_TAG),
            ReferenceKind::NameTag(tag) | ReferenceKind::NameTagDigest(tag, _) => Some(tag),
            ReferenceKind::NameDigest(_) => None,
        }
    }

    pub fn digest(&self) -> Option<&str> {
        match &self.kind {
            ReferenceKind::NameOnly | ReferenceKind::NameTag(_) => None,
            ReferenceKind::NameDigest(digest) | ReferenceKind::NameTagDigest(_, digest) => Some(digest),
        }
    }

    /// Where to fetch the content from: a digest, when given, pins it.
    pub fn source_locator(&self) -> String {
        match (self.digest(), self.tag()) {
            (Some(digest), _) => format!("{}@{}", self.name(), digest),
            (None, Some(tag)) => format!("{}:{}", self.name(), tag),
            (None, None) => self.name(),
        }
    }
}

impl Display for ImageReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())?;
        if let Some(tag) = self.tag() {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = self.digest() {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for ImageReference {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageReference::parse(s)
    }
}

fn is_registry_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn parse_name(name: &str) -> Result<(Option<String>, String), GrammarError> {
    let (registry_host, path, path_offset) = match name.split_once('/') {
        Some((first, rest)) if is_registry_host(first) => {
            parse_domain(first)?;
            (Some(first.to_string()), rest, first.len() + 1)
        }
        _ => (None, name, 0),
    };

    let mut offset = path_offset;
    for component in path.split('/') {
        parse_path_component(component).map_err(|(pos, reason)| (offset + pos, reason))?;
        offset += component.len() + 1;
    }

    Ok((registry_host, path.to_string()))
}

fn parse_domain(domain: &str) -> Result<(), GrammarError> {
    let (host, port) = match domain.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (domain, None),
    };

    let mut offset = 0;
    for component in host.split('.') {
        let bytes = component.as_bytes();
        if bytes.is_empty() {
            return Err((offset, "empty registry host component".to_string()));
        }
        if let Some(pos) = bytes.iter().position(|b| !b.is_ascii_alphanumeric() && *b != b'-') {
            return Err((offset + pos, "invalid character in registry host".to_string()));
        }
        if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
            return Err((offset, "registry host component cannot start or end with '-'".to_string()));
        }
        offset += component.len() + 1;
    }

    if let Some(port) = port {
        let port_offset = host.len() + 1;
        if port.is_empty() {
            return Err((port_offset, "registry port is empty".to_string()));
        }
        if let Some(pos) = port.bytes().position(|b| !b.is_ascii_digit()) {
            return Err((port_offset + pos, "registry port must be numeric".to_string()));
        }
    }

    Ok(())
}

fn parse_path_component(component: &str) -> Result<(), GrammarError> {
    let bytes = component.as_bytes();
    if bytes.is_empty() {
        return Err((0, "repository name component is empty".to_string()));
    }

    let mut i = 0;
    let mut expect_alnum = true;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_uppercase() {
            return Err((i, "repository name must be lowercase".to_string()));
        }

        if b.is_ascii_lowercase() || b.is_ascii_digit() {
            expect_alnum = false;
            i += 1;
            continue;
        }

        if expect_alnum {
            return Err((i, "repository name component must start with a lowercase letter or digit".to_string()));
        }

        // separator: ".", "_", "__" or a run of "-"
        let separator_length = match b {
            b'.' => 1,
            b'_' if bytes.get(i + 1) == Some(&b'_') => 2,
            b'_' => 1,
            b'-' => bytes[i..].iter().take_while(|c| **c == b'-').count(),
            _ => return Err((i, format!("invalid character '{}' in repository name", b as char))),
        };
        i += separator_length;
        expect_alnum = true;
    }

    if expect_alnum {
        return Err((bytes.len() - 1, "repository name component cannot end with a separator".to_string()));
    }

    Ok(())
}

fn parse_tag(tag: &str) -> Result<(), GrammarError> {
    let bytes = tag.as_bytes();
    match bytes.first() {
        None => return Err((0, "tag is empty".to_string())),
        Some(b) if !(b.is_ascii_alphanumeric() || *b == b'_') => {
            return Err((0, "tag must start with a letter, a digit or '_'".to_string()));
        }
        _ => {}
    }

    if let Some(pos) = bytes
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')))
    {
        return Err((pos, "invalid character in tag".to_string()));
    }

    if bytes.len() > TAG_LENGTH_MAX {
        return Err((TAG_LENGTH_MAX, format!("tag must not be more than {TAG_LENGTH_MAX} characters")));
    }

    Ok(())
}

fn parse_digest(digest: &str) -> Result<(), GrammarError> {
    let (algorithm, hex) = digest
        .split_once(':')
        .ok_or_else(|| (0, "digest must be formatted as algorithm:hex".to_string()))?;

    let mut offset = 0;
    for component in algorithm.split(['+', '.', '_', '-']) {
        let bytes = component.as_bytes();
        match bytes.first() {
            Some(b) if b.is_ascii_alphabetic() => {}
            _ => return Err((offset, "invalid digest algorithm".to_string())),
        }
        if let Some(pos) = bytes.iter().position(|b| !b.is_ascii_alphanumeric()) {
            return Err((offset + pos, "invalid digest algorithm".to_string()));
        }
        offset += component.len() + 1;
    }

    let hex_offset = algorithm.len() + 1;
    if let Some(pos) = hex.bytes().position(|b| !b.is_ascii_hexdigit()) {
        return Err((hex_offset + pos, "digest must be hexadecimal".to_string()));
    }

    let expected_length = match algorithm {
        "sha256" => Some(64),
        "sha512" => Some(128),
        _ => None,
    };
    if expected_length.is_some() {
        if let Some(pos) = hex.bytes().position(|b| b.is_ascii_uppercase()) {
            return Err((hex_offset + pos, format!("{algorithm} digest must be lowercase hexadecimal")));
        }
    }
    match expected_length {
        Some(length) if hex.len() != length => Err((
            hex_offset,
            format!("{algorithm} digest must be {length} hexadecimal characters"),
        )),
        None if hex.len() < DIGEST_HEX_LENGTH_MIN => Err((
            hex_offset,
            format!("digest must be at least {DIGEST_HEX_LENGTH_MIN} hexadecimal characters"),
        )),
        _ => Ok(()),
    }
}
