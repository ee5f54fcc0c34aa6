use serde_json::Value;
use std::fmt::{Display, Formatter};

use crate::constants::{DEFAULT_PLATFORM_ARCHITECTURE, DEFAULT_PLATFORM_OS};
use crate::errors::ProviderError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    pub variant: Option<String>,
}

impl Platform {
    pub fn new(os: &str, architecture: &str, variant: Option<&str>) -> Self {
        Platform {
            os: os.to_string(),
            architecture: architecture.to_string(),
            variant: variant.map(str::to_string),
        }
    }

    pub fn linux_amd64() -> Self {
        Platform::new(DEFAULT_PLATFORM_OS, DEFAULT_PLATFORM_ARCHITECTURE, None)
    }

    /// Parses `os/arch[/variant]`.
    pub fn parse(platform: &str) -> Result<Self, String> {
        let parts: Vec<&str> = platform.trim().split('/').collect();
        if parts.len() < 2 {
            return Err("expected os/arch[/variant]".to_string());
        }
        if parts.len() > 3 {
            return Err("too many slashes, expected os/arch[/variant]".to_string());
        }

        for part in &parts {
            if part.is_empty() {
                return Err("empty platform component".to_string());
            }
            if !part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            {
                return Err(format!("invalid platform component '{part}'"));
            }
        }

        Ok(Platform {
            os: parts[0].to_ascii_lowercase(),
            architecture: parts[1].to_ascii_lowercase(),
            variant: parts.get(2).map(|variant| variant.to_ascii_lowercase()),
        })
    }

    /// Whether an index entry for `candidate` satisfies this requested platform.
    /// A requested platform without variant accepts any variant.
    pub fn matches(&self, candidate: &Platform) -> bool {
        if self.os != candidate.os || self.architecture != candidate.architecture {
            return false;
        }

        match &self.variant {
            None => true,
            Some(variant) => candidate.variant.as_ref() == Some(variant),
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformSpec {
    /// No platform given, behaves as linux/amd64 (single architecture copies only, like the first release).
    Unspecified,
    /// Copy the whole manifest index.
    All,
    Explicit(Platform),
}

impl PlatformSpec {
    pub fn from_property(value: Option<&Value>) -> Result<Self, ProviderError> {
        let platform = match value {
            None | Some(Value::Null) => return Ok(PlatformSpec::Unspecified),
            Some(Value::String(platform)) => platform,
            Some(other) => {
                return Err(ProviderError::InvalidPlatformFormat {
                    platform: other.to_string(),
                    reason: "platform must be a string".to_string(),
                });
            }
        };

        let trimmed = platform.trim();
        if trimmed.is_empty() {
            return Ok(PlatformSpec::Unspecified);
        }
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(PlatformSpec::All);
        }

        Platform::parse(trimmed)
            .map(PlatformSpec::Explicit)
            .map_err(|reason| ProviderError::InvalidPlatformFormat {
                platform: platform.to_string(),
                reason,
            })
    }

    /// Platform constraint applied while fetching, `None` means the whole index.
    pub fn filter(&self) -> Option<Platform> {
        match self {
            PlatformSpec::Unspecified => Some(Platform::linux_amd64()),
            PlatformSpec::All => None,
            PlatformSpec::Explicit(platform) => Some(platform.clone()),
        }
    }
}
