use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{AWS_DOMAIN, ECR_REGISTRY_DOMAIN};
use crate::errors::ProviderError;
use crate::models::reference::{ImageReference, ReferenceKind};

// The name must start with a letter and can only contain lowercase letters, numbers, hyphens, underscores, periods and forward slashes.
static ECR_REPOSITORY_ARN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:aws:ecr:([a-z\d-]+):(\d+):repository/([a-z][a-z\d\-_/.]+)$")
        .expect("ECR repository ARN pattern must compile")
});

static ECR_REGISTRY_HOST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\.dkr\.ecr\.([a-z\d-]+)\.amazonaws\.com$").expect("ECR registry host pattern must compile")
});

/// An ECR repository, as designated by its ARN.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryLocation {
    pub region: String,
    pub account_id: String,
    pub repository_name: String,
}

impl RepositoryLocation {
    /// Syntactic check only, the repository is not looked up.
    pub fn from_arn(arn: &str) -> Result<Self, ProviderError> {
        let captures = ECR_REPOSITORY_ARN_PATTERN
            .captures(arn)
            .ok_or_else(|| ProviderError::InvalidRepositoryIdentifier { arn: arn.to_string() })?;

        Ok(RepositoryLocation {
            region: captures[1].to_string(),
            account_id: captures[2].to_string(),
            repository_name: captures[3].to_string(),
        })
    }

    /// Recovers the repository from a reference pointing into a private ECR registry.
    pub fn from_reference(reference: &ImageReference) -> Option<Self> {
        let host = reference.registry_host()?;
        let captures = ECR_REGISTRY_HOST_PATTERN.captures(host)?;

        Some(RepositoryLocation {
            region: captures[2].to_string(),
            account_id: captures[1].to_string(),
            repository_name: reference.repository_path().to_string(),
        })
    }

    pub fn registry_host(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.account_id, ECR_REGISTRY_DOMAIN, self.region, AWS_DOMAIN
        )
    }

    /// Where the source gets mirrored: named by the source tag when there is one, by its digest otherwise.
    /// Two sources sharing a tag land on the same target tag.
    pub fn target_reference(&self, source: &ImageReference) -> ImageReference {
        let kind = match source.kind() {
            ReferenceKind::NameTag(tag) | ReferenceKind::NameTagDigest(tag, _) => ReferenceKind::NameTag(tag.clone()),
            ReferenceKind::NameDigest(digest) => ReferenceKind::NameDigest(digest.clone()),
            ReferenceKind::NameOnly => match source.tag() {
                Some(tag) => ReferenceKind::NameTag(tag.to_string()),
                None => ReferenceKind::NameOnly,
            },
        };

        ImageReference::new(Some(self.registry_host()), self.repository_name.clone(), kind)
    }
}
