use itertools::Itertools;
use strum_macros::Display;
use thiserror::Error;

use crate::container_registry::errors::ContainerRegistryError;
use crate::events::Stage;

/// Tag: stable identifier of an error kind, emitted in structured logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    MissingProperty,
    InvalidReferenceFormat,
    InvalidRepositoryIdentifier,
    InvalidPlatformFormat,
    SourceFetchFailed,
    PlatformNotFound,
    TargetPushFailed,
    MalformedCredential,
    CredentialUnavailable,
    UnsupportedRequest,
    Cancelled,
}

/// ProviderError: terminal error of an invocation. Its message is reported verbatim to the orchestrator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{property} is missing or not a string")]
    MissingProperty { property: String },

    #[error("{reference}: invalid reference format: {reason} at position {position}")]
    InvalidReferenceFormat {
        reference: String,
        position: usize,
        reason: String,
    },

    #[error("Invalid AWS ECR repository ARN: {arn}")]
    InvalidRepositoryIdentifier { arn: String },

    #[error("invalid Platform format, {reason}: {platform}")]
    InvalidPlatformFormat { platform: String, reason: String },

    #[error("failed to get descriptor for {reference}: {raw_error_message}")]
    SourceFetchFailed {
        reference: String,
        raw_error_message: String,
    },

    #[error("platform {platform} not found in {reference}, available platforms: [{}]", .available.iter().join(", "))]
    PlatformNotFound {
        reference: String,
        platform: String,
        available: Vec<String>,
    },

    #[error("failed to push {reference}: {raw_error_message}")]
    TargetPushFailed {
        reference: String,
        raw_error_message: String,
    },

    #[error("malformed registry credential: {reason}")]
    MalformedCredential { reason: String },

    #[error("cannot get push credential for registry {registry}: {raw_error_message}")]
    CredentialUnavailable {
        registry: String,
        raw_error_message: String,
    },

    #[error("unsupported {kind}: {value}")]
    UnsupportedRequest { kind: String, value: String },

    #[error("operation cancelled: {raw_error_message}")]
    Cancelled { stage: Stage, raw_error_message: String },
}

impl ProviderError {
    pub fn tag(&self) -> Tag {
        match self {
            ProviderError::MissingProperty { .. } => Tag::MissingProperty,
            ProviderError::InvalidReferenceFormat { .. } => Tag::InvalidReferenceFormat,
            ProviderError::InvalidRepositoryIdentifier { .. } => Tag::InvalidRepositoryIdentifier,
            ProviderError::InvalidPlatformFormat { .. } => Tag::InvalidPlatformFormat,
            ProviderError::SourceFetchFailed { .. } => Tag::SourceFetchFailed,
            ProviderError::PlatformNotFound { .. } => Tag::PlatformNotFound,
            ProviderError::TargetPushFailed { .. } => Tag::TargetPushFailed,
            ProviderError::MalformedCredential { .. } => Tag::MalformedCredential,
            ProviderError::CredentialUnavailable { .. } => Tag::CredentialUnavailable,
            ProviderError::UnsupportedRequest { .. } => Tag::UnsupportedRequest,
            ProviderError::Cancelled { .. } => Tag::Cancelled,
        }
    }

    /// Validation errors are raised before any network call.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.tag(),
            Tag::MissingProperty | Tag::InvalidReferenceFormat | Tag::InvalidRepositoryIdentifier | Tag::InvalidPlatformFormat
        )
    }

    pub fn new_unsupported_request_type(request_type: &str) -> Self {
        ProviderError::UnsupportedRequest {
            kind: "request type".to_string(),
            value: request_type.to_string(),
        }
    }

    pub fn new_unsupported_resource_type(resource_type: &str) -> Self {
        ProviderError::UnsupportedRequest {
            kind: "resource type".to_string(),
            value: resource_type.to_string(),
        }
    }

    pub fn new_source_fetch_failed(reference: &str, err: ContainerRegistryError) -> Self {
        match err {
            ContainerRegistryError::Aborted { raw_error_message } => ProviderError::Cancelled {
                stage: Stage::FetchSource,
                raw_error_message,
            },
            ContainerRegistryError::PlatformNotFound { platform, available } => ProviderError::PlatformNotFound {
                reference: reference.to_string(),
                platform,
                available,
            },
            err => ProviderError::SourceFetchFailed {
                reference: reference.to_string(),
                raw_error_message: err.to_string(),
            },
        }
    }

    pub fn new_target_push_failed(reference: &str, err: ContainerRegistryError) -> Self {
        match err {
            ContainerRegistryError::Aborted { raw_error_message } => ProviderError::Cancelled {
                stage: Stage::PushTarget,
                raw_error_message,
            },
            err => ProviderError::TargetPushFailed {
                reference: reference.to_string(),
                raw_error_message: err.to_string(),
            },
        }
    }
}
