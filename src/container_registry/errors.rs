use itertools::Itertools;
use thiserror::Error;

use crate::cmd::skopeo::SkopeoError;

#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum ContainerRegistryError {
    #[error("Registry tool failed: {raw_error_message}")]
    ToolError { raw_error_message: String },
    #[error("Registry operation aborted: {raw_error_message}")]
    Aborted { raw_error_message: String },
    #[error("Cannot decode manifest of `{reference}`: {raw_error_message}")]
    InvalidManifest {
        reference: String,
        raw_error_message: String,
    },
    #[error("Platform `{platform}` is not part of the image index, available platforms: [{}]", .available.iter().join(", "))]
    PlatformNotFound { platform: String, available: Vec<String> },
    #[error("Cannot write registry auth file: {raw_error_message}")]
    CannotWriteAuthFile { raw_error_message: String },
    #[error("Registry did not report the pushed digest of `{reference}`: {raw_error_message}")]
    MissingPushedDigest {
        reference: String,
        raw_error_message: String,
    },
}

impl From<SkopeoError> for ContainerRegistryError {
    fn from(err: SkopeoError) -> Self {
        match err {
            SkopeoError::Aborted { raw_error_message } | SkopeoError::Timeout { raw_error_message } => {
                ContainerRegistryError::Aborted { raw_error_message }
            }
            err => ContainerRegistryError::ToolError {
                raw_error_message: err.to_string(),
            },
        }
    }
}
