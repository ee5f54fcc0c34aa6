use serde_json::{Map, Value};

use crate::constants::{PROPERTY_IMAGE_REFERENCE, PROPERTY_PLATFORM, PROPERTY_REPOSITORY_ARN};
use crate::errors::ProviderError;
use crate::models::platform::PlatformSpec;
use crate::models::reference::ImageReference;
use crate::models::repository::RepositoryLocation;

/// Validated configuration of one mirror, built from the resource properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorRequest {
    source: ImageReference,
    target: ImageReference,
    location: RepositoryLocation,
    platform: PlatformSpec,
}

impl MirrorRequest {
    pub fn new(source: ImageReference, location: RepositoryLocation, platform: PlatformSpec) -> Self {
        let target = location.target_reference(&source);
        MirrorRequest {
            source,
            target,
            location,
            platform,
        }
    }

    /// Only the documented defaults apply: `latest` tag and linux/amd64 platform.
    pub fn from_properties(properties: &Map<String, Value>) -> Result<Self, ProviderError> {
        let image_reference = string_property(properties, PROPERTY_IMAGE_REFERENCE)?;
        let source = ImageReference::parse(image_reference)?;

        let repository_arn = string_property(properties, PROPERTY_REPOSITORY_ARN)?;
        let location = RepositoryLocation::from_arn(repository_arn)?;

        let platform = PlatformSpec::from_property(properties.get(PROPERTY_PLATFORM))?;

        Ok(MirrorRequest::new(source, location, platform))
    }

    pub fn source(&self) -> &ImageReference {
        &self.source
    }

    pub fn target(&self) -> &ImageReference {
        &self.target
    }

    pub fn location(&self) -> &RepositoryLocation {
        &self.location
    }

    pub fn platform(&self) -> &PlatformSpec {
        &self.platform
    }
}

fn string_property<'a>(properties: &'a Map<String, Value>, name: &str) -> Result<&'a str, ProviderError> {
    properties
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::MissingProperty {
            property: name.to_string(),
        })
}
