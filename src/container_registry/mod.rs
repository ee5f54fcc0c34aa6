use base64::Engine;
use base64::engine::general_purpose;
use derivative::Derivative;
use serde_derive::Deserialize;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

use crate::container_registry::errors::ContainerRegistryError;
use crate::io_models::context::InvocationContext;
use crate::models::platform::Platform;
use crate::models::reference::ImageReference;
use crate::models::repository::RepositoryLocation;

pub mod ecr;
pub mod errors;
pub mod skopeo;

#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct Credentials {
    pub username: String,
    #[derivative(Debug = "ignore")]
    pub password: String,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Credentials { username, password }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub digest: String,
    pub media_type: Option<String>,
    pub platform: Option<Platform>,
}

/// What the registry returned for a reference: a single image manifest, or a manifest index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    /// Repository name (host and path) the descriptor was fetched from.
    pub repository: String,
    /// Where the content is copied from: the source reference, or `repository@digest` for an index child.
    pub locator: String,
    /// Digest known before any copy: pinned by the source reference, or listed by the parent index.
    pub digest: Option<String>,
    pub media_type: Option<String>,
    pub platform: Option<Platform>,
    pub is_index: bool,
    pub manifests: Vec<IndexEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    media_type: Option<String>,
    manifests: Option<Vec<RawIndexEntry>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIndexEntry {
    digest: String,
    media_type: Option<String>,
    platform: Option<RawPlatform>,
}

#[derive(Deserialize)]
struct RawPlatform {
    os: String,
    architecture: String,
    variant: Option<String>,
}

impl Descriptor {
    pub fn from_raw_manifest(source: &ImageReference, raw: &str) -> Result<Self, ContainerRegistryError> {
        let manifest: RawManifest =
            serde_json::from_str(raw).map_err(|err| ContainerRegistryError::InvalidManifest {
                reference: source.to_string(),
                raw_error_message: err.to_string(),
            })?;

        let is_index = manifest.manifests.is_some();
        let manifests = manifest
            .manifests
            .unwrap_or_default()
            .into_iter()
            .map(|entry| IndexEntry {
                digest: entry.digest,
                media_type: entry.media_type,
                platform: entry
                    .platform
                    .map(|p| Platform::new(&p.os, &p.architecture, p.variant.as_deref().filter(|v| !v.is_empty()))),
            })
            .collect();

        Ok(Descriptor {
            repository: source.name(),
            locator: source.source_locator(),
            digest: source.digest().map(str::to_string),
            media_type: manifest.media_type,
            platform: None,
            is_index,
            manifests,
        })
    }

    /// Child manifest of an index matching `platform`; a single image is returned as is.
    pub fn resolve_platform(&self, platform: &Platform) -> Result<Descriptor, ContainerRegistryError> {
        if !self.is_index {
            return Ok(self.clone());
        }

        let entry = self
            .manifests
            .iter()
            .find(|entry| entry.platform.as_ref().is_some_and(|candidate| platform.matches(candidate)))
            .ok_or_else(|| ContainerRegistryError::PlatformNotFound {
                platform: platform.to_string(),
                available: self.platforms(),
            })?;

        Ok(Descriptor {
            repository: self.repository.clone(),
            locator: format!("{}@{}", self.repository, entry.digest),
            digest: Some(entry.digest.clone()),
            media_type: entry.media_type.clone(),
            platform: entry.platform.clone(),
            is_index: false,
            manifests: vec![],
        })
    }

    /// Platforms listed by an index, in manifest order.
    pub fn platforms(&self) -> Vec<String> {
        self.manifests
            .iter()
            .filter_map(|entry| entry.platform.as_ref().map(Platform::to_string))
            .collect()
    }
}

/// Registry capability: read a descriptor, copy it somewhere else, delete an image.
pub trait ImageRegistry {
    /// With a platform filter an index resolves to the matching child manifest.
    fn fetch_descriptor(
        &self,
        reference: &ImageReference,
        platform_filter: Option<&Platform>,
        credentials: Option<&Credentials>,
        invocation: &InvocationContext,
    ) -> Result<Descriptor, ContainerRegistryError>;

    /// Returns the digest of the manifest written at `target`.
    fn push_descriptor(
        &self,
        target: &ImageReference,
        descriptor: &Descriptor,
        source_credentials: Option<&Credentials>,
        target_credentials: &Credentials,
        invocation: &InvocationContext,
    ) -> Result<String, ContainerRegistryError>;

    fn delete_image(
        &self,
        reference: &ImageReference,
        credentials: &Credentials,
        invocation: &InvocationContext,
    ) -> Result<(), ContainerRegistryError>;
}

pub trait PushCredentialProvider {
    fn get_push_credential(
        &self,
        location: &RepositoryLocation,
        invocation: &InvocationContext,
    ) -> Result<Credentials, crate::errors::ProviderError>;
}

/// Registry host as expected in an auth file, Docker Hub when the reference has none.
pub fn auth_file_key(reference: &ImageReference) -> String {
    reference
        .registry_host()
        .unwrap_or(crate::constants::DOCKER_HUB_REGISTRY)
        .to_string()
}

/// Writes a containers auth file (`{"auths": {host: {"auth": base64(user:pass)}}}`).
/// When a host is listed twice the first credential is kept.
/// The file is removed when the returned handle is dropped.
pub fn write_auth_file(auths: &[(String, &Credentials)]) -> Result<NamedTempFile, ContainerRegistryError> {
    let mut entries: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
    for (host, credentials) in auths {
        if entries.contains_key(host.as_str()) {
            warn!("registry {} listed twice in auth file, keeping the first credential", host);
            continue;
        }
        let auth = general_purpose::STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
        entries.insert(host.as_str(), serde_json::json!({ "auth": auth }));
    }
    let content = serde_json::json!({ "auths": entries });

    let to_error = |err: std::io::Error| ContainerRegistryError::CannotWriteAuthFile {
        raw_error_message: err.to_string(),
    };
    let mut file = NamedTempFile::new().map_err(to_error)?;
    file.write_all(content.to_string().as_bytes()).map_err(to_error)?;
    file.flush().map_err(to_error)?;

    Ok(file)
}
