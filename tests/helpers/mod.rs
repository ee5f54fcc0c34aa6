use std::sync::{Arc, Mutex};
use std::time::Duration;

use container_image_provider::container_registry::errors::ContainerRegistryError;
use container_image_provider::container_registry::{Credentials, Descriptor, ImageRegistry, PushCredentialProvider};
use container_image_provider::errors::ProviderError;
use container_image_provider::events::ProviderEvent;
use container_image_provider::io_models::context::InvocationContext;
use container_image_provider::io_models::custom_resource::CustomResourceRequest;
use container_image_provider::logger::Logger;
use container_image_provider::models::platform::Platform;
use container_image_provider::models::reference::ImageReference;
use container_image_provider::models::repository::RepositoryLocation;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub const PYTHON_DIGEST: &str = "sha256:3d35a404db586d00a4ee5a65fd1496fe019ed4bdc068d436a67ce5b64b8b9659";
pub const DEMO_REPOSITORY_ARN: &str = "arn:aws:ecr:eu-central-1:444093529715:repository/cfn-container-image-provider-demo";
pub const DEMO_REGISTRY: &str = "444093529715.dkr.ecr.eu-central-1.amazonaws.com";

pub const AMD64_DIGEST: &str = "sha256:a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";
pub const ARM64_DIGEST: &str = "sha256:b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2";
pub const ARMV7_DIGEST: &str = "sha256:c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3";
// what the fake registry reports for a manifest fetched by tag
pub const TAGGED_MANIFEST_DIGEST: &str = "sha256:f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6f6";

pub fn multi_arch_index() -> String {
    json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.index.v1+json",
        "manifests": [
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": AMD64_DIGEST,
                "platform": { "os": "linux", "architecture": "amd64" }
            },
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": ARMV7_DIGEST,
                "platform": { "os": "linux", "architecture": "arm", "variant": "v7" }
            },
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": ARM64_DIGEST,
                "platform": { "os": "linux", "architecture": "arm64", "variant": "v8" }
            },
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": "sha256:d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4",
                "annotations": { "vnd.docker.reference.type": "attestation-manifest" }
            }
        ]
    })
    .to_string()
}

pub fn single_arch_manifest() -> String {
    json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
        "config": {
            "mediaType": "application/vnd.docker.container.image.v1+json",
            "size": 1472,
            "digest": "sha256:e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5"
        },
        "layers": []
    })
    .to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryCall {
    Fetch { reference: String, platform: Option<String> },
    Push { target: String, locator: String, with_source_credentials: bool },
    Delete { reference: String },
}

/// In-memory registry serving one manifest for every source reference.
pub struct FakeRegistry {
    manifest: Option<String>,
    push_error: Option<String>,
    delete_error: Option<String>,
    pub calls: Mutex<Vec<RegistryCall>>,
}

impl FakeRegistry {
    pub fn serving(manifest: String) -> Self {
        FakeRegistry {
            manifest: Some(manifest),
            push_error: None,
            delete_error: None,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn empty() -> Self {
        FakeRegistry {
            manifest: None,
            push_error: None,
            delete_error: None,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn failing_push(mut self, message: &str) -> Self {
        self.push_error = Some(message.to_string());
        self
    }

    pub fn failing_delete(mut self, message: &str) -> Self {
        self.delete_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: RegistryCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl ImageRegistry for FakeRegistry {
    fn fetch_descriptor(
        &self,
        reference: &ImageReference,
        platform_filter: Option<&Platform>,
        _credentials: Option<&Credentials>,
        _invocation: &InvocationContext,
    ) -> Result<Descriptor, ContainerRegistryError> {
        self.record(RegistryCall::Fetch {
            reference: reference.source_locator(),
            platform: platform_filter.map(Platform::to_string),
        });

        let manifest = self.manifest.as_ref().ok_or_else(|| ContainerRegistryError::ToolError {
            raw_error_message: "manifest unknown".to_string(),
        })?;
        let descriptor = Descriptor::from_raw_manifest(reference, manifest)?;

        match platform_filter {
            Some(platform) => descriptor.resolve_platform(platform),
            None => Ok(descriptor),
        }
    }

    fn push_descriptor(
        &self,
        target: &ImageReference,
        descriptor: &Descriptor,
        source_credentials: Option<&Credentials>,
        _target_credentials: &Credentials,
        _invocation: &InvocationContext,
    ) -> Result<String, ContainerRegistryError> {
        self.record(RegistryCall::Push {
            target: target.to_string(),
            locator: descriptor.locator.clone(),
            with_source_credentials: source_credentials.is_some(),
        });

        match &self.push_error {
            Some(message) => Err(ContainerRegistryError::ToolError {
                raw_error_message: message.clone(),
            }),
            None => Ok(descriptor
                .digest
                .clone()
                .unwrap_or_else(|| TAGGED_MANIFEST_DIGEST.to_string())),
        }
    }

    fn delete_image(
        &self,
        reference: &ImageReference,
        _credentials: &Credentials,
        _invocation: &InvocationContext,
    ) -> Result<(), ContainerRegistryError> {
        self.record(RegistryCall::Delete {
            reference: reference.to_string(),
        });

        match &self.delete_error {
            Some(message) => Err(ContainerRegistryError::ToolError {
                raw_error_message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub struct FakeCredentialProvider {
    error: Option<ProviderError>,
    pub requested: Mutex<Vec<RepositoryLocation>>,
}

impl FakeCredentialProvider {
    pub fn new() -> Self {
        FakeCredentialProvider {
            error: None,
            requested: Mutex::new(vec![]),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        FakeCredentialProvider {
            error: Some(error),
            requested: Mutex::new(vec![]),
        }
    }

    pub fn requested(&self) -> Vec<RepositoryLocation> {
        self.requested.lock().map(|requested| requested.clone()).unwrap_or_default()
    }
}

impl PushCredentialProvider for FakeCredentialProvider {
    fn get_push_credential(
        &self,
        location: &RepositoryLocation,
        _invocation: &InvocationContext,
    ) -> Result<Credentials, ProviderError> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(location.clone());
        }

        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(Credentials::new("AWS".to_string(), "ecr-token".to_string())),
        }
    }
}

/// Keeps every event, to assert on what was reported.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    pub events: Arc<Mutex<Vec<ProviderEvent>>>,
}

impl RecordingLogger {
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|events| events.iter().map(ProviderEvent::message).collect())
            .unwrap_or_default()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, event: ProviderEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn clone_dyn(&self) -> Box<dyn Logger> {
        Box::new(self.clone())
    }
}

pub fn invocation(request: &CustomResourceRequest) -> InvocationContext {
    InvocationContext::new(
        request.request_id.clone(),
        request.stack_id.clone(),
        request.logical_resource_id.clone(),
        request.request_type.clone(),
        Duration::from_secs(60),
        CancellationToken::new(),
    )
}

pub fn request(request_type: &str, properties: Value, physical_resource_id: Option<&str>) -> CustomResourceRequest {
    let mut request = json!({
        "RequestType": request_type,
        "ResponseURL": "https://cloudformation-custom-resource-response-eucentral1.s3.amazonaws.com/response",
        "StackId": "arn:aws:cloudformation:eu-central-1:444093529715:stack/demo/8c3d",
        "RequestId": "5ba1b07c-0d2c-4b4e-9f1b-3e1a4b2f1c11",
        "ResourceType": "Custom::ContainerImage",
        "LogicalResourceId": "PythonImage",
        "ResourceProperties": properties,
    });
    if let Some(physical_resource_id) = physical_resource_id {
        request["PhysicalResourceId"] = json!(physical_resource_id);
    }

    serde_json::from_value(request).expect("valid custom resource request")
}
