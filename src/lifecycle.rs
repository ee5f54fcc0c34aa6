use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::constants::{CREATE_FAILED_PHYSICAL_ID, RESOURCE_TYPE};
use crate::container_registry::{Credentials, ImageRegistry, PushCredentialProvider};
use crate::errors::{ProviderError, Tag};
use crate::events::{EventMessage, ProviderEvent, Stage};
use crate::io_models::context::InvocationContext;
use crate::io_models::custom_resource::{CustomResourceRequest, CustomResourceResponse, ResponseData};
use crate::logger::Logger;
use crate::mirror::{MirrorExecutor, MirrorResult};
use crate::models::mirror_request::MirrorRequest;
use crate::models::reference::ImageReference;
use crate::models::repository::RepositoryLocation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl FromStr for RequestType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Create" => Ok(RequestType::Create),
            "Update" => Ok(RequestType::Update),
            "Delete" => Ok(RequestType::Delete),
            other => Err(ProviderError::new_unsupported_request_type(other)),
        }
    }
}

impl Display for RequestType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
        })
    }
}

fn stage_of(err: &ProviderError) -> Stage {
    if let ProviderError::Cancelled { stage, .. } = err {
        return *stage;
    }
    if err.is_validation_error() {
        return Stage::Validate;
    }

    match err.tag() {
        Tag::MalformedCredential | Tag::CredentialUnavailable => Stage::Credentials,
        Tag::SourceFetchFailed | Tag::PlatformNotFound => Stage::FetchSource,
        Tag::UnsupportedRequest => Stage::Dispatch,
        _ => Stage::PushTarget,
    }
}

/// Routes a custom resource request to create, update or delete, and builds the response.
pub struct LifecycleDispatcher<'a> {
    registry: &'a dyn ImageRegistry,
    credential_provider: &'a dyn PushCredentialProvider,
    source_credentials: Option<Credentials>,
    logger: Box<dyn Logger>,
}

impl<'a> LifecycleDispatcher<'a> {
    pub fn new(
        registry: &'a dyn ImageRegistry,
        credential_provider: &'a dyn PushCredentialProvider,
        source_credentials: Option<Credentials>,
        logger: Box<dyn Logger>,
    ) -> Self {
        LifecycleDispatcher {
            registry,
            credential_provider,
            source_credentials,
            logger,
        }
    }

    pub fn handle(&self, request: &CustomResourceRequest, invocation: &InvocationContext) -> CustomResourceResponse {
        let inbound_physical_id = request
            .physical_resource_id
            .clone()
            .unwrap_or_else(|| CREATE_FAILED_PHYSICAL_ID.to_string());

        if request.resource_type != RESOURCE_TYPE {
            let err = ProviderError::new_unsupported_resource_type(&request.resource_type);
            return self.failure(request, invocation, inbound_physical_id, err);
        }

        let request_type = match RequestType::from_str(&request.request_type) {
            Ok(request_type) => request_type,
            Err(err) => return self.failure(request, invocation, inbound_physical_id, err),
        };

        match request_type {
            RequestType::Create => match self.mirror(request, invocation) {
                Ok(result) => success(request, result),
                Err(err) => self.failure(request, invocation, CREATE_FAILED_PHYSICAL_ID.to_string(), err),
            },
            RequestType::Update => match self.mirror(request, invocation) {
                Ok(result) => success(request, result),
                Err(err) => self.failure(request, invocation, inbound_physical_id, err),
            },
            RequestType::Delete => {
                self.delete(request.physical_resource_id.as_deref(), invocation);
                CustomResourceResponse::success(request, inbound_physical_id, None)
            }
        }
    }

    fn mirror(&self, request: &CustomResourceRequest, invocation: &InvocationContext) -> Result<MirrorResult, ProviderError> {
        let mirror_request = MirrorRequest::from_properties(&request.resource_properties)?;
        self.logger.log(ProviderEvent::Info(
            invocation.get_event_details(Stage::Validate),
            EventMessage::new_from_safe(format!(
                "Mirroring {} into {}",
                mirror_request.source(),
                mirror_request.target()
            )),
        ));

        let target_credentials = self
            .credential_provider
            .get_push_credential(mirror_request.location(), invocation)?;

        MirrorExecutor::new(self.registry, self.logger.clone()).execute(
            &mirror_request,
            self.source_credentials.as_ref(),
            &target_credentials,
            invocation,
        )
    }

    // never fails: a resource that cannot be deleted must not block the stack
    fn delete(&self, physical_resource_id: Option<&str>, invocation: &InvocationContext) {
        let details = invocation.get_event_details(Stage::DeleteTarget);
        let warn = |message: EventMessage| self.logger.log(ProviderEvent::Warning(details.clone(), message));

        let physical_resource_id = physical_resource_id.unwrap_or_default();
        let parsed = match physical_resource_id {
            CREATE_FAILED_PHYSICAL_ID => Err(()),
            id => ImageReference::parse(id).map_err(|_| ()),
        };
        let reference = match parsed {
            Ok(reference) => reference,
            Err(()) => {
                self.logger.log(ProviderEvent::Info(
                    details.clone(),
                    EventMessage::new_from_safe(format!(
                        "ignoring invalid physical resource id {physical_resource_id}"
                    )),
                ));
                return;
            }
        };

        let Some(location) = RepositoryLocation::from_reference(&reference) else {
            warn(EventMessage::new_from_safe(format!(
                "ignoring delete of {reference}, not an ECR repository"
            )));
            return;
        };

        let credentials = match self.credential_provider.get_push_credential(&location, invocation) {
            Ok(credentials) => credentials,
            Err(err) => {
                warn(EventMessage::new(
                    format!("ignoring failed delete of image {physical_resource_id}"),
                    Some(err.to_string()),
                ));
                return;
            }
        };

        match self.registry.delete_image(&reference, &credentials, invocation) {
            Ok(()) => self.logger.log(ProviderEvent::Info(
                details.clone(),
                EventMessage::new_from_safe(format!("Deleted image {reference}")),
            )),
            Err(err) => warn(EventMessage::new(
                format!("ignoring failed delete of image {physical_resource_id}"),
                Some(err.to_string()),
            )),
        }
    }

    fn failure(
        &self,
        request: &CustomResourceRequest,
        invocation: &InvocationContext,
        physical_resource_id: String,
        err: ProviderError,
    ) -> CustomResourceResponse {
        let reason = err.to_string();
        self.logger
            .log(ProviderEvent::Error(invocation.get_event_details(stage_of(&err)), err));
        CustomResourceResponse::failed(request, physical_resource_id, reason)
    }
}

fn success(request: &CustomResourceRequest, result: MirrorResult) -> CustomResourceResponse {
    CustomResourceResponse::success(
        request,
        result.canonical_target_reference.clone(),
        Some(ResponseData {
            digest: result.digest,
            image_reference: result.canonical_target_reference,
            platforms: result.platforms,
        }),
    )
}
