use crate::container_registry::{Credentials, ImageRegistry};
use crate::errors::ProviderError;
use crate::events::{EventMessage, ProviderEvent, Stage};
use crate::io_models::context::InvocationContext;
use crate::logger::Logger;
use crate::models::mirror_request::MirrorRequest;
use crate::models::platform::PlatformSpec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorResult {
    /// Digest of the manifest (or index) written in the target repository.
    pub digest: String,
    pub canonical_target_reference: String,
    pub platforms: Vec<String>,
}

/// One resolve-and-mirror pass, no retry.
pub struct MirrorExecutor<'a> {
    registry: &'a dyn ImageRegistry,
    logger: Box<dyn Logger>,
}

impl<'a> MirrorExecutor<'a> {
    pub fn new(registry: &'a dyn ImageRegistry, logger: Box<dyn Logger>) -> Self {
        MirrorExecutor { registry, logger }
    }

    pub fn execute(
        &self,
        request: &MirrorRequest,
        source_credentials: Option<&Credentials>,
        target_credentials: &Credentials,
        invocation: &InvocationContext,
    ) -> Result<MirrorResult, ProviderError> {
        let source = request.source();
        let target = request.target();
        let filter = request.platform().filter();

        self.logger.log(ProviderEvent::Info(
            invocation.get_event_details(Stage::FetchSource),
            EventMessage::new_from_safe(format!(
                "Fetching {} for platform {}",
                source,
                filter.as_ref().map_or("all".to_string(), |platform| platform.to_string())
            )),
        ));

        let descriptor = self
            .registry
            .fetch_descriptor(source, filter.as_ref(), source_credentials, invocation)
            .map_err(|err| ProviderError::new_source_fetch_failed(&source.to_string(), err))?;

        let platforms = match (request.platform(), &filter) {
            (PlatformSpec::All, _) => descriptor.platforms(),
            (_, Some(platform)) => vec![platform.to_string()],
            (_, None) => vec![],
        };

        self.logger.log(ProviderEvent::Info(
            invocation.get_event_details(Stage::PushTarget),
            EventMessage::new_from_safe(format!("Pushing {} to {}", descriptor.locator, target)),
        ));

        let digest = self
            .registry
            .push_descriptor(target, &descriptor, source_credentials, target_credentials, invocation)
            .map_err(|err| ProviderError::new_target_push_failed(&target.to_string(), err))?;

        self.logger.log(ProviderEvent::Info(
            invocation.get_event_details(Stage::PushTarget),
            EventMessage::new_from_safe(format!("Pushed {target} with digest {digest}")),
        ));

        Ok(MirrorResult {
            digest,
            canonical_target_reference: target.to_string(),
            platforms,
        })
    }
}
