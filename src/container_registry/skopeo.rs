use tempfile::NamedTempFile;

use crate::cmd::command::CommandKiller;
use crate::cmd::skopeo::{CopyMode, Skopeo};
use crate::container_registry::errors::ContainerRegistryError;
use crate::container_registry::{Credentials, Descriptor, ImageRegistry, auth_file_key, write_auth_file};
use crate::events::{EventMessage, ProviderEvent, Stage};
use crate::io_models::context::InvocationContext;
use crate::logger::Logger;
use crate::models::platform::Platform;
use crate::models::reference::ImageReference;

/// Registry capability backed by the `skopeo` binary. Blobs never transit through this process.
pub struct SkopeoRegistry {
    skopeo: Skopeo,
    logger: Box<dyn Logger>,
}

impl SkopeoRegistry {
    pub fn new(skopeo: Skopeo, logger: Box<dyn Logger>) -> Self {
        SkopeoRegistry { skopeo, logger }
    }

    fn log_line(&self, invocation: &InvocationContext, stage: Stage, line: String, is_error: bool) {
        let details = invocation.get_event_details(stage);
        let message = EventMessage::new_from_safe(line);
        self.logger.log(match is_error {
            true => ProviderEvent::Warning(details, message),
            false => ProviderEvent::Debug(details, message),
        });
    }
}

fn optional_auth_file(
    auths: Vec<(String, &Credentials)>,
) -> Result<Option<NamedTempFile>, ContainerRegistryError> {
    if auths.is_empty() {
        return Ok(None);
    }

    write_auth_file(&auths).map(Some)
}

impl ImageRegistry for SkopeoRegistry {
    fn fetch_descriptor(
        &self,
        reference: &ImageReference,
        platform_filter: Option<&Platform>,
        credentials: Option<&Credentials>,
        invocation: &InvocationContext,
    ) -> Result<Descriptor, ContainerRegistryError> {
        let auth_file = optional_auth_file(
            credentials
                .map(|credentials| vec![(auth_file_key(reference), credentials)])
                .unwrap_or_default(),
        )?;

        let raw = self.skopeo.inspect_raw(
            &reference.source_locator(),
            auth_file.as_ref().map(|file| file.path()),
            &CommandKiller::from_invocation(invocation),
        )?;
        let descriptor = Descriptor::from_raw_manifest(reference, &raw)?;

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
        target_credentials: &Credentials,
        invocation: &InvocationContext,
    ) -> Result<String, ContainerRegistryError> {
        // target first, its push token is kept when the source shares the registry
        let mut auths = vec![(auth_file_key(target), target_credentials)];
        if let Some(source_credentials) = source_credentials {
            let source = ImageReference::parse(&descriptor.locator).map_err(|err| ContainerRegistryError::ToolError {
                raw_error_message: err.to_string(),
            })?;
            auths.push((auth_file_key(&source), source_credentials));
        }
        let auth_file = optional_auth_file(auths)?;

        let digest_file = NamedTempFile::new().map_err(|err| ContainerRegistryError::MissingPushedDigest {
            reference: target.to_string(),
            raw_error_message: err.to_string(),
        })?;

        let mode = match descriptor.is_index {
            true => CopyMode::All,
            false => CopyMode::Single,
        };

        self.skopeo.copy(
            &descriptor.locator,
            &target.to_string(),
            mode,
            auth_file.as_ref().map(|file| file.path()),
            digest_file.path(),
            &mut |line| self.log_line(invocation, Stage::PushTarget, line, false),
            &mut |line| self.log_line(invocation, Stage::PushTarget, line, true),
            &CommandKiller::from_invocation(invocation),
        )?;

        let digest = std::fs::read_to_string(digest_file.path()).map_err(|err| {
            ContainerRegistryError::MissingPushedDigest {
                reference: target.to_string(),
                raw_error_message: err.to_string(),
            }
        })?;
        let digest = digest.trim();
        if digest.is_empty() {
            return Err(ContainerRegistryError::MissingPushedDigest {
                reference: target.to_string(),
                raw_error_message: "empty digest file".to_string(),
            });
        }

        Ok(digest.to_string())
    }

    fn delete_image(
        &self,
        reference: &ImageReference,
        credentials: &Credentials,
        invocation: &InvocationContext,
    ) -> Result<(), ContainerRegistryError> {
        let auth_file = write_auth_file(&[(auth_file_key(reference), credentials)])?;

        self.skopeo
            .delete_image(
                &reference.to_string(),
                Some(auth_file.path()),
                &CommandKiller::from_invocation(invocation),
            )
            .map_err(ContainerRegistryError::from)
    }
}
