use container_image_provider::errors::ProviderError;
use container_image_provider::events::ProviderEvent;
use container_image_provider::io_models::custom_resource::ResponseStatus;
use container_image_provider::lifecycle::LifecycleDispatcher;
use serde_json::json;

use crate::helpers::{
    DEMO_REGISTRY, DEMO_REPOSITORY_ARN, FakeCredentialProvider, FakeRegistry, RecordingLogger, RegistryCall, invocation,
    multi_arch_index, request,
};

fn delete_request(physical_resource_id: Option<&str>) -> container_image_provider::io_models::custom_resource::CustomResourceRequest {
    request(
        "Delete",
        json!({ "ImageReference": "python:3.9", "RepositoryArn": DEMO_REPOSITORY_ARN }),
        physical_resource_id,
    )
}

#[test]
fn test_delete_mirrored_image() {
    let registry = FakeRegistry::serving(multi_arch_index());
    let credential_provider = FakeCredentialProvider::new();
    let dispatcher = LifecycleDispatcher::new(&registry, &credential_provider, None, Box::new(RecordingLogger::default()));
    let physical_resource_id = format!("{DEMO_REGISTRY}/cfn-container-image-provider-demo:3.9");
    let request = delete_request(Some(&physical_resource_id));

    let response = dispatcher.handle(&request, &invocation(&request));

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.physical_resource_id, physical_resource_id);
    assert_eq!(response.data, None);
    assert_eq!(
        registry.calls(),
        vec![RegistryCall::Delete {
            reference: physical_resource_id.clone()
        }]
    );

    let requested = credential_provider.requested();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].region, "eu-central-1");
    assert_eq!(requested[0].account_id, "444093529715");
}

#[test]
fn test_delete_never_fails() {
    struct TestCase<'a> {
        physical_resource_id: Option<&'a str>,
        registry: FakeRegistry,
        credential_provider: FakeCredentialProvider,
        expected_delete_call: bool,
        description: &'a str,
    }

    let test_cases = vec![
        TestCase {
            physical_resource_id: Some("create-failed"),
            registry: FakeRegistry::serving(multi_arch_index()),
            credential_provider: FakeCredentialProvider::new(),
            expected_delete_call: false,
            description: "create failure sentinel",
        },
        TestCase {
            physical_resource_id: Some("Not A Reference"),
            registry: FakeRegistry::serving(multi_arch_index()),
            credential_provider: FakeCredentialProvider::new(),
            expected_delete_call: false,
            description: "unparsable physical id",
        },
        TestCase {
            physical_resource_id: None,
            registry: FakeRegistry::serving(multi_arch_index()),
            credential_provider: FakeCredentialProvider::new(),
            expected_delete_call: false,
            description: "missing physical id",
        },
        TestCase {
            physical_resource_id: Some("docker.io/library/python:3.9"),
            registry: FakeRegistry::serving(multi_arch_index()),
            credential_provider: FakeCredentialProvider::new(),
            expected_delete_call: false,
            description: "not an ECR repository",
        },
        TestCase {
            physical_resource_id: Some("444093529715.dkr.ecr.eu-central-1.amazonaws.com/cfn-container-image-provider-demo:3.9"),
            registry: FakeRegistry::serving(multi_arch_index()).failing_delete("MANIFEST_UNKNOWN: manifest unknown"),
            credential_provider: FakeCredentialProvider::new(),
            expected_delete_call: true,
            description: "image already removed",
        },
        TestCase {
            physical_resource_id: Some("444093529715.dkr.ecr.eu-central-1.amazonaws.com/cfn-container-image-provider-demo:3.9"),
            registry: FakeRegistry::serving(multi_arch_index()),
            credential_provider: FakeCredentialProvider::failing(ProviderError::CredentialUnavailable {
                registry: DEMO_REGISTRY.to_string(),
                raw_error_message: "AccessDenied".to_string(),
            }),
            expected_delete_call: false,
            description: "no push credential",
        },
    ];

    for tc in test_cases {
        let logger = RecordingLogger::default();
        let dispatcher =
            LifecycleDispatcher::new(&tc.registry, &tc.credential_provider, None, Box::new(logger.clone()));
        let request = delete_request(tc.physical_resource_id);

        let response = dispatcher.handle(&request, &invocation(&request));

        assert_eq!(response.status, ResponseStatus::Success, "{}", tc.description);
        assert_eq!(response.reason, None, "{}", tc.description);
        assert_eq!(
            response.physical_resource_id,
            tc.physical_resource_id.unwrap_or("create-failed"),
            "{}",
            tc.description
        );
        assert_eq!(
            tc.registry
                .calls()
                .iter()
                .any(|call| matches!(call, RegistryCall::Delete { .. })),
            tc.expected_delete_call,
            "{}",
            tc.description
        );

        let events = logger.events.lock().map(|events| events.clone()).unwrap_or_default();
        assert!(
            !events.iter().any(|event| matches!(event, ProviderEvent::Error(..))),
            "{}",
            tc.description
        );
    }
}

#[test]
fn test_failed_delete_is_logged_as_warning() {
    let registry = FakeRegistry::serving(multi_arch_index()).failing_delete("MANIFEST_UNKNOWN: manifest unknown");
    let credential_provider = FakeCredentialProvider::new();
    let logger = RecordingLogger::default();
    let dispatcher = LifecycleDispatcher::new(&registry, &credential_provider, None, Box::new(logger.clone()));
    let physical_resource_id = format!("{DEMO_REGISTRY}/cfn-container-image-provider-demo:3.9");
    let request = delete_request(Some(&physical_resource_id));

    dispatcher.handle(&request, &invocation(&request));

    let events = logger.events.lock().map(|events| events.clone()).unwrap_or_default();
    assert!(events.iter().any(|event| matches!(event, ProviderEvent::Warning(..))
        && event.message().contains(&format!("ignoring failed delete of image {physical_resource_id}"))
        && event.message().contains("MANIFEST_UNKNOWN: manifest unknown")));
}
