use container_image_provider::errors::ProviderError;
use container_image_provider::events::{ProviderEvent, Stage};
use container_image_provider::io_models::custom_resource::ResponseStatus;
use container_image_provider::lifecycle::LifecycleDispatcher;
use serde_json::json;

use crate::helpers::{
    ARM64_DIGEST, DEMO_REGISTRY, DEMO_REPOSITORY_ARN, FakeCredentialProvider, FakeRegistry, RecordingLogger, invocation,
    multi_arch_index, request,
};

#[test]
fn test_unsupported_requests() {
    struct TestCase<'a> {
        request_type: &'a str,
        resource_type: &'a str,
        physical_resource_id: Option<&'a str>,
        expected_physical_id: &'a str,
        expected_reason: &'a str,
    }

    let test_cases = vec![
        TestCase {
            request_type: "Create",
            resource_type: "Custom::Other",
            physical_resource_id: None,
            expected_physical_id: "create-failed",
            expected_reason: "unsupported resource type: Custom::Other",
        },
        TestCase {
            request_type: "Delete",
            resource_type: "AWS::ECR::Repository",
            physical_resource_id: Some("444093529715.dkr.ecr.eu-central-1.amazonaws.com/python:3.9"),
            expected_physical_id: "444093529715.dkr.ecr.eu-central-1.amazonaws.com/python:3.9",
            expected_reason: "unsupported resource type: AWS::ECR::Repository",
        },
        TestCase {
            request_type: "Replace",
            resource_type: "Custom::ContainerImage",
            physical_resource_id: Some("444093529715.dkr.ecr.eu-central-1.amazonaws.com/python:3.9"),
            expected_physical_id: "444093529715.dkr.ecr.eu-central-1.amazonaws.com/python:3.9",
            expected_reason: "unsupported request type: Replace",
        },
    ];

    for tc in test_cases {
        let registry = FakeRegistry::serving(multi_arch_index());
        let credential_provider = FakeCredentialProvider::new();
        let dispatcher = LifecycleDispatcher::new(&registry, &credential_provider, None, Box::new(RecordingLogger::default()));
        let mut request = request(
            tc.request_type,
            json!({ "ImageReference": "python:3.9", "RepositoryArn": DEMO_REPOSITORY_ARN }),
            tc.physical_resource_id,
        );
        request.resource_type = tc.resource_type.to_string();

        let response = dispatcher.handle(&request, &invocation(&request));

        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.physical_resource_id, tc.expected_physical_id);
        assert_eq!(response.reason.as_deref(), Some(tc.expected_reason));
        assert!(registry.calls().is_empty());
        assert!(credential_provider.requested().is_empty());
    }
}

#[test]
fn test_update_mirrors_new_reference() {
    let registry = FakeRegistry::serving(multi_arch_index());
    let credential_provider = FakeCredentialProvider::new();
    let dispatcher = LifecycleDispatcher::new(&registry, &credential_provider, None, Box::new(RecordingLogger::default()));
    let old_physical_id = format!("{DEMO_REGISTRY}/cfn-container-image-provider-demo:3.8");
    let request = request(
        "Update",
        json!({ "ImageReference": "python:3.9", "RepositoryArn": DEMO_REPOSITORY_ARN, "Platform": "linux/arm64/v8" }),
        Some(&old_physical_id),
    );

    let response = dispatcher.handle(&request, &invocation(&request));

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(
        response.physical_resource_id,
        format!("{DEMO_REGISTRY}/cfn-container-image-provider-demo:3.9")
    );
    let data = response.data.expect("data on success");
    assert_eq!(data.digest, ARM64_DIGEST);
    assert_eq!(data.platforms, vec!["linux/arm64/v8"]);
}

#[test]
fn test_update_failure_keeps_physical_id() {
    let test_cases = vec![
        json!({ "ImageReference": "python:3.9", "RepositoryArn": "arn:aws:ecr:eu-central-1:444093529715:repository/Python" }),
        json!({ "ImageReference": "python:3.9", "RepositoryArn": DEMO_REPOSITORY_ARN, "Platform": "linux/s390x" }),
    ];

    for properties in test_cases {
        let registry = FakeRegistry::serving(multi_arch_index());
        let credential_provider = FakeCredentialProvider::new();
        let dispatcher = LifecycleDispatcher::new(&registry, &credential_provider, None, Box::new(RecordingLogger::default()));
        let old_physical_id = format!("{DEMO_REGISTRY}/cfn-container-image-provider-demo:3.8");
        let request = request("Update", properties, Some(&old_physical_id));

        let response = dispatcher.handle(&request, &invocation(&request));

        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.physical_resource_id, old_physical_id);
        assert!(response.reason.is_some());
        assert_eq!(response.data, None);
    }
}

#[test]
fn test_cancelled_create_logs_interrupted_stage() {
    let registry = FakeRegistry::serving(multi_arch_index());
    let credential_provider = FakeCredentialProvider::failing(ProviderError::Cancelled {
        stage: Stage::Credentials,
        raw_error_message: "Invocation canceled".to_string(),
    });
    let logger = RecordingLogger::default();
    let dispatcher = LifecycleDispatcher::new(&registry, &credential_provider, None, Box::new(logger.clone()));
    let request = request(
        "Create",
        json!({ "ImageReference": "python:3.9", "RepositoryArn": DEMO_REPOSITORY_ARN }),
        None,
    );

    let response = dispatcher.handle(&request, &invocation(&request));

    assert_eq!(response.status, ResponseStatus::Failed);
    assert_eq!(response.physical_resource_id, "create-failed");
    let events = logger.events.lock().map(|events| events.clone()).unwrap_or_default();
    let stages: Vec<Stage> = events
        .iter()
        .filter(|event| matches!(event, ProviderEvent::Error(..)))
        .map(|event| event.get_details().stage())
        .collect();
    assert_eq!(stages, vec![Stage::Credentials]);
}
