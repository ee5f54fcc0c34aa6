pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_REGION: &str = "AWS_REGION";
pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const AWS_LAMBDA_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";

pub const SKOPEO_BINARY: &str = "SKOPEO_BINARY";
pub const SKOPEO_TLS_VERIFY: &str = "SKOPEO_TLS_VERIFY";
pub const SOURCE_REGISTRY_USERNAME: &str = "SOURCE_REGISTRY_USERNAME";
pub const SOURCE_REGISTRY_PASSWORD: &str = "SOURCE_REGISTRY_PASSWORD";
pub const INVOCATION_TIMEOUT_SECONDS: &str = "INVOCATION_TIMEOUT_SECONDS";

// Lambda hard limit is 15 minutes, keep a margin to report the failure
pub const DEFAULT_INVOCATION_TIMEOUT_SECONDS: u64 = 840;

pub const RESOURCE_TYPE: &str = "Custom::ContainerImage";
pub const CREATE_FAILED_PHYSICAL_ID: &str = "create-failed";

pub const PROPERTY_IMAGE_REFERENCE: &str = "ImageReference";
pub const PROPERTY_REPOSITORY_ARN: &str = "RepositoryArn";
pub const PROPERTY_PLATFORM: &str = "Platform";

pub const DEFAULT_TAG: &str = "latest";
pub const DEFAULT_PLATFORM_OS: &str = "linux";
pub const DEFAULT_PLATFORM_ARCHITECTURE: &str = "amd64";

pub const DOCKER_HUB_REGISTRY: &str = "docker.io";
pub const ECR_REGISTRY_DOMAIN: &str = "dkr.ecr";
pub const AWS_DOMAIN: &str = "amazonaws.com";
