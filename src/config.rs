use std::env;
use std::time::Duration;

use crate::constants::{
    AWS_ACCESS_KEY_ID, AWS_DEFAULT_REGION, AWS_REGION, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN,
    DEFAULT_INVOCATION_TIMEOUT_SECONDS, INVOCATION_TIMEOUT_SECONDS, SKOPEO_BINARY, SKOPEO_TLS_VERIFY,
    SOURCE_REGISTRY_PASSWORD, SOURCE_REGISTRY_USERNAME,
};
use crate::container_registry::Credentials;
use crate::container_registry::ecr::AwsCredentials;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got `{value}`")]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
    },
    #[error("{present} is set but {missing} is not")]
    IncompletePair { present: String, missing: String },
}

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Region of the process, push credentials are always asked in the repository region.
    pub region: Option<String>,
    /// None: rusoto default credentials chain.
    pub aws_credentials: Option<AwsCredentials>,
    pub skopeo_binary: String,
    pub skopeo_tls_verify: bool,
    pub source_credentials: Option<Credentials>,
    pub invocation_timeout: Duration,
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let region = var(AWS_REGION).or_else(|| var(AWS_DEFAULT_REGION));

        let aws_credentials = match (var(AWS_ACCESS_KEY_ID), var(AWS_SECRET_ACCESS_KEY)) {
            (Some(access_key_id), Some(secret_access_key)) => {
                Some(AwsCredentials::new(access_key_id, secret_access_key, var(AWS_SESSION_TOKEN)))
            }
            _ => None,
        };

        let skopeo_tls_verify = match var(SKOPEO_TLS_VERIFY) {
            None => true,
            Some(value) => parse_bool(SKOPEO_TLS_VERIFY, &value)?,
        };

        let source_credentials = match (var(SOURCE_REGISTRY_USERNAME), var(SOURCE_REGISTRY_PASSWORD)) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::IncompletePair {
                    present: SOURCE_REGISTRY_USERNAME.to_string(),
                    missing: SOURCE_REGISTRY_PASSWORD.to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompletePair {
                    present: SOURCE_REGISTRY_PASSWORD.to_string(),
                    missing: SOURCE_REGISTRY_USERNAME.to_string(),
                });
            }
        };

        let invocation_timeout = match var(INVOCATION_TIMEOUT_SECONDS) {
            None => Duration::from_secs(DEFAULT_INVOCATION_TIMEOUT_SECONDS),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(seconds) if seconds > 0 => Duration::from_secs(seconds),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: INVOCATION_TIMEOUT_SECONDS.to_string(),
                        value,
                        expected: "a positive number of seconds".to_string(),
                    });
                }
            },
        };

        Ok(ProviderConfig {
            region,
            aws_credentials,
            skopeo_binary: var(SKOPEO_BINARY).unwrap_or_else(|| "skopeo".to_string()),
            skopeo_tls_verify,
            source_credentials,
            invocation_timeout,
        })
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            expected: "a boolean".to_string(),
        }),
    }
}
