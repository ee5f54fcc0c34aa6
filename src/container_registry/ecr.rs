use base64::Engine;
use base64::engine::general_purpose;
use std::str::FromStr;

use rusoto_core::{Client, HttpClient, Region};
use rusoto_credential::{DefaultCredentialsProvider, StaticProvider};
use rusoto_ecr::{Ecr, EcrClient, GetAuthorizationTokenRequest};

use crate::cmd::command::AbortReason;
use crate::container_registry::{Credentials, PushCredentialProvider};
use crate::errors::ProviderError;
use crate::events::Stage;
use crate::io_models::context::InvocationContext;
use crate::models::repository::RepositoryLocation;
use crate::runtime::block_on_with_invocation;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AwsCredentials {
    Static {
        access_key_id: String,
        secret_access_key: String,
    },
    STS {
        access_key_id: String,
        secret_access_key: String,
        session_token: String,
    },
}

impl AwsCredentials {
    pub fn new(access_key_id: String, secret_access_key: String, session_token: Option<String>) -> Self {
        if let Some(session_token) = session_token {
            AwsCredentials::STS {
                access_key_id,
                secret_access_key,
                session_token,
            }
        } else {
            AwsCredentials::Static {
                access_key_id,
                secret_access_key,
            }
        }
    }

    pub fn access_key_id(&self) -> &str {
        match self {
            AwsCredentials::Static { access_key_id, .. } => access_key_id,
            AwsCredentials::STS { access_key_id, .. } => access_key_id,
        }
    }

    pub fn secret_access_key(&self) -> &str {
        match self {
            AwsCredentials::Static { secret_access_key, .. } => secret_access_key,
            AwsCredentials::STS { secret_access_key, .. } => secret_access_key,
        }
    }

    pub fn session_token(&self) -> Option<&str> {
        match self {
            AwsCredentials::Static { .. } => None,
            AwsCredentials::STS { session_token, .. } => Some(session_token),
        }
    }
}

pub fn new_rusoto_creds(creds: &AwsCredentials) -> StaticProvider {
    StaticProvider::new(
        creds.access_key_id().to_string(),
        creds.secret_access_key().to_string(),
        creds.session_token().map(str::to_string),
        None,
    )
}

/// Push credential from ECR `GetAuthorizationToken`, asked in the repository region for the repository account.
pub struct EcrCredentialProvider {
    // None: rusoto default chain (env, profile, container, instance metadata)
    credentials: Option<AwsCredentials>,
}

impl EcrCredentialProvider {
    pub fn new(credentials: Option<AwsCredentials>) -> Self {
        EcrCredentialProvider { credentials }
    }

    fn ecr_client(&self, registry: &str, region: Region) -> Result<EcrClient, ProviderError> {
        let unavailable = |raw_error_message: String| ProviderError::CredentialUnavailable {
            registry: registry.to_string(),
            raw_error_message,
        };

        let http_client = HttpClient::new().map_err(|err| unavailable(err.to_string()))?;
        let client = match &self.credentials {
            Some(credentials) => Client::new_with(new_rusoto_creds(credentials), http_client),
            None => Client::new_with(
                DefaultCredentialsProvider::new().map_err(|err| unavailable(err.to_string()))?,
                http_client,
            ),
        };

        Ok(EcrClient::new_with_client(client, region))
    }
}

impl PushCredentialProvider for EcrCredentialProvider {
    fn get_push_credential(
        &self,
        location: &RepositoryLocation,
        invocation: &InvocationContext,
    ) -> Result<Credentials, ProviderError> {
        let registry = location.registry_host();
        let unavailable = |raw_error_message: String| ProviderError::CredentialUnavailable {
            registry: registry.clone(),
            raw_error_message,
        };

        let ecr_client = self.ecr_client(&registry, ecr_region(&location.region))?;
        let request = GetAuthorizationTokenRequest {
            registry_ids: Some(vec![location.account_id.clone()]),
        };

        let response = match block_on_with_invocation(invocation, ecr_client.get_authorization_token(request)) {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(unavailable(err.to_string())),
            Err(AbortReason::Canceled(msg)) => {
                return Err(ProviderError::Cancelled {
                    stage: Stage::Credentials,
                    raw_error_message: msg,
                });
            }
            Err(AbortReason::Timeout(timeout)) => {
                return Err(ProviderError::Cancelled {
                    stage: Stage::Credentials,
                    raw_error_message: format!("invocation deadline reached after {}s", timeout.as_secs()),
                });
            }
        };

        let token = response
            .authorization_data
            .unwrap_or_default()
            .into_iter()
            .find_map(|authorization_data| authorization_data.authorization_token)
            .ok_or_else(|| unavailable("no authorization data returned".to_string()))?;

        decode_authorization_token(&token)
    }
}

/// Regions rusoto does not list yet are addressed through their public ECR API endpoint.
pub fn ecr_region(region: &str) -> Region {
    Region::from_str(region).unwrap_or_else(|_| Region::Custom {
        name: region.to_string(),
        endpoint: format!("https://api.ecr.{region}.amazonaws.com"),
    })
}

/// An ECR authorization token is `base64("username:password")`.
pub fn decode_authorization_token(token: &str) -> Result<Credentials, ProviderError> {
    let decoded = general_purpose::STANDARD
        .decode(token)
        .map_err(|err| ProviderError::MalformedCredential {
            reason: format!("token is not base64 encoded: {err}"),
        })?;
    let decoded = String::from_utf8(decoded).map_err(|err| ProviderError::MalformedCredential {
        reason: format!("token is not valid UTF-8: {err}"),
    })?;

    let parts: Vec<&str> = decoded.split(':').collect();
    match parts.as_slice() {
        [username, password] => Ok(Credentials::new(username.to_string(), password.to_string())),
        _ => Err(ProviderError::MalformedCredential {
            reason: format!("token separated by : contains {} elements, not 2", parts.len()),
        }),
    }
}
