use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use container_image_provider::cmd::skopeo::Skopeo;
use container_image_provider::config::ProviderConfig;
use container_image_provider::constants::AWS_LAMBDA_FUNCTION_NAME;
use container_image_provider::container_registry::ecr::EcrCredentialProvider;
use container_image_provider::container_registry::skopeo::SkopeoRegistry;
use container_image_provider::io_models::context::InvocationContext;
use container_image_provider::io_models::custom_resource::{CustomResourceRequest, ResponseStatus};
use container_image_provider::lifecycle::LifecycleDispatcher;
use container_image_provider::logger::StdIoLogger;
use container_image_provider::runtime::cancel_on_shutdown_signal;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// CloudFormation custom resource request (JSON), read from stdin when omitted
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Invocation timeout in seconds, overrides INVOCATION_TIMEOUT_SECONDS
    #[arg(long)]
    timeout: Option<u64>,
}

fn init_logging(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);

    if json_logs || std::env::var_os(AWS_LAMBDA_FUNCTION_NAME).is_some() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_request(event: Option<&PathBuf>) -> Result<CustomResourceRequest, String> {
    let content = match event {
        Some(path) => fs::read_to_string(path).map_err(|err| format!("cannot read {}: {}", path.display(), err))?,
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .map_err(|err| format!("cannot read stdin: {err}"))?;
            content
        }
    };

    serde_json::from_str(&content).map_err(|err| format!("invalid custom resource request: {err}"))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.json_logs);

    let mut config = match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Some(timeout) = args.timeout {
        config.invocation_timeout = Duration::from_secs(timeout);
    }

    let request = match read_request(args.event.as_ref()) {
        Ok(request) => request,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let skopeo = match Skopeo::new(&config.skopeo_binary, config.skopeo_tls_verify) {
        Ok(skopeo) => skopeo,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Handling {} request {} for {} (region {})",
        request.request_type,
        request.request_id,
        request.logical_resource_id,
        config.region.as_deref().unwrap_or("unset")
    );

    let logger = StdIoLogger::new();
    let registry = SkopeoRegistry::new(skopeo, Box::new(logger.clone()));
    let credential_provider = EcrCredentialProvider::new(config.aws_credentials.clone());
    let dispatcher =
        LifecycleDispatcher::new(&registry, &credential_provider, config.source_credentials.clone(), Box::new(logger));

    let cancellation_token = CancellationToken::new();
    if let Err(err) = cancel_on_shutdown_signal(cancellation_token.clone()) {
        warn!("cannot listen for shutdown signals, only the deadline stops the invocation: {}", err);
    }
    let invocation = InvocationContext::new(
        request.request_id.clone(),
        request.stack_id.clone(),
        request.logical_resource_id.clone(),
        request.request_type.clone(),
        config.invocation_timeout,
        cancellation_token,
    );
    let response = dispatcher.handle(&request, &invocation);

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            error!("cannot serialize response: {}", err);
            return ExitCode::FAILURE;
        }
    }

    match response.status {
        ResponseStatus::Success => ExitCode::SUCCESS,
        ResponseStatus::Failed => ExitCode::FAILURE,
    }
}
