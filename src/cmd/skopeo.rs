use crate::cmd::command::{CommandError, CommandKiller, ToolCommand, command_to_string, does_binary_exist};

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum SkopeoError {
    #[error("Skopeo binary `{binary}` cannot be found")]
    BinaryNotFound { binary: String },

    #[error("Skopeo terminated with a non success exit status code: {exit_status:?}: {stderr}")]
    ExitStatusError { exit_status: ExitStatus, stderr: String },

    #[error("Skopeo terminated with an unknown error: {raw_error:?}")]
    ExecutionError { raw_error: std::io::Error },

    #[error("Skopeo aborted due to user cancel request: {raw_error_message:?}")]
    Aborted { raw_error_message: String },

    #[error("Skopeo command terminated due to timeout: {raw_error_message:?}")]
    Timeout { raw_error_message: String },
}

/// What to copy: the whole manifest list, or only the manifest the source points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    All,
    Single,
}

#[derive(Debug)]
pub struct Skopeo {
    binary: String,
    tls_verify: bool,
}

impl Skopeo {
    pub fn new(binary: &str, tls_verify: bool) -> Result<Self, SkopeoError> {
        if !does_binary_exist(binary) {
            return Err(SkopeoError::BinaryNotFound {
                binary: binary.to_string(),
            });
        }

        Ok(Self {
            binary: binary.to_string(),
            tls_verify,
        })
    }

    fn tls_arg(&self, flag: &str) -> String {
        format!("--{}={}", flag, self.tls_verify)
    }

    /// Raw manifest (or manifest list) of `image`, as served by the registry.
    pub fn inspect_raw(
        &self,
        image: &str,
        auth_file: Option<&Path>,
        cmd_killer: &CommandKiller,
    ) -> Result<String, SkopeoError> {
        let uri = format!("docker://{image}");
        info!("Inspecting image {}", uri);

        let tls = self.tls_arg("tls-verify");
        let mut args = vec!["inspect", "--raw", tls.as_str()];
        let auth_file = auth_file.map(|path| path.to_string_lossy().to_string());
        if let Some(auth_file) = &auth_file {
            args.extend(["--authfile", auth_file.as_str()]);
        }
        args.push(uri.as_str());

        let mut output: Vec<String> = vec![];
        self.exec(
            &args,
            &mut |line| output.push(line),
            &mut |line| warn!("{}", line),
            cmd_killer,
        )?;

        Ok(output.join("\n"))
    }

    /// Copies `source` to `destination` keeping manifests byte for byte, so digests are preserved.
    /// The digest of the manifest written at destination is stored in `digest_file`.
    #[allow(clippy::too_many_arguments)]
    pub fn copy<F, X>(
        &self,
        source: &str,
        destination: &str,
        mode: CopyMode,
        auth_file: Option<&Path>,
        digest_file: &Path,
        stdout_output: &mut F,
        stderr_output: &mut X,
        cmd_killer: &CommandKiller,
    ) -> Result<(), SkopeoError>
    where
        F: FnMut(String),
        X: FnMut(String),
    {
        let source_uri = format!("docker://{source}");
        let destination_uri = format!("docker://{destination}");
        info!("Copying image {} to {}", source_uri, destination_uri);

        let src_tls = self.tls_arg("src-tls-verify");
        let dest_tls = self.tls_arg("dest-tls-verify");
        let digest_file = digest_file.to_string_lossy().to_string();
        let mut args = vec![
            "copy",
            "--retry-times",
            "0",
            "--preserve-digests",
            src_tls.as_str(),
            dest_tls.as_str(),
            "--digestfile",
            digest_file.as_str(),
        ];
        if mode == CopyMode::All {
            args.push("--all");
        }
        let auth_file = auth_file.map(|path| path.to_string_lossy().to_string());
        if let Some(auth_file) = &auth_file {
            args.extend(["--authfile", auth_file.as_str()]);
        }
        args.extend([source_uri.as_str(), destination_uri.as_str()]);

        self.exec(&args, stdout_output, stderr_output, cmd_killer)
    }

    pub fn delete_image(
        &self,
        image: &str,
        auth_file: Option<&Path>,
        cmd_killer: &CommandKiller,
    ) -> Result<(), SkopeoError> {
        let uri = format!("docker://{image}");
        info!("Deleting image {}", uri);

        let tls = self.tls_arg("tls-verify");
        let mut args = vec!["delete", tls.as_str()];
        let auth_file = auth_file.map(|path| path.to_string_lossy().to_string());
        if let Some(auth_file) = &auth_file {
            args.extend(["--authfile", auth_file.as_str()]);
        }
        args.push(uri.as_str());

        self.exec(
            &args,
            &mut |line| info!("{}", line),
            &mut |line| info!("{}", line),
            cmd_killer,
        )
    }

    fn exec<F, X>(
        &self,
        args: &[&str],
        stdout_output: &mut F,
        stderr_output: &mut X,
        cmd_killer: &CommandKiller,
    ) -> Result<(), SkopeoError>
    where
        F: FnMut(String),
        X: FnMut(String),
    {
        debug!("{}", command_to_string(&self.binary, args));
        let mut cmd = ToolCommand::new(&self.binary, args, &[]);
        cmd.set_kill_grace_period(Duration::from_secs(0));

        // keep stderr around, it is the only explanation skopeo gives on failure
        let mut stderr_lines: Vec<String> = vec![];
        let ret = cmd.exec_with_abort(
            stdout_output,
            &mut |line| {
                stderr_lines.push(line.clone());
                stderr_output(line)
            },
            cmd_killer,
        );

        match ret {
            Ok(_) => Ok(()),
            Err(CommandError::TimeoutError(msg)) => Err(SkopeoError::Timeout { raw_error_message: msg }),
            Err(CommandError::Killed(msg)) => Err(SkopeoError::Aborted { raw_error_message: msg }),
            Err(CommandError::ExitStatusError(exit_status)) => Err(SkopeoError::ExitStatusError {
                exit_status,
                stderr: stderr_lines.join("\n"),
            }),
            Err(CommandError::ExecutionError(err)) => Err(SkopeoError::ExecutionError { raw_error: err }),
        }
    }
}
