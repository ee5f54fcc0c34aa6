use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::io::{Error, ErrorKind};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::cmd::command::CommandError::{ExecutionError, ExitStatusError, Killed, TimeoutError};
use crate::io_models::context::InvocationContext;

use itertools::Itertools;
use std::time::{Duration, Instant};
use timeout_readwrite::TimeoutReader;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("Error while executing command")]
    ExecutionError(#[from] Error),

    #[error("Command terminated with a non success exit status code: {0}")]
    ExitStatusError(ExitStatus),

    #[error("Command killed due to timeout: {0}")]
    TimeoutError(String),

    #[error("Command killed by user request: {0}")]
    Killed(String),
}

#[derive(Debug, Clone)]
pub enum AbortReason {
    Timeout(Duration),
    Canceled(String),
}

pub struct CommandKiller<'a> {
    should_abort: Box<dyn Fn() -> Option<AbortReason> + 'a>,
}

impl<'a> CommandKiller<'a> {
    /// Aborts once the invocation deadline is reached or its cancellation token fires.
    pub fn from_invocation(invocation: &'a InvocationContext) -> CommandKiller<'a> {
        let budget = invocation.remaining_time();
        CommandKiller {
            should_abort: Box::new(move || {
                if invocation.is_canceled() {
                    return Some(AbortReason::Canceled("Invocation canceled".to_string()));
                }
                if invocation.is_expired() {
                    return Some(AbortReason::Timeout(budget));
                }

                None
            }),
        }
    }

    pub fn should_abort(&self) -> Option<AbortReason> {
        (self.should_abort)()
    }
}

pub struct ToolCommand {
    command: Command,
    kill_grace_period: Duration,
}

impl ToolCommand {
    pub fn new<P: AsRef<Path>>(binary: P, args: &[&str], envs: &[(&str, &str)]) -> ToolCommand {
        let mut command = Command::new(binary.as_ref().as_os_str());
        command.args(args);

        envs.iter().for_each(|(k, v)| {
            command.env(k, v);
        });

        ToolCommand {
            command,
            kill_grace_period: Duration::from_secs(1),
        }
    }

    pub fn set_kill_grace_period(&mut self, grace_period: Duration) {
        self.kill_grace_period = grace_period;
    }

    fn kill(cmd_handle: &mut Child) {
        let _ = cmd_handle
            .kill() //Fire
            .map(|_| cmd_handle.wait())
            .map_err(|err| error!("Cannot kill process {:?} {}", cmd_handle, err));
    }

    pub fn exec_with_abort<STDOUT, STDERR>(
        &mut self,
        stdout_output: &mut STDOUT,
        stderr_output: &mut STDERR,
        abort_notifier: &CommandKiller,
    ) -> Result<(), CommandError>
    where
        STDOUT: FnMut(String),
        STDERR: FnMut(String),
    {
        // args may reference auth files but never carry secrets
        debug!("command: {:?}", self.command);
        if let Some(reason) = abort_notifier.should_abort() {
            return Err(self.abort_error(reason));
        }

        let mut cmd_handle = self
            .command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExecutionError)?;

        // Read stdout/stderr until timeout is reached
        let reader_timeout = Duration::from_secs(1);
        let stdout = cmd_handle
            .stdout
            .take()
            .ok_or_else(|| ExecutionError(Error::new(ErrorKind::BrokenPipe, "Cannot get stdout for command")))?;
        let mut stdout_reader = BufReader::new(TimeoutReader::new(stdout, reader_timeout)).lines();

        let stderr = cmd_handle
            .stderr
            .take()
            .ok_or_else(|| ExecutionError(Error::new(ErrorKind::BrokenPipe, "Cannot get stderr for command")))?;
        let mut stderr_reader = BufReader::new(TimeoutReader::new(
            stderr,
            Duration::from_secs(0), // don't block on stderr
        ))
        .lines();

        let mut stdout_closed = false;
        let mut stderr_closed = false;
        while !stdout_closed || !stderr_closed {
            if abort_notifier.should_abort().is_some() {
                break;
            }

            while !stdout_closed {
                let line = match stdout_reader.next() {
                    Some(line) => line,
                    None => {
                        stdout_closed = true;
                        break;
                    }
                };

                match line {
                    Err(ref err) if err.kind() == ErrorKind::TimedOut => break,
                    Ok(line) => stdout_output(line),
                    Err(err) => {
                        error!("Error on stdout of cmd {:?}: {:?}", self.command, err);
                        stdout_closed = true;
                        break;
                    }
                }

                if abort_notifier.should_abort().is_some() {
                    stdout_closed = true;
                    stderr_closed = true;
                    break;
                }
            }

            while !stderr_closed {
                let line = match stderr_reader.next() {
                    Some(line) => line,
                    None => {
                        stderr_closed = true;
                        break;
                    }
                };

                match line {
                    Err(ref err) if err.kind() == ErrorKind::TimedOut => break,
                    Ok(line) => stderr_output(line),
                    Err(err) => {
                        error!("Error on stderr of cmd {:?}: {:?}", self.command, err);
                        stderr_closed = true;
                        break;
                    }
                }

                if abort_notifier.should_abort().is_some() {
                    stdout_closed = true;
                    stderr_closed = true;
                    break;
                }
            }
        }

        // Wait for the process to exit before reaching the timeout
        // If not, we just kill it
        let exit_status;
        loop {
            match cmd_handle.try_wait() {
                Ok(Some(status)) => {
                    exit_status = status;
                    break;
                }
                Ok(None) => {
                    if let Some(reason) = abort_notifier.should_abort() {
                        let err = self.abort_error(reason);
                        warn!("{}", err);
                        self.wait_grace_period(&mut cmd_handle);
                        Self::kill(&mut cmd_handle);
                        return Err(err);
                    }
                }
                Err(err) => return Err(ExecutionError(err)),
            };

            std::thread::sleep(Duration::from_millis(200));
        }

        if !exit_status.success() {
            debug!(
                "command: {:?} terminated with error exist status {:?}",
                self.command, exit_status
            );
            return Err(ExitStatusError(exit_status));
        }

        Ok(())
    }

    // leave the process a chance to exit by itself before killing it
    fn wait_grace_period(&self, cmd_handle: &mut Child) {
        let started = Instant::now();
        while started.elapsed() < self.kill_grace_period {
            if let Ok(Some(_)) = cmd_handle.try_wait() {
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    fn abort_error(&self, reason: AbortReason) -> CommandError {
        match reason {
            AbortReason::Timeout(timeout) => TimeoutError(format!(
                "Killing process {:?} due to timeout {}s reached",
                self.command.get_program(),
                timeout.as_secs()
            )),
            AbortReason::Canceled(msg) => Killed(format!("Killing process {:?}: {}", self.command.get_program(), msg)),
        }
    }
}

pub fn does_binary_exist<S>(binary: S) -> bool
where
    S: AsRef<OsStr>,
{
    Command::new(binary)
        .stdout(Stdio::null())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|mut child| child.wait())
        .is_ok()
}

pub fn command_to_string<P>(binary: P, args: &[&str]) -> String
where
    P: AsRef<Path>,
{
    format!("{:?} {}", binary.as_ref().as_os_str(), args.iter().join(" "))
}
