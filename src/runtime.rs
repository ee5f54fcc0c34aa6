use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::{Builder, Runtime};
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::cmd::command::AbortReason;
use crate::io_models::context::InvocationContext;

static TOKIO_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("tokio-provider-blocking")
        .enable_all()
        .build()
        .expect("cannot build tokio runtime")
});

pub fn block_on<F: Future>(future: F) -> F::Output {
    TOKIO_RUNTIME.block_on(future)
}

/// Runs `future` until it completes, the invocation is canceled, or its deadline is reached.
pub fn block_on_with_invocation<F: Future>(
    invocation: &InvocationContext,
    future: F,
) -> Result<F::Output, AbortReason> {
    let token = invocation.cancellation_token();
    let remaining = invocation.remaining_time();

    block_on(async {
        tokio::select! {
            _ = token.cancelled() => Err(AbortReason::Canceled("Invocation canceled".to_string())),
            ret = timeout(remaining, future) => ret.map_err(|_| AbortReason::Timeout(remaining)),
        }
    })
}

/// Cancels `token` when the process receives SIGINT or SIGTERM.
pub fn cancel_on_shutdown_signal(token: CancellationToken) -> std::io::Result<()> {
    let _guard = TOKIO_RUNTIME.enter();
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    TOKIO_RUNTIME.spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, canceling invocation"),
            _ = sigterm.recv() => info!("Received SIGTERM, canceling invocation"),
            _ = token.cancelled() => return,
        }
        token.cancel();
    });

    Ok(())
}
