use tokio_util::sync::CancellationToken;

/// Install a shutdown handler that listens for Ctrl-C.
///
/// Returns a `CancellationToken` that is cancelled when the signal is
/// received. The host should then drain the registry with
/// [`cancel_or_wait_for_running_jobs`](crate::registry::JobRegistry::cancel_or_wait_for_running_jobs)
/// before exiting.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("received ctrl-c, initiating graceful shutdown");
                token_clone.cancel();
            }
            Err(err) => {
                log::error!("failed to install ctrl-c handler: {err}");
            }
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_starts_uncancelled() {
        let token = install_shutdown_handler();
        assert!(!token.is_cancelled());
    }
}
