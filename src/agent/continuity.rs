use std::future::Future;

use crate::agent::errors::{AgentError, AgentResult};

/// Whether a failed continue call means the vendor no longer knows the handle.
///
/// Both vendors answer an unknown or expired handle with 400 or 404.
pub fn is_stale_handle_error(err: &AgentError) -> bool {
    matches!(err.upstream_status(), Some(400) | Some(404))
}

/// Runs a continue call, restarting the conversation when the handle is stale.
///
/// The restart sends the same message as a new conversation and returns its
/// result, so the caller receives a fresh handle instead of an error. Any other
/// failure, including one from the restart itself, is returned as is.
pub async fn continue_with_recovery<T, A, AF, R, RF>(
    provider: &str,
    stale_handle: &str,
    attempt: A,
    restart: R,
) -> AgentResult<T>
where
    A: FnOnce() -> AF,
    AF: Future<Output = AgentResult<T>>,
    R: FnOnce() -> RF,
    RF: Future<Output = AgentResult<T>>,
{
    match attempt().await {
        Err(err) if is_stale_handle_error(&err) => {
            log::warn!(
                "{} does not recognise conversation {} ({}), starting a new conversation",
                provider,
                stale_handle,
                err
            );
            restart().await
        }
        other => other,
    }
}
