//! Shared utilities for use cases.
//!
//! Cancellation checks and the cancellable join loop used by the council
//! engine and both wave orchestrators.

use crate::use_cases::orchestration_error::OrchestrationError;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

pub(crate) fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(CancellationToken::is_cancelled)
}

/// Check if cancellation has been requested.
///
/// Returns `Err(OrchestrationError::Cancelled)` if the token is cancelled.
pub(crate) fn check_cancelled(token: &CancellationToken) -> Result<(), OrchestrationError> {
    if token.is_cancelled() {
        return Err(OrchestrationError::Cancelled);
    }
    Ok(())
}

/// Outcome of waiting on a join set under a cancellation token
pub(crate) enum JoinNext<T> {
    Ready(Result<T, JoinError>),
    Exhausted,
    Cancelled,
}

/// Wait for the next finished task, or for cancellation.
///
/// On cancellation the remaining tasks are detached, not aborted: requests
/// already in flight run to completion and their results are dropped.
pub(crate) async fn join_next_or_cancel<T: 'static>(
    join_set: &mut JoinSet<T>,
    token: Option<&CancellationToken>,
) -> JoinNext<T> {
    let result = if let Some(token) = token {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                join_set.detach_all();
                return JoinNext::Cancelled;
            }
            result = join_set.join_next() => result,
        }
    } else {
        join_set.join_next().await
    };

    match result {
        Some(result) => JoinNext::Ready(result),
        None => JoinNext::Exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_join_without_token_drains() {
        let mut join_set = JoinSet::new();
        join_set.spawn(async { 1 });
        join_set.spawn(async { 2 });

        let mut sum = 0;
        while let JoinNext::Ready(Ok(value)) = join_next_or_cancel(&mut join_set, None).await {
            sum += value;
        }
        assert_eq!(sum, 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();

        let mut join_set = JoinSet::new();
        join_set.spawn(async { 1 });

        assert!(matches!(
            join_next_or_cancel(&mut join_set, Some(&token)).await,
            JoinNext::Cancelled
        ));
        assert!(join_set.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let token = CancellationToken::new();
        let mut join_set = JoinSet::new();
        join_set.spawn(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        assert!(matches!(
            join_next_or_cancel(&mut join_set, Some(&token)).await,
            JoinNext::Cancelled
        ));
    }

    #[test]
    fn test_check_cancelled() {
        let token = CancellationToken::new();
        assert!(check_cancelled(&token).is_ok());
        token.cancel();
        assert!(matches!(check_cancelled(&token), Err(OrchestrationError::Cancelled)));
        assert!(is_cancelled(Some(&token)));
        assert!(!is_cancelled(None));
    }
}
